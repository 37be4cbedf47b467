//! Aggregated tuning for an [`crate::InteractionContext`].

use crate::grab::GrabConfig;
use crate::modality::ModalityConfig;
use crate::pointer::PointerConfig;
use crate::raycast::HitTesterConfig;
use serde::{Deserialize, Serialize};
use xrinteract_audio::CueSettings;
use xrinteract_core::InteractorId;

/// Every component's settings in one serializable record.
///
/// Missing sections fall back to their defaults, so a partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Default tuning for new pointer casters.
    pub pointer: PointerConfig,
    /// Ray hit-test limits.
    pub hit_test: HitTesterConfig,
    /// Modality arbitration and idle thresholds.
    pub modality: ModalityConfig,
    /// Hand grab tuning.
    pub grab: GrabConfig,
    /// Feedback cues.
    pub cues: CueSettings,
    /// Interactor whose button edges count as mouse activity.
    pub mouse_interactor: InteractorId,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            pointer: PointerConfig::default(),
            hit_test: HitTesterConfig::default(),
            modality: ModalityConfig::default(),
            grab: GrabConfig::default(),
            cues: CueSettings::default(),
            mouse_interactor: InteractorId(3),
        }
    }
}
