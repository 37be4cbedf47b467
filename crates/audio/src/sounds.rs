//! Static per-cue properties.

use xrinteract_core::{CueId, VibrationPattern};

/// How a cue sounds and feels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueProfile {
    /// Volume before settings are applied.
    pub default_volume: f32,
    /// Haptic pulse to pair with the sound, if any.
    pub haptic: Option<VibrationPattern>,
}

/// Look up the profile for `cue`.
pub fn cue_profile(cue: CueId) -> CueProfile {
    match cue {
        CueId::ModalitySwitch => CueProfile {
            default_volume: 0.6,
            haptic: Some(VibrationPattern::TICK),
        },
        CueId::Grab => CueProfile {
            default_volume: 0.8,
            haptic: Some(VibrationPattern {
                duration: 0.04,
                amplitude: 0.6,
            }),
        },
        CueId::Release => CueProfile {
            default_volume: 0.5,
            haptic: None,
        },
        CueId::Click => CueProfile {
            default_volume: 0.7,
            haptic: Some(VibrationPattern::TICK),
        },
    }
}
