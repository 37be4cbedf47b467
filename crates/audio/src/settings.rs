//! Cue volume and rate-limit settings.

use serde::{Deserialize, Serialize};

/// Feedback cue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CueSettings {
    /// Master volume (0.0 to 1.0)
    pub master: f32,
    /// Cue volume (0.0 to 1.0)
    pub cues: f32,
    /// Whether cues also trigger a haptic pulse
    pub haptics: bool,
    /// Whether audio is muted
    pub muted: bool,
    /// Minimum seconds between two plays of the same cue
    pub cooldown: f32,
}

impl Default for CueSettings {
    fn default() -> Self {
        Self {
            master: 1.0,
            cues: 0.8,
            haptics: true,
            muted: false,
            cooldown: 0.3,
        }
    }
}

impl CueSettings {
    /// Playback volume for a cue, `master * cues` with each factor clamped to `0..=1`.
    pub fn effective_cue_volume(&self) -> f32 {
        if self.muted {
            return 0.0;
        }
        self.master.clamp(0.0, 1.0) * self.cues.clamp(0.0, 1.0)
    }
}
