//! Rate-limited cue playback.

use crate::{cue_profile, CueSettings};
use std::collections::HashMap;
use tracing::{debug, trace};
use xrinteract_core::{CueId, Handedness, ObjectId, PlatformRequest, RequestQueue};

/// Decides whether a cue may play and queues the platform requests for it.
///
/// Each cue has its own cooldown clock, so a cue cannot re-trigger faster
/// than [`CueSettings::cooldown`]. Playback itself is the platform's job.
#[derive(Debug)]
pub struct CuePlayer {
    settings: CueSettings,
    last_played: HashMap<CueId, f64>,
}

impl CuePlayer {
    /// Create a player with the given settings.
    pub fn new(settings: CueSettings) -> Self {
        Self {
            settings,
            last_played: HashMap::new(),
        }
    }

    /// Get the current settings.
    pub fn settings(&self) -> &CueSettings {
        &self.settings
    }

    /// Try to play `cue` at time `now` (seconds).
    ///
    /// Returns `true` when requests were queued. Muted or cooling-down cues
    /// are dropped silently.
    pub fn play(
        &mut self,
        cue: CueId,
        now: f64,
        hand: Option<Handedness>,
        at: Option<ObjectId>,
        out: &mut RequestQueue,
    ) -> bool {
        if self.settings.muted {
            trace!(?cue, "cue muted");
            return false;
        }
        if let Some(last) = self.last_played.get(&cue) {
            if now - last < f64::from(self.settings.cooldown) {
                trace!(?cue, "cue cooling down");
                return false;
            }
        }
        self.last_played.insert(cue, now);

        let profile = cue_profile(cue);
        out.push(PlatformRequest::PlayCue {
            cue,
            volume: profile.default_volume * self.settings.effective_cue_volume(),
            at,
        });
        if self.settings.haptics {
            if let Some(pattern) = profile.haptic {
                out.push(PlatformRequest::Vibrate { hand, pattern });
            }
        }
        debug!(?cue, "cue queued");
        true
    }
}
