//! Feedback cues for the interaction core.
//!
//! Cues are one-shot, non-blocking requests: the [`CuePlayer`] decides
//! whether a cue may play (mute, cooldown) and queues a
//! [`PlatformRequest`](xrinteract_core::PlatformRequest) that the platform
//! bridge executes on its own audio/haptic path.
//!
//! # Architecture
//!
//! - [`CuePlayer`] - Gatekeeper that rate-limits cues and emits requests
//! - [`CueSettings`] - Volume, mute and cooldown controls loaded from config
//! - [`cue_profile`] - Per-cue default volume and haptic pulse

mod manager;
mod settings;
mod sounds;

pub use manager::CuePlayer;
pub use settings::CueSettings;
pub use sounds::{cue_profile, CueProfile};
