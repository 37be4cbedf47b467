#![warn(missing_docs)]
//! Core primitives shared across the workspace.
//!
//! Everything here is plain data: identifiers, poses, rays, the frame clock
//! and the outbound request queue consumed by the platform bridge.

pub mod clock;
pub mod ids;
pub mod pose;
pub mod request;

use serde::{Deserialize, Serialize};

pub use clock::{FixedStepClock, FrameStep};
pub use ids::{Handedness, InteractorId, ObjectId};
pub use pose::{Pose, Ray};
pub use request::{CueId, PlatformRequest, RequestQueue, TrackerKind, VibrationPattern};

/// Render-frame counter. One tick per `update`, independent of the physics rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Values below this are treated as zero for lengths and time deltas.
pub const EPSILON: f32 = 1.0e-6;
