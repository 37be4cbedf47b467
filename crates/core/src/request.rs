//! Outbound requests for the platform bridge.
//!
//! The core never waits on these: it queues them and the host drains the
//! queue once per frame and executes them on its own I/O path.

use crate::{Handedness, ObjectId};
use serde::{Deserialize, Serialize};

/// Tracking subsystem the core may ask the platform to open or close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackerKind {
    /// Hand-joint tracking.
    Hand,
    /// Phone-as-pointer orientation tracking.
    ThreeDofPointer,
}

/// Named audio/haptic cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CueId {
    /// Active input modality changed.
    ModalitySwitch,
    /// An object was picked up.
    Grab,
    /// An object was let go.
    Release,
    /// A pointer click landed.
    Click,
}

/// Haptic pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VibrationPattern {
    /// Seconds.
    pub duration: f32,
    /// 0..=1.
    pub amplitude: f32,
}

impl VibrationPattern {
    /// Short, light pulse.
    pub const TICK: Self = Self {
        duration: 0.02,
        amplitude: 0.4,
    };
}

/// Fire-and-forget request to the platform bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlatformRequest {
    /// Open a tracker.
    StartTracking(TrackerKind),
    /// Close a tracker.
    StopTracking(TrackerKind),
    /// Vibrate the device bound to `hand`, or the main device when `None`.
    Vibrate {
        /// Target hand controller, if any.
        hand: Option<Handedness>,
        /// Pattern to play.
        pattern: VibrationPattern,
    },
    /// Re-centre the 3DOF pointer ray on the current head direction.
    RecenterRay,
    /// Play a one-shot cue.
    PlayCue {
        /// Which cue.
        cue: CueId,
        /// Linear volume 0..=1.
        volume: f32,
        /// Object the cue is attached to, if positional.
        at: Option<ObjectId>,
    },
}

/// FIFO of pending platform requests.
#[derive(Debug, Default, Clone)]
pub struct RequestQueue {
    pending: Vec<PlatformRequest>,
}

impl RequestQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request.
    pub fn push(&mut self, request: PlatformRequest) {
        self.pending.push(request);
    }

    /// Move everything out of `other` into this queue, preserving order.
    pub fn append(&mut self, other: &mut RequestQueue) {
        self.pending.append(&mut other.pending);
    }

    /// Take all pending requests.
    pub fn drain(&mut self) -> Vec<PlatformRequest> {
        std::mem::take(&mut self.pending)
    }

    /// Pending requests without draining.
    pub fn pending(&self) -> &[PlatformRequest] {
        &self.pending
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
