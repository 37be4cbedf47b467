//! Grab and carry: per-hand stacks of attached objects.
//!
//! The [`GrabEngine`] owns both hands. Render-tick work (hand tracking,
//! hover search, gestures, ease-in, teleport-follow) and physics-tick work
//! (velocity-follow) are separate entry points and must not be mixed.

mod easing;
mod engine;
mod hover;
mod velocity;

pub use easing::EaseCurve;
pub use engine::{GrabEngine, GrabWorld, Hand, HandDesc};
pub use hover::{pick_closest, HoverCandidate};
pub use velocity::{
    rotation_vector, PoseSample, ReleaseSettings, ReleaseStyle, VelocityEstimator, HAND_LOOKBACK, POSITION_FRAMES,
    ROTATION_FRAMES,
};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use xrinteract_core::{ObjectId, Pose};
use xrinteract_physics::{CollisionMode, Rigidbody};

bitflags! {
    /// How an object attaches to a hand.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct GrabFlags: u8 {
        /// Pinch grabs use the hand's snap point instead of its grab point.
        const SNAP_ON_ATTACH = 1 << 0;
        /// Release everything this hand holds first.
        const DETACH_OTHERS = 1 << 1;
        /// Take the object from the other hand if it holds it.
        const RELEASE_FROM_OTHER_HAND = 1 << 2;
        /// Reparent under the hand while held.
        const PARENT_TO_HAND = 1 << 3;
        /// Follow the hand by driving body velocity on the physics tick.
        const VELOCITY_MOVEMENT = 1 << 4;
        /// Make the body kinematic while held.
        const TURN_ON_KINEMATIC = 1 << 5;
        /// Disable gravity while held.
        const TURN_OFF_GRAVITY = 1 << 6;
    }
}

impl Default for GrabFlags {
    fn default() -> Self {
        Self::PARENT_TO_HAND | Self::RELEASE_FROM_OTHER_HAND | Self::VELOCITY_MOVEMENT | Self::TURN_OFF_GRAVITY
    }
}

/// Gesture that started a grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrabType {
    /// Index-thumb pinch.
    Pinch,
    /// Whole-hand grip.
    Grip,
}

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Seconds between hover searches.
    pub hover_interval: f32,
    /// Hover sphere radius, scaled by the hand's lossy scale.
    pub hover_radius: f32,
    /// Collider layers considered by the hover search.
    pub hover_layer_mask: u32,
    /// Ease-in length in seconds.
    pub ease_duration: f32,
    /// Ease-in curve.
    pub ease_curve: EaseCurve,
    /// Positional follow gain.
    pub velocity_gain: f32,
    /// Rotational follow gain (per degree of error).
    pub angular_gain: f32,
    /// Physics rate the gains were tuned for (Hz).
    pub reference_rate: f32,
    /// Largest velocity change per step, scaled by the object's scale.
    pub max_velocity_change: f32,
    /// Largest angular velocity change per step.
    pub max_angular_velocity_change: f32,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            hover_interval: 0.1,
            hover_radius: 0.075,
            hover_layer_mask: u32::MAX,
            ease_duration: 0.15,
            ease_curve: EaseCurve::EaseInOut,
            velocity_gain: 6000.0,
            angular_gain: 50.0,
            reference_rate: 90.0,
            max_velocity_change: 10.0,
            max_angular_velocity_change: 20.0,
        }
    }
}

/// Per-object grab behaviour, used when a hand gesture grabs the object.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabSettings {
    /// Attachment flags.
    pub flags: GrabFlags,
    /// Object pose relative to the attach point; `None` keeps the pose at grab time.
    pub offset: Option<Pose>,
    /// Interpolate into place over [`GrabConfig::ease_duration`].
    pub ease_in: bool,
    /// Velocity applied on release.
    pub release: ReleaseSettings,
}

/// Rigidbody state saved at grab time and restored on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySnapshot {
    /// Kinematic flag.
    pub is_kinematic: bool,
    /// Gravity flag.
    pub use_gravity: bool,
    /// Collision-detection mode.
    pub collision_mode: CollisionMode,
}

impl BodySnapshot {
    /// Capture from `body`.
    pub fn capture(body: &Rigidbody) -> Self {
        Self {
            is_kinematic: body.is_kinematic,
            use_gravity: body.use_gravity,
            collision_mode: body.collision_mode,
        }
    }

    /// Write back into `body`.
    pub fn restore(&self, body: &mut Rigidbody) {
        body.is_kinematic = self.is_kinematic;
        body.use_gravity = self.use_gravity;
        body.collision_mode = self.collision_mode;
    }
}

#[derive(Debug, Clone, Copy)]
struct EaseIn {
    start: Pose,
    elapsed: f32,
}

/// One entry of a hand's stack.
#[derive(Debug, Clone)]
pub struct GrabbedObject {
    /// Attached object.
    pub object: ObjectId,
    /// Registered interactable owning the object, if any.
    pub interactable: Option<ObjectId>,
    /// Gesture that grabbed it.
    pub grab_type: GrabType,
    /// Attachment flags.
    pub flags: GrabFlags,
    /// Parent before the grab.
    pub original_parent: Option<ObjectId>,
    /// Attach point relative to the hand.
    pub attach_point: Pose,
    /// Object pose relative to the attach point.
    pub initial_offset: Pose,
    /// Body state before the grab.
    pub body_snapshot: Option<BodySnapshot>,
    /// Engine time of the grab.
    pub grab_time: f64,
    ease: Option<EaseIn>,
    estimator: VelocityEstimator,
}

impl GrabbedObject {
    /// Whether ease-in is still running.
    pub fn is_easing(&self) -> bool {
        self.ease.is_some()
    }

    /// Pose the object should have for a hand at `hand_pose`.
    pub fn target_pose(&self, hand_pose: &Pose) -> Pose {
        hand_pose.mul_pose(&self.attach_point).mul_pose(&self.initial_offset)
    }
}
