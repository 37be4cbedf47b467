#![warn(missing_docs)]
//! Raw per-frame signals delivered by the platform bridge.
//!
//! The bridge fills an [`InputState`] each frame (button edges, rays, hand
//! frames, pointer/mouse/touch deltas, head pose). The interaction core only
//! reads it; how the signals are produced is opaque.

mod idle;

pub use idle::IdleTimer;

use glam::{Quat, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use xrinteract_core::{Handedness, InteractorId, Pose, Ray};

/// Whether the palm or the back of the hand faces the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PalmFacing {
    /// Palm towards the head.
    Palm,
    /// Back of the hand towards the head.
    #[default]
    Back,
}

/// One frame of tracked-hand data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    /// Whether the tracker currently sees the hand.
    pub tracking: bool,
    /// Grip (palm centre) pose; grabbed objects follow this.
    pub grip_pose: Pose,
    /// Pointer pose; the hand ray starts here and points along its forward.
    pub pointer_pose: Pose,
    /// Index-thumb pinch held.
    pub pinch: bool,
    /// Full-hand grip held.
    pub grip: bool,
    /// Palm or back facing the viewer.
    pub facing: PalmFacing,
    /// Wrist watch overlay shown.
    pub watch_overlay: bool,
}

impl Default for HandFrame {
    fn default() -> Self {
        Self {
            tracking: true,
            grip_pose: Pose::IDENTITY,
            pointer_pose: Pose::IDENTITY,
            pinch: false,
            grip: false,
            facing: PalmFacing::Back,
            watch_overlay: false,
        }
    }
}

/// Edges derived from two consecutive hand frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandEdges {
    /// Pinch began this frame.
    pub pinch_started: bool,
    /// Pinch ended this frame.
    pub pinch_ended: bool,
    /// Grip began this frame.
    pub grip_started: bool,
    /// Grip ended this frame.
    pub grip_ended: bool,
    /// Tracking was (re)acquired this frame.
    pub tracking_gained: bool,
    /// Tracking was lost this frame.
    pub tracking_lost: bool,
}

/// Phone-as-pointer (3DOF) frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreeDofFrame {
    /// Device orientation.
    pub orientation: Quat,
    /// Primary button held.
    pub button: bool,
}

/// Input state tracking for a single frame.
#[derive(Debug, Default)]
pub struct InputState {
    /// Buttons currently pressed, per interactor.
    buttons: HashSet<InteractorId>,
    /// Buttons pressed this frame (edge-triggered).
    just_pressed: HashSet<InteractorId>,
    /// Buttons released this frame (edge-triggered).
    just_released: HashSet<InteractorId>,

    /// Pointer rays supplied by the platform, per interactor.
    rays: HashMap<InteractorId, Ray>,

    hands: [Option<HandFrame>; 2],
    hand_edges: [HandEdges; 2],

    /// 3DOF pointer frame, when the phone is connected.
    pub three_dof: Option<ThreeDofFrame>,
    /// Orientation change of the 3DOF pointer since last frame (radians).
    pub three_dof_rotation_delta: f32,

    /// Mouse cursor position in pixels.
    pub mouse_position: Vec2,
    /// Mouse delta since last frame.
    pub mouse_delta: Vec2,
    /// Whether a bluetooth mouse is connected.
    pub mouse_connected: bool,

    /// Touch-surface delta since last frame.
    pub touch_delta: Vec2,
    /// Finger resting on the touch surface.
    pub touching: bool,

    /// Head pose this frame.
    pub head_pose: Pose,
    /// Viewport size in pixels.
    pub screen_size: Vec2,
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self {
            screen_size: Vec2::new(1920.0, 1080.0),
            ..Self::default()
        }
    }

    /// Reset per-frame state (call at the start of each frame).
    pub fn begin_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
        self.hand_edges = [HandEdges::default(); 2];
        self.mouse_delta = Vec2::ZERO;
        self.touch_delta = Vec2::ZERO;
        self.three_dof_rotation_delta = 0.0;
    }

    /// Record a button press for `interactor`.
    pub fn press(&mut self, interactor: InteractorId) {
        if self.buttons.insert(interactor) {
            self.just_pressed.insert(interactor);
        }
    }

    /// Record a button release for `interactor`.
    pub fn release(&mut self, interactor: InteractorId) {
        if self.buttons.remove(&interactor) {
            self.just_released.insert(interactor);
        }
    }

    /// Check if the interactor's button is held.
    pub fn button_pressed(&self, interactor: InteractorId) -> bool {
        self.buttons.contains(&interactor)
    }

    /// Check if the interactor's button went down this frame.
    pub fn button_just_pressed(&self, interactor: InteractorId) -> bool {
        self.just_pressed.contains(&interactor)
    }

    /// Check if the interactor's button went up this frame.
    pub fn button_just_released(&self, interactor: InteractorId) -> bool {
        self.just_released.contains(&interactor)
    }

    /// Whether any interactor button changed state this frame.
    pub fn any_button_edge(&self) -> bool {
        !self.just_pressed.is_empty() || !self.just_released.is_empty()
    }

    /// Supply the pointer ray for `interactor`.
    pub fn set_ray(&mut self, interactor: InteractorId, ray: Ray) {
        self.rays.insert(interactor, ray);
    }

    /// Forget the pointer ray for `interactor`.
    pub fn clear_ray(&mut self, interactor: InteractorId) {
        self.rays.remove(&interactor);
    }

    /// Pointer ray for `interactor`, if the platform supplied one.
    pub fn ray(&self, interactor: InteractorId) -> Option<Ray> {
        self.rays.get(&interactor).copied()
    }

    /// Update a hand, deriving gesture and tracking edges from the previous frame.
    pub fn set_hand(&mut self, hand: Handedness, frame: Option<HandFrame>) {
        let previous = self.hands[hand.index()];
        let was_tracking = previous.is_some_and(|f| f.tracking);
        let is_tracking = frame.is_some_and(|f| f.tracking);
        let was_pinch = previous.is_some_and(|f| f.tracking && f.pinch);
        let is_pinch = frame.is_some_and(|f| f.tracking && f.pinch);
        let was_grip = previous.is_some_and(|f| f.tracking && f.grip);
        let is_grip = frame.is_some_and(|f| f.tracking && f.grip);

        let edges = &mut self.hand_edges[hand.index()];
        edges.tracking_gained |= !was_tracking && is_tracking;
        edges.tracking_lost |= was_tracking && !is_tracking;
        edges.pinch_started |= !was_pinch && is_pinch;
        edges.pinch_ended |= was_pinch && !is_pinch;
        edges.grip_started |= !was_grip && is_grip;
        edges.grip_ended |= was_grip && !is_grip;

        self.hands[hand.index()] = frame;
    }

    /// Latest frame for `hand`.
    pub fn hand(&self, hand: Handedness) -> Option<&HandFrame> {
        self.hands[hand.index()].as_ref()
    }

    /// Whether the tracker currently sees `hand`.
    pub fn hand_tracked(&self, hand: Handedness) -> bool {
        self.hand(hand).is_some_and(|f| f.tracking)
    }

    /// Edges recorded for `hand` this frame.
    pub fn hand_edges(&self, hand: Handedness) -> HandEdges {
        self.hand_edges[hand.index()]
    }

    /// Accumulate mouse motion.
    pub fn add_mouse_motion(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
        self.mouse_position = (self.mouse_position + delta).clamp(Vec2::ZERO, self.screen_size.max(Vec2::ZERO));
    }

    /// Accumulate touch-surface motion.
    pub fn add_touch_motion(&mut self, delta: Vec2) {
        self.touch_delta += delta;
    }

    /// Update the 3DOF pointer, accumulating its rotation delta.
    pub fn set_three_dof(&mut self, frame: Option<ThreeDofFrame>) {
        if let (Some(prev), Some(next)) = (self.three_dof, frame) {
            self.three_dof_rotation_delta += prev.orientation.angle_between(next.orientation);
        }
        self.three_dof = frame;
    }
}
