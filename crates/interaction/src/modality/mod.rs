//! Input modality arbitration.
//!
//! One [`Arbitrator`] owns the [`ModuleActivationStatus`]. Producers feed it
//! raw per-modality detail; it picks the active modality and pushes
//! enabled/disabled decisions to every registered consumer.

mod arbitrator;
mod producers;
mod rule;

pub use arbitrator::{
    Arbitrator, ConsumerId, ConsumerTarget, EnablementChange, EnablementConsumer, ModalityListener,
    ModalityRequests,
};
pub use producers::{
    GestureProducer, HandSignals, ModalityConfig, ModalityProducers, MouseProducer, ThreeDofProducer, TouchProducer,
};
pub use rule::{
    EnablementRule, HandSideMask, HeadHandMask, OrientationMask, ProximityMask, RaySideMask, WatchMask,
};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use xrinteract_core::Handedness;

/// Mutually exclusive input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Modality {
    /// Nothing active yet.
    #[default]
    None,
    /// Tracked hands.
    Gesture,
    /// Phone used as a 3DOF pointer.
    ThreeDofPointer,
    /// Bluetooth mouse.
    Mouse,
    /// Touch surface on the device.
    TouchSurface,
}

impl Modality {
    /// Every selectable modality (excludes `None`).
    pub const ALL: [Modality; 4] = [
        Modality::Gesture,
        Modality::ThreeDofPointer,
        Modality::Mouse,
        Modality::TouchSurface,
    ];

    /// Bit of this modality; empty for `None`.
    pub fn mask(self) -> ModalityMask {
        match self {
            Modality::None => ModalityMask::empty(),
            Modality::Gesture => ModalityMask::GESTURE,
            Modality::ThreeDofPointer => ModalityMask::THREE_DOF_POINTER,
            Modality::Mouse => ModalityMask::MOUSE,
            Modality::TouchSurface => ModalityMask::TOUCH_SURFACE,
        }
    }
}

bitflags! {
    /// Set of modalities, used for locks and rule masks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ModalityMask: u8 {
        /// Tracked hands.
        const GESTURE = 1 << 0;
        /// Phone pointer.
        const THREE_DOF_POINTER = 1 << 1;
        /// Mouse.
        const MOUSE = 1 << 2;
        /// Touch surface.
        const TOUCH_SURFACE = 1 << 3;
    }
}

bitflags! {
    /// Idle flags per modality. Gesture sleeps per hand.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SleepFlags: u8 {
        /// Left hand idle.
        const GESTURE_LEFT = 1 << 0;
        /// Right hand idle.
        const GESTURE_RIGHT = 1 << 1;
        /// Phone pointer idle.
        const THREE_DOF_POINTER = 1 << 2;
        /// Mouse idle.
        const MOUSE = 1 << 3;
        /// Touch surface idle.
        const TOUCH_SURFACE = 1 << 4;
    }
}

impl SleepFlags {
    /// Flag for `modality`, optionally narrowed to one hand.
    ///
    /// Gesture without a hand means both hands.
    pub fn for_modality(modality: Modality, hand: Option<Handedness>) -> Self {
        match (modality, hand) {
            (Modality::None, _) => Self::empty(),
            (Modality::Gesture, Some(Handedness::Left)) => Self::GESTURE_LEFT,
            (Modality::Gesture, Some(Handedness::Right)) => Self::GESTURE_RIGHT,
            (Modality::Gesture, None) => Self::GESTURE_LEFT | Self::GESTURE_RIGHT,
            (Modality::ThreeDofPointer, _) => Self::THREE_DOF_POINTER,
            (Modality::Mouse, _) => Self::MOUSE,
            (Modality::TouchSurface, _) => Self::TOUCH_SURFACE,
        }
    }
}

/// Whether a hand is close enough to touch an interactable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Proximity {
    /// Hovering an interactable within reach.
    Near,
    /// Nothing within reach; the ray is used instead.
    #[default]
    Far,
}

/// Which side of the hand faces the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HandOrientation {
    /// Back of the hand.
    #[default]
    Back,
    /// Palm.
    Palm,
}

/// Routing of hand input relative to the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeadHandMode {
    /// Hands act in world space.
    #[default]
    NormalHand,
    /// Hand rays are locked to the head.
    HeadLockedHand,
}

/// Per-hand detail owned by the gesture producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandStatus {
    /// Tracker currently sees the hand.
    pub tracking_active: bool,
    /// Near/far interaction.
    pub proximity: Proximity,
    /// Palm or back facing.
    pub orientation: HandOrientation,
    /// Watch overlay shown.
    pub watch_overlay: bool,
    /// The hand's ray is dragging something.
    pub is_dragging: bool,
}

/// Global interaction status. Producers write their own fields; the
/// arbitrator only writes `active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleActivationStatus {
    /// Active modality.
    pub active: Modality,
    /// Per-hand detail, indexed by [`Handedness::index`].
    pub hands: [HandStatus; 2],
    /// Idle flags.
    pub sleep: SleepFlags,
    /// Head/hand routing.
    pub head_hand_mode: HeadHandMode,
    /// Hand whose ray is the active one.
    pub active_hand_ray: Option<Handedness>,
}

impl ModuleActivationStatus {
    /// Detail for `hand`.
    pub fn hand(&self, hand: Handedness) -> &HandStatus {
        &self.hands[hand.index()]
    }
}
