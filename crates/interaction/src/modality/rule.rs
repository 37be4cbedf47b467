//! Declarative enablement rules.
//!
//! Every mask uses AND-equals-mask semantics: the rule matches when
//! `current & mask == mask`. An empty mask therefore places no requirement,
//! and a mask asking for two mutually exclusive bits can never match.

use super::{HandOrientation, HeadHandMode, Modality, ModalityMask, ModuleActivationStatus, Proximity, SleepFlags};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use xrinteract_core::Handedness;

bitflags! {
    /// Which hands must be tracked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HandSideMask: u8 {
        /// Left hand.
        const LEFT = 1 << 0;
        /// Right hand.
        const RIGHT = 1 << 1;
    }
}

bitflags! {
    /// Required hand proximity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ProximityMask: u8 {
        /// Near interaction.
        const NEAR = 1 << 0;
        /// Far (ray) interaction.
        const FAR = 1 << 1;
    }
}

bitflags! {
    /// Required hand orientation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct OrientationMask: u8 {
        /// Back of hand facing.
        const BACK = 1 << 0;
        /// Palm facing.
        const PALM = 1 << 1;
    }
}

bitflags! {
    /// Required watch overlay state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WatchMask: u8 {
        /// Overlay hidden.
        const HIDDEN = 1 << 0;
        /// Overlay shown.
        const SHOWN = 1 << 1;
    }
}

bitflags! {
    /// Required head/hand routing mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HeadHandMask: u8 {
        /// Normal hands.
        const NORMAL_HAND = 1 << 0;
        /// Head-locked hands.
        const HEAD_LOCKED_HAND = 1 << 1;
    }
}

bitflags! {
    /// Required active ray side.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RaySideMask: u8 {
        /// Left hand ray.
        const LEFT = 1 << 0;
        /// Right hand ray.
        const RIGHT = 1 << 1;
    }
}

impl HandSideMask {
    /// Bit for one hand.
    pub fn of(hand: Handedness) -> Self {
        match hand {
            Handedness::Left => Self::LEFT,
            Handedness::Right => Self::RIGHT,
        }
    }
}

impl RaySideMask {
    /// Bit for one hand.
    pub fn of(hand: Handedness) -> Self {
        match hand {
            Handedness::Left => Self::LEFT,
            Handedness::Right => Self::RIGHT,
        }
    }
}

/// Predicate over [`ModuleActivationStatus`] attached to a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnablementRule {
    /// Required active modality.
    pub modality: ModalityMask,
    /// Hands that must be tracked; also selects which hands the hand masks look at.
    pub hand_side: HandSideMask,
    /// Required proximity.
    pub proximity: ProximityMask,
    /// Required orientation.
    pub orientation: OrientationMask,
    /// Required watch state.
    pub watch: WatchMask,
    /// Required head/hand mode.
    pub head_hand: HeadHandMask,
    /// Required active ray side.
    pub ray_side: RaySideMask,
    /// Disable when a relevant hand is not tracked.
    pub disable_when_tracking_lost: bool,
}

impl EnablementRule {
    /// Rule that matches only while `modality` is active.
    pub fn for_modality(modality: Modality) -> Self {
        Self {
            modality: modality.mask(),
            ..Self::default()
        }
    }

    /// Require `hand` to be tracked, and disable when it is lost.
    pub fn with_hand(mut self, hand: Handedness) -> Self {
        self.hand_side |= HandSideMask::of(hand);
        self.disable_when_tracking_lost = true;
        self
    }

    /// Require a proximity.
    pub fn with_proximity(mut self, proximity: ProximityMask) -> Self {
        self.proximity = proximity;
        self
    }

    /// Hands whose detail this rule inspects.
    ///
    /// The rule's own hand side when set, else the active ray hand, else both.
    pub fn relevant_hands(&self, status: &ModuleActivationStatus) -> Vec<Handedness> {
        if !self.hand_side.is_empty() {
            Handedness::BOTH
                .into_iter()
                .filter(|h| self.hand_side.contains(HandSideMask::of(*h)))
                .collect()
        } else if let Some(hand) = status.active_hand_ray {
            vec![hand]
        } else {
            Handedness::BOTH.to_vec()
        }
    }

    /// Evaluate against `status`.
    pub fn evaluate(&self, status: &ModuleActivationStatus) -> bool {
        let hands = self.relevant_hands(status);

        let mut tracked = HandSideMask::empty();
        for hand in Handedness::BOTH {
            if status.hand(hand).tracking_active {
                tracked |= HandSideMask::of(hand);
            }
        }
        let hand_masks_match = hands.iter().any(|h| self.hand_detail_matches(status, *h));
        let head_hand = match status.head_hand_mode {
            HeadHandMode::NormalHand => HeadHandMask::NORMAL_HAND,
            HeadHandMode::HeadLockedHand => HeadHandMask::HEAD_LOCKED_HAND,
        };
        let ray_side = status.active_hand_ray.map_or(RaySideMask::empty(), RaySideMask::of);

        let masks_match = status.active.mask().contains(self.modality)
            && tracked.contains(self.hand_side)
            && hand_masks_match
            && head_hand.contains(self.head_hand)
            && ray_side.contains(self.ray_side);
        if !masks_match {
            return false;
        }

        if self.disable_when_tracking_lost && !hands.iter().all(|h| status.hand(*h).tracking_active) {
            return false;
        }

        !self.sleeping(status, &hands)
    }

    /// Proximity, orientation and watch masks against a single hand.
    fn hand_detail_matches(&self, status: &ModuleActivationStatus, hand: Handedness) -> bool {
        let detail = status.hand(hand);
        let proximity = match detail.proximity {
            Proximity::Near => ProximityMask::NEAR,
            Proximity::Far => ProximityMask::FAR,
        };
        let orientation = match detail.orientation {
            HandOrientation::Back => OrientationMask::BACK,
            HandOrientation::Palm => OrientationMask::PALM,
        };
        let watch = if detail.watch_overlay {
            WatchMask::SHOWN
        } else {
            WatchMask::HIDDEN
        };
        proximity.contains(self.proximity) && orientation.contains(self.orientation) && watch.contains(self.watch)
    }

    fn sleeping(&self, status: &ModuleActivationStatus, hands: &[Handedness]) -> bool {
        if self.modality.is_empty() {
            return false;
        }
        match status.active {
            Modality::None => false,
            Modality::Gesture => {
                !hands.is_empty()
                    && hands
                        .iter()
                        .all(|h| status.sleep.contains(SleepFlags::for_modality(Modality::Gesture, Some(*h))))
            }
            other => status.sleep.contains(SleepFlags::for_modality(other, None)),
        }
    }
}
