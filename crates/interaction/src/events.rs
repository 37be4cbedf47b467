//! Coarse lifecycle notifications for application code.

use crate::modality::{ConsumerId, Modality};
use crate::registry::InteractableState;
use serde::{Deserialize, Serialize};
use xrinteract_core::{Handedness, ObjectId};

/// Lifecycle notification. Pointer events travel separately through the router.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InteractionEvent {
    /// Active modality switched.
    ModalityChanged {
        /// Previous modality.
        from: Modality,
        /// New modality.
        to: Modality,
    },
    /// A modality (or one hand of the gesture modality) went idle or woke up.
    SleepChanged {
        /// Modality whose idle flag changed.
        modality: Modality,
        /// Hand, for gesture.
        hand: Option<Handedness>,
        /// New flag value.
        sleeping: bool,
    },
    /// A consumer was enabled or disabled by its rule.
    ConsumerEnabled {
        /// Consumer handle.
        consumer: ConsumerId,
        /// New state.
        enabled: bool,
    },
    /// Derived interactable state changed.
    InteractableStateChanged {
        /// Object.
        object: ObjectId,
        /// Previous state.
        from: InteractableState,
        /// New state.
        to: InteractableState,
    },
    /// A hand started hovering an interactable.
    HoverBegin {
        /// Hand.
        hand: Handedness,
        /// Hovered interactable.
        object: ObjectId,
    },
    /// A hand stopped hovering an interactable.
    HoverEnd {
        /// Hand.
        hand: Handedness,
        /// Previously hovered interactable.
        object: ObjectId,
    },
    /// An object was attached to a hand.
    Grabbed {
        /// Hand.
        hand: Handedness,
        /// Attached object.
        object: ObjectId,
    },
    /// An object left a hand.
    Released {
        /// Hand.
        hand: Handedness,
        /// Detached object.
        object: ObjectId,
        /// The object vanished while held.
        lost: bool,
    },
    /// Ease-in finished for an attached object. Fires once per grab.
    EaseInCompleted {
        /// Hand.
        hand: Handedness,
        /// Attached object.
        object: ObjectId,
    },
}
