//! Hand hover candidate selection.

use xrinteract_core::ObjectId;

/// An interactable inside the hover sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverCandidate {
    /// Interactable.
    pub object: ObjectId,
    /// Distance from the hover point.
    pub distance: f32,
    /// Hover priority.
    pub priority: i32,
}

/// Closest candidate, with priority as a tie-break.
///
/// A candidate replaces the current pick iff it is strictly closer and its
/// priority is not strictly lower. The result depends on visiting order.
pub fn pick_closest(candidates: impl IntoIterator<Item = HoverCandidate>) -> Option<HoverCandidate> {
    let mut closest: Option<HoverCandidate> = None;
    let mut closest_distance = f32::MAX;
    for candidate in candidates {
        let lower_priority = closest.is_some_and(|c| candidate.priority < c.priority);
        if candidate.distance < closest_distance && !lower_priority {
            closest_distance = candidate.distance;
            closest = Some(candidate);
        }
    }
    closest
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct HoverState {
    pub(crate) current: Option<ObjectId>,
    pub(crate) locked: bool,
    pub(crate) timer: f32,
}
