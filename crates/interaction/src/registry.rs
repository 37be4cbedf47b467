//! Interactable registry: which scene objects are interaction targets, who
//! is hovering or selecting them, and the state derived from that.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};
use xrinteract_core::{Handedness, InteractorId, ObjectId};
use xrinteract_physics::Scene;

/// Derived per-object interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractableState {
    /// Nobody hovering or selecting.
    #[default]
    Normal,
    /// At least one hovering interactor, nobody selecting.
    Hover,
    /// At least one selecting interactor.
    Select,
}

/// Predicate that can veto an interactor. Receives the interactor and its hand, if any.
pub type InteractorFilter = Box<dyn Fn(InteractorId, Option<Handedness>) -> bool>;

/// Authoring-time settings of an interactable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractableDesc {
    /// Maximum simultaneous hovering interactors (`None` = unlimited).
    pub max_hovering: Option<usize>,
    /// Maximum simultaneous selecting interactors (`None` = unlimited).
    pub max_selecting: Option<usize>,
    /// Tie-break priority for hand hover candidate search.
    pub hover_priority: i32,
}

impl Default for InteractableDesc {
    fn default() -> Self {
        Self {
            max_hovering: None,
            max_selecting: Some(1),
            hover_priority: 0,
        }
    }
}

/// A registered interaction target.
pub struct Interactable {
    object: ObjectId,
    desc: InteractableDesc,
    filters: Vec<InteractorFilter>,
    hovering: BTreeSet<InteractorId>,
    selecting: BTreeSet<InteractorId>,
}

impl fmt::Debug for Interactable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interactable")
            .field("object", &self.object)
            .field("desc", &self.desc)
            .field("filters", &self.filters.len())
            .field("hovering", &self.hovering)
            .field("selecting", &self.selecting)
            .finish()
    }
}

impl Interactable {
    /// Scene object this interactable belongs to.
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Authoring settings.
    pub fn desc(&self) -> &InteractableDesc {
        &self.desc
    }

    /// Hover tie-break priority.
    pub fn hover_priority(&self) -> i32 {
        self.desc.hover_priority
    }

    /// Interactors currently hovering.
    pub fn hovering(&self) -> &BTreeSet<InteractorId> {
        &self.hovering
    }

    /// Interactors currently selecting.
    pub fn selecting(&self) -> &BTreeSet<InteractorId> {
        &self.selecting
    }

    /// Select if anyone selects, else Hover if anyone hovers, else Normal.
    pub fn state(&self) -> InteractableState {
        if !self.selecting.is_empty() {
            InteractableState::Select
        } else if !self.hovering.is_empty() {
            InteractableState::Hover
        } else {
            InteractableState::Normal
        }
    }

    /// Whether every capability filter accepts the interactor.
    pub fn accepts(&self, interactor: InteractorId, hand: Option<Handedness>) -> bool {
        self.filters.iter().all(|f| f(interactor, hand))
    }

    fn can_hover(&self, interactor: InteractorId, hand: Option<Handedness>) -> bool {
        self.accepts(interactor, hand)
            && self.desc.max_hovering.map_or(true, |max| self.hovering.len() < max)
    }

    fn can_select(&self, interactor: InteractorId, hand: Option<Handedness>) -> bool {
        self.accepts(interactor, hand)
            && self.desc.max_selecting.map_or(true, |max| self.selecting.len() < max)
    }
}

/// Occupancy change reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// Object whose state changed.
    pub object: ObjectId,
    /// Previous state.
    pub from: InteractableState,
    /// New state.
    pub to: InteractableState,
}

/// Occupants of an interactable that vanished, reported by [`InteractableRegistry::prune`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LostInteractable {
    /// The vanished object.
    pub object: ObjectId,
    /// Interactors that were hovering it.
    pub hovering: Vec<InteractorId>,
    /// Interactors that were selecting it.
    pub selecting: Vec<InteractorId>,
}

/// All registered interactables, keyed by scene object.
///
/// Membership follows the object's lifecycle: register on enable,
/// unregister on disable.
#[derive(Debug, Default)]
pub struct InteractableRegistry {
    entries: BTreeMap<ObjectId, Interactable>,
    changes: Vec<StateChange>,
}

impl InteractableRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object`. Re-registering replaces the settings but keeps occupancy.
    pub fn register(&mut self, object: ObjectId, desc: InteractableDesc) {
        match self.entries.get_mut(&object) {
            Some(existing) => existing.desc = desc,
            None => {
                self.entries.insert(
                    object,
                    Interactable {
                        object,
                        desc,
                        filters: Vec::new(),
                        hovering: BTreeSet::new(),
                        selecting: BTreeSet::new(),
                    },
                );
                debug!(%object, "interactable registered");
            }
        }
    }

    /// Attach a capability filter. Returns `false` if `object` is not registered.
    pub fn add_filter(&mut self, object: ObjectId, filter: InteractorFilter) -> bool {
        match self.entries.get_mut(&object) {
            Some(entry) => {
                entry.filters.push(filter);
                true
            }
            None => false,
        }
    }

    /// Unregister `object`, returning whoever was still hovering or selecting it.
    pub fn unregister(&mut self, object: ObjectId) -> Option<LostInteractable> {
        let entry = self.entries.remove(&object)?;
        let before = entry.state();
        if before != InteractableState::Normal {
            self.changes.push(StateChange {
                object,
                from: before,
                to: InteractableState::Normal,
            });
        }
        debug!(%object, "interactable unregistered");
        Some(LostInteractable {
            object,
            hovering: entry.hovering.into_iter().collect(),
            selecting: entry.selecting.into_iter().collect(),
        })
    }

    /// Drop entries whose scene object no longer exists.
    pub fn prune(&mut self, scene: &Scene) -> Vec<LostInteractable> {
        let dead: Vec<ObjectId> = self
            .entries
            .keys()
            .copied()
            .filter(|id| !scene.contains(*id))
            .collect();
        dead.into_iter()
            .filter_map(|id| {
                warn!(object = %id, "interactable object vanished; clearing registry entry");
                self.unregister(id)
            })
            .collect()
    }

    /// Whether `object` itself is registered.
    pub fn contains(&self, object: ObjectId) -> bool {
        self.entries.contains_key(&object)
    }

    /// Borrow an entry.
    pub fn get(&self, object: ObjectId) -> Option<&Interactable> {
        self.entries.get(&object)
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Derived state of `object`, `None` if unregistered.
    pub fn state(&self, object: ObjectId) -> Option<InteractableState> {
        self.entries.get(&object).map(Interactable::state)
    }

    /// Nearest registered object among `object` and its ancestors.
    ///
    /// Colliders on child objects resolve to the interactable that owns them.
    pub fn owning_interactable(&self, scene: &Scene, object: ObjectId) -> Option<ObjectId> {
        scene
            .ancestors(object)
            .into_iter()
            .find(|a| self.entries.contains_key(a))
    }

    /// Add a hovering interactor. Returns `false` when vetoed, full or unregistered.
    pub fn hover_enter(&mut self, object: ObjectId, interactor: InteractorId, hand: Option<Handedness>) -> bool {
        self.mutate(object, |entry| {
            if entry.hovering.contains(&interactor) {
                return true;
            }
            entry.can_hover(interactor, hand) && entry.hovering.insert(interactor)
        })
    }

    /// Remove a hovering interactor. Returns `false` if it was not hovering.
    pub fn hover_exit(&mut self, object: ObjectId, interactor: InteractorId) -> bool {
        self.mutate(object, |entry| entry.hovering.remove(&interactor))
    }

    /// Add a selecting interactor. Returns `false` when vetoed, full or unregistered.
    pub fn select_enter(&mut self, object: ObjectId, interactor: InteractorId, hand: Option<Handedness>) -> bool {
        self.mutate(object, |entry| {
            if entry.selecting.contains(&interactor) {
                return true;
            }
            entry.can_select(interactor, hand) && entry.selecting.insert(interactor)
        })
    }

    /// Whether `select_enter` would admit `interactor` once every interactor
    /// in `leaving` has stopped selecting. Changes nothing.
    pub fn can_select_after(
        &self,
        object: ObjectId,
        interactor: InteractorId,
        hand: Option<Handedness>,
        leaving: &[InteractorId],
    ) -> bool {
        let Some(entry) = self.entries.get(&object) else {
            return false;
        };
        if !entry.accepts(interactor, hand) {
            return false;
        }
        let remaining = entry
            .selecting
            .iter()
            .filter(|i| **i != interactor && !leaving.contains(i))
            .count();
        entry.desc.max_selecting.map_or(true, |max| remaining < max)
    }

    /// Remove a selecting interactor. Returns `false` if it was not selecting.
    pub fn select_exit(&mut self, object: ObjectId, interactor: InteractorId) -> bool {
        self.mutate(object, |entry| entry.selecting.remove(&interactor))
    }

    /// Remove `interactor` from every hover and select set (interactor disabled).
    pub fn release_interactor(&mut self, interactor: InteractorId) {
        let objects: Vec<ObjectId> = self.entries.keys().copied().collect();
        for object in objects {
            self.mutate(object, |entry| {
                let a = entry.hovering.remove(&interactor);
                let b = entry.selecting.remove(&interactor);
                a || b
            });
        }
    }

    /// Take the state changes recorded since the last call.
    pub fn drain_changes(&mut self) -> Vec<StateChange> {
        std::mem::take(&mut self.changes)
    }

    fn mutate(&mut self, object: ObjectId, f: impl FnOnce(&mut Interactable) -> bool) -> bool {
        let Some(entry) = self.entries.get_mut(&object) else {
            return false;
        };
        let before = entry.state();
        let result = f(entry);
        let after = entry.state();
        if before != after {
            self.changes.push(StateChange {
                object,
                from: before,
                to: after,
            });
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrinteract_core::Pose;
    use xrinteract_physics::ObjectDesc;

    const A: InteractorId = InteractorId(1);
    const B: InteractorId = InteractorId(2);

    fn setup() -> (Scene, InteractableRegistry, ObjectId) {
        let mut scene = Scene::new();
        let cube = scene.spawn(ObjectDesc::new("cube", Pose::IDENTITY));
        let mut registry = InteractableRegistry::new();
        registry.register(cube, InteractableDesc::default());
        (scene, registry, cube)
    }

    #[test]
    fn state_derives_from_occupancy() {
        let (_scene, mut registry, cube) = setup();
        assert_eq!(registry.state(cube), Some(InteractableState::Normal));

        assert!(registry.hover_enter(cube, A, None));
        assert_eq!(registry.state(cube), Some(InteractableState::Hover));

        assert!(registry.select_enter(cube, A, None));
        assert_eq!(registry.state(cube), Some(InteractableState::Select));

        assert!(registry.hover_exit(cube, A));
        assert_eq!(registry.state(cube), Some(InteractableState::Select));

        assert!(registry.select_exit(cube, A));
        assert_eq!(registry.state(cube), Some(InteractableState::Normal));

        let changes = registry.drain_changes();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].to, InteractableState::Hover);
        assert_eq!(changes[2].to, InteractableState::Normal);
    }

    #[test]
    fn select_capacity_is_enforced() {
        let (_scene, mut registry, cube) = setup();
        assert!(registry.select_enter(cube, A, None));
        assert!(!registry.select_enter(cube, B, None));
        assert!(registry.select_enter(cube, A, None), "re-entry by the same interactor is idempotent");
    }

    #[test]
    fn select_check_discounts_leaving_interactors() {
        let (_scene, mut registry, cube) = setup();
        assert!(registry.select_enter(cube, A, None));
        assert!(!registry.can_select_after(cube, B, None, &[]));
        assert!(registry.can_select_after(cube, B, None, &[A]));
        assert!(registry.can_select_after(cube, A, None, &[]));
        assert_eq!(registry.get(cube).map(|e| e.selecting().len()), Some(1));
    }

    #[test]
    fn filters_veto_interactors() {
        let (_scene, mut registry, cube) = setup();
        registry.add_filter(cube, Box::new(|_, hand| hand == Some(Handedness::Right)));
        assert!(!registry.hover_enter(cube, A, Some(Handedness::Left)));
        assert!(!registry.hover_enter(cube, A, None));
        assert!(registry.hover_enter(cube, B, Some(Handedness::Right)));
    }

    #[test]
    fn owning_interactable_walks_ancestors() {
        let (mut scene, registry, cube) = setup();
        let handle = scene.spawn(ObjectDesc::new("handle", Pose::IDENTITY).with_parent(cube));
        let loose = scene.spawn(ObjectDesc::new("loose", Pose::IDENTITY));
        assert_eq!(registry.owning_interactable(&scene, handle), Some(cube));
        assert_eq!(registry.owning_interactable(&scene, loose), None);
    }

    #[test]
    fn prune_reports_lost_occupants() {
        let (mut scene, mut registry, cube) = setup();
        registry.hover_enter(cube, A, None);
        registry.select_enter(cube, B, None);
        registry.drain_changes();

        scene.destroy(cube);
        let lost = registry.prune(&scene);
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].hovering, vec![A]);
        assert_eq!(lost[0].selecting, vec![B]);
        assert!(registry.is_empty());
        assert_eq!(registry.drain_changes()[0].to, InteractableState::Normal);
    }

    #[test]
    fn unregistered_objects_reject_everything() {
        let (mut scene, mut registry, _cube) = setup();
        let other = scene.spawn(ObjectDesc::new("other", Pose::IDENTITY));
        assert!(!registry.hover_enter(other, A, None));
        assert!(!registry.select_exit(other, A));
        assert!(registry.unregister(other).is_none());
    }
}
