//! Hands and the grab engine.

use super::hover::HoverState;
use super::{
    pick_closest, rotation_vector, BodySnapshot, EaseIn, GrabConfig, GrabFlags, GrabSettings, GrabType,
    GrabbedObject, HoverCandidate, ReleaseSettings, ReleaseStyle, VelocityEstimator, HAND_LOOKBACK,
};
use crate::events::InteractionEvent;
use crate::registry::InteractableRegistry;
use glam::Vec3;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};
use xrinteract_core::{Handedness, InteractorId, ObjectId, Pose};
use xrinteract_input::InputState;
use xrinteract_physics::{CollisionMode, Scene};

/// Mutable surroundings the engine works on.
pub struct GrabWorld<'a> {
    /// Scene objects.
    pub scene: &'a mut Scene,
    /// Interactables; receives hover/select occupancy for each hand.
    pub registry: &'a mut InteractableRegistry,
    /// Lifecycle notifications.
    pub events: &'a mut Vec<InteractionEvent>,
}

/// Construction parameters for a hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandDesc {
    /// Interactor identity used for registry occupancy.
    pub interactor: InteractorId,
    /// Scene object that follows the tracked grip pose.
    pub object: ObjectId,
    /// Generic attach point, relative to the hand.
    pub grab_point: Pose,
    /// Snap point for pinch grabs with [`GrabFlags::SNAP_ON_ATTACH`].
    pub snap_point: Pose,
}

/// One hand: its stack of grabbed objects and its hover state.
#[derive(Debug, Clone)]
pub struct Hand {
    handedness: Handedness,
    interactor: InteractorId,
    object: ObjectId,
    grab_point: Pose,
    snap_point: Pose,
    stack: Vec<GrabbedObject>,
    hover: HoverState,
    enabled: bool,
    history: VelocityEstimator,
}

impl Hand {
    /// Which hand.
    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Interactor identity.
    pub fn interactor(&self) -> InteractorId {
        self.interactor
    }

    /// Scene object following the grip pose.
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Grabbed objects, oldest first.
    pub fn stack(&self) -> &[GrabbedObject] {
        &self.stack
    }

    /// Top of the stack.
    pub fn current_grabbed(&self) -> Option<ObjectId> {
        self.stack.last().map(|e| e.object)
    }

    /// Whether `object` is on this hand's stack.
    pub fn is_grabbed(&self, object: ObjectId) -> bool {
        self.stack.iter().any(|e| e.object == object)
    }

    /// Hovered interactable.
    pub fn hovering(&self) -> Option<ObjectId> {
        self.hover.current
    }

    /// Whether hover is pinned.
    pub fn is_hover_locked(&self) -> bool {
        self.hover.locked
    }

    /// Whether hover search and gesture grabs run.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Recent hand velocity.
    pub fn velocity(&self) -> Vec3 {
        self.history.velocity()
    }
}

/// Owns both hands and applies attachment semantics.
#[derive(Debug, Default)]
pub struct GrabEngine {
    config: GrabConfig,
    hands: [Option<Hand>; 2],
    settings: BTreeMap<ObjectId, GrabSettings>,
    now: f64,
    overlap: Vec<ObjectId>,
}

impl GrabEngine {
    /// Engine without hands.
    pub fn new(config: GrabConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Tuning.
    pub fn config(&self) -> &GrabConfig {
        &self.config
    }

    /// Engine clock (seconds of render time).
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Install a hand, replacing any previous one on that side.
    pub fn add_hand(&mut self, handedness: Handedness, desc: HandDesc) {
        self.hands[handedness.index()] = Some(Hand {
            handedness,
            interactor: desc.interactor,
            object: desc.object,
            grab_point: desc.grab_point,
            snap_point: desc.snap_point,
            stack: Vec::new(),
            hover: HoverState {
                timer: self.config.hover_interval,
                ..HoverState::default()
            },
            enabled: true,
            history: VelocityEstimator::new(),
        });
    }

    /// Borrow a hand.
    pub fn hand(&self, handedness: Handedness) -> Option<&Hand> {
        self.hands[handedness.index()].as_ref()
    }

    /// Grab behaviour for `object`.
    pub fn set_settings(&mut self, object: ObjectId, settings: GrabSettings) {
        self.settings.insert(object, settings);
    }

    /// Grab behaviour for `object`, or the defaults.
    pub fn settings(&self, object: ObjectId) -> GrabSettings {
        self.settings.get(&object).copied().unwrap_or_default()
    }

    /// Top of a hand's stack.
    pub fn current_grabbed(&self, handedness: Handedness) -> Option<ObjectId> {
        self.hand(handedness).and_then(Hand::current_grabbed)
    }

    /// Whether `handedness` holds `object`.
    pub fn is_grabbed(&self, handedness: Handedness, object: ObjectId) -> bool {
        self.hand(handedness).is_some_and(|h| h.is_grabbed(object))
    }

    /// Hand holding `object`, if any.
    pub fn holder_of(&self, object: ObjectId) -> Option<Handedness> {
        Handedness::BOTH.into_iter().find(|h| self.is_grabbed(*h, object))
    }

    /// Whether a hand hovers something within reach.
    pub fn is_near(&self, handedness: Handedness) -> bool {
        self.hand(handedness).is_some_and(|h| h.hover.current.is_some())
    }

    /// Enable or disable a hand's hover search and gesture grabs.
    ///
    /// Disabling ends hover; held objects stay attached.
    pub fn set_enabled(&mut self, world: &mut GrabWorld<'_>, handedness: Handedness, enabled: bool) {
        let interval = self.config.hover_interval;
        let Some(hand) = self.hands[handedness.index()].as_mut() else {
            return;
        };
        if hand.enabled == enabled {
            return;
        }
        hand.enabled = enabled;
        if enabled {
            hand.hover.timer = interval;
        } else {
            hand.hover.locked = false;
            set_hover(hand, world, None);
        }
        debug!(hand = ?handedness, enabled, "hand enablement");
    }

    /// Pin hover on `object` until [`GrabEngine::hover_unlock`].
    pub fn hover_lock(&mut self, world: &mut GrabWorld<'_>, handedness: Handedness, object: ObjectId) {
        let Some(hand) = self.hands[handedness.index()].as_mut() else {
            return;
        };
        if !world.scene.contains(object) {
            return;
        }
        set_hover(hand, world, Some(object));
        hand.hover.locked = true;
    }

    /// Release a hover lock held on `object`.
    pub fn hover_unlock(&mut self, handedness: Handedness, object: ObjectId) {
        if let Some(hand) = self.hands[handedness.index()].as_mut() {
            if hand.hover.current == Some(object) {
                hand.hover.locked = false;
            }
        }
    }

    /// Render tick, first step: drop vanished objects, move hands to their
    /// grip poses and record hand motion.
    pub fn track_hands(&mut self, world: &mut GrabWorld<'_>, input: &InputState, dt: f32) {
        self.now += f64::from(dt.max(0.0));
        self.prune(world);
        for hand in self.hands.iter_mut().flatten() {
            if let Some(frame) = input.hand(hand.handedness).filter(|f| f.tracking) {
                world.scene.set_world_pose(hand.object, frame.grip_pose);
            }
            if let Some(pose) = world.scene.world_pose(hand.object) {
                hand.history.push(self.now, pose.position, pose.rotation);
            }
        }
    }

    /// Render tick: proximity search on the hover interval.
    pub fn update_hover(&mut self, world: &mut GrabWorld<'_>, dt: f32) {
        for hand in self.hands.iter_mut().flatten() {
            validate_hover(hand, world);
            if !hand.enabled || hand.hover.locked {
                continue;
            }
            hand.hover.timer += dt.max(0.0);
            if hand.hover.timer < self.config.hover_interval {
                continue;
            }
            hand.hover.timer = 0.0;
            let next = search_hover(&self.config, hand, world.scene, world.registry, &mut self.overlap);
            set_hover(hand, world, next);
        }
    }

    /// Render tick: grab on pinch/grip start over a hovered interactable,
    /// release on pinch/grip end.
    pub fn apply_gestures(&mut self, world: &mut GrabWorld<'_>, input: &InputState) {
        for handedness in Handedness::BOTH {
            let Some(hand) = self.hand(handedness) else {
                continue;
            };
            let edges = input.hand_edges(handedness);
            let target = hand.enabled.then_some(hand.hover.current).flatten();

            if edges.pinch_ended {
                self.release_type(world, handedness, GrabType::Pinch);
            }
            if edges.grip_ended {
                self.release_type(world, handedness, GrabType::Grip);
            }
            let Some(target) = target else {
                continue;
            };
            let grab_type = if edges.pinch_started {
                GrabType::Pinch
            } else if edges.grip_started {
                GrabType::Grip
            } else {
                continue;
            };
            let settings = self.settings(target);
            self.grab(world, handedness, target, grab_type, settings.flags, settings.offset);
        }
    }

    /// Render tick, last step: ease-in and teleport-follow.
    pub fn update_follow(&mut self, world: &mut GrabWorld<'_>, dt: f32) {
        self.prune(world);
        let config = self.config;
        for hand in self.hands.iter_mut().flatten() {
            let Some(hand_pose) = world.scene.world_pose(hand.object) else {
                continue;
            };
            for entry in hand.stack.iter_mut() {
                let target = entry.target_pose(&hand_pose);
                if let Some(mut ease) = entry.ease {
                    ease.elapsed += dt.max(0.0);
                    let t = if config.ease_duration > 0.0 {
                        ease.elapsed / config.ease_duration
                    } else {
                        1.0
                    };
                    let pose = ease.start.interpolate(&target, config.ease_curve.apply(t));
                    world.scene.set_world_pose(entry.object, pose);
                    if let Some(body) = world.scene.body_mut(entry.object) {
                        body.velocity = Vec3::ZERO;
                        body.angular_velocity = Vec3::ZERO;
                    }
                    if t >= 1.0 {
                        entry.ease = None;
                        debug!(hand = ?hand.handedness, object = %entry.object, "ease-in complete");
                        world.events.push(InteractionEvent::EaseInCompleted {
                            hand: hand.handedness,
                            object: entry.object,
                        });
                    } else {
                        entry.ease = Some(ease);
                    }
                } else if !follows_by_velocity(entry, world.scene) {
                    world.scene.set_world_pose(entry.object, target);
                }
                if let Some(pose) = world.scene.world_pose(entry.object) {
                    entry.estimator.push(self.now, pose.position, pose.rotation);
                }
            }
        }
    }

    /// Physics tick: drive velocity-moved bodies toward their attach pose.
    ///
    /// Objects still easing in are skipped.
    pub fn fixed_update(&mut self, scene: &mut Scene, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let config = self.config;
        for hand in self.hands.iter().flatten() {
            let Some(hand_pose) = scene.world_pose(hand.object) else {
                continue;
            };
            for entry in &hand.stack {
                if entry.ease.is_some() || !follows_by_velocity(entry, scene) {
                    continue;
                }
                let (Some(current), Some(scale)) = (scene.world_pose(entry.object), scene.lossy_scale(entry.object))
                else {
                    continue;
                };
                let target = entry.target_pose(&hand_pose);
                let velocity_target = (target.position - current.position) * config.velocity_gain / config.reference_rate;
                // Angular gain is tuned per degree of error.
                let angular_target = rotation_vector(current.rotation, target.rotation)
                    * (180.0 / std::f32::consts::PI)
                    * config.angular_gain
                    / config.reference_rate;

                if let Some(body) = scene.body_mut(entry.object) {
                    body.velocity = move_towards(body.velocity, velocity_target, config.max_velocity_change * scale.abs());
                    body.angular_velocity = move_towards(
                        body.angular_velocity,
                        angular_target,
                        config.max_angular_velocity_change,
                    );
                    trace!(object = %entry.object, velocity = ?body.velocity, "velocity follow");
                }
            }
        }
    }

    /// Attach `object` to a hand.
    ///
    /// Grabbing an object this hand already holds releases and re-grabs it.
    /// An object held by the other hand is taken over only with
    /// [`GrabFlags::RELEASE_FROM_OTHER_HAND`]; otherwise the grab is refused.
    /// Returns `false` when refused.
    pub fn grab(
        &mut self,
        world: &mut GrabWorld<'_>,
        handedness: Handedness,
        object: ObjectId,
        grab_type: GrabType,
        flags: GrabFlags,
        offset: Option<Pose>,
    ) -> bool {
        if !world.scene.contains(object) {
            return false;
        }
        let Some(hand) = self.hand(handedness) else {
            return false;
        };
        if hand.object == object || world.scene.ancestors(hand.object).contains(&object) {
            return false;
        }
        let interactor = hand.interactor;
        if world.scene.world_pose(hand.object).is_none() || world.scene.world_pose(object).is_none() {
            return false;
        }

        // Refusals are decided before anything is released.
        let other = Some(handedness.other()).filter(|h| self.is_grabbed(*h, object));
        if other.is_some() && !flags.contains(GrabFlags::RELEASE_FROM_OTHER_HAND) {
            debug!(hand = ?handedness, %object, "grab refused: held by the other hand");
            return false;
        }
        let interactable = world.registry.owning_interactable(world.scene, object);
        if let Some(owner) = interactable {
            let leaving: Vec<InteractorId> = other
                .and_then(|h| self.hand(h))
                .map(|h| h.interactor)
                .into_iter()
                .collect();
            if !world.registry.can_select_after(owner, interactor, Some(handedness), &leaving) {
                debug!(hand = ?handedness, %object, "grab refused by interactable");
                return false;
            }
        }

        if self.is_grabbed(handedness, object) {
            self.release(world, handedness, object, true);
        }
        if let Some(other) = other {
            self.release(world, other, object, true);
        }
        if flags.contains(GrabFlags::DETACH_OTHERS) {
            let held: Vec<ObjectId> = self
                .hand(handedness)
                .map(|h| h.stack.iter().map(|e| e.object).collect())
                .unwrap_or_default();
            for other_object in held {
                self.release(world, handedness, other_object, true);
            }
        }

        if let Some(owner) = interactable {
            if !world.registry.select_enter(owner, interactor, Some(handedness)) {
                debug!(hand = ?handedness, %object, "grab refused by interactable");
                return false;
            }
        }

        let ease_in = self.settings(object).ease_in;
        let now = self.now;
        let Some(hand) = self.hands[handedness.index()].as_mut() else {
            return false;
        };
        let scene = &mut *world.scene;
        let (Some(hand_pose), Some(object_pose)) = (scene.world_pose(hand.object), scene.world_pose(object)) else {
            if let Some(owner) = interactable {
                world.registry.select_exit(owner, interactor);
            }
            return false;
        };

        let attach_point = if flags.contains(GrabFlags::SNAP_ON_ATTACH) && grab_type == GrabType::Pinch {
            hand.snap_point
        } else {
            hand.grab_point
        };
        let attach_world = hand_pose.mul_pose(&attach_point);
        let initial_offset = offset.unwrap_or_else(|| attach_world.relative(&object_pose));
        let original_parent = scene.parent(object);

        let body_snapshot = scene.body(object).map(BodySnapshot::capture);
        if let Some(body) = scene.body_mut(object) {
            if flags.contains(GrabFlags::TURN_ON_KINEMATIC) {
                body.is_kinematic = true;
                if !body.collision_mode.allowed_for_kinematic() {
                    body.collision_mode = CollisionMode::Discrete;
                }
                body.velocity = Vec3::ZERO;
                body.angular_velocity = Vec3::ZERO;
            }
            if flags.contains(GrabFlags::TURN_OFF_GRAVITY) {
                body.use_gravity = false;
            }
        }
        if flags.contains(GrabFlags::PARENT_TO_HAND) {
            scene.set_parent(object, Some(hand.object), true);
        }

        hand.stack.push(GrabbedObject {
            object,
            interactable,
            grab_type,
            flags,
            original_parent,
            attach_point,
            initial_offset,
            body_snapshot,
            grab_time: now,
            ease: ease_in.then_some(EaseIn {
                start: object_pose,
                elapsed: 0.0,
            }),
            estimator: VelocityEstimator::new(),
        });
        debug!(hand = ?handedness, %object, ?grab_type, ?flags, "grabbed");
        world.events.push(InteractionEvent::Grabbed {
            hand: handedness,
            object,
        });
        true
    }

    /// Detach `object` from a hand. Returns `false` (no-op) if the hand does not hold it.
    ///
    /// With `restore_original_parent` the object goes back under its
    /// pre-grab parent; otherwise it is unparented.
    pub fn release(
        &mut self,
        world: &mut GrabWorld<'_>,
        handedness: Handedness,
        object: ObjectId,
        restore_original_parent: bool,
    ) -> bool {
        let release = self.settings(object).release;
        let now = self.now;
        let Some(hand) = self.hands[handedness.index()].as_mut() else {
            return false;
        };
        let Some(index) = hand.stack.iter().position(|e| e.object == object) else {
            trace!(hand = ?handedness, %object, "release ignored: not held");
            return false;
        };
        let entry = hand.stack.remove(index);
        detach(world, hand, entry, restore_original_parent, release, now);
        true
    }

    fn release_type(&mut self, world: &mut GrabWorld<'_>, handedness: Handedness, grab_type: GrabType) {
        let objects: Vec<ObjectId> = self
            .hand(handedness)
            .map(|h| {
                h.stack
                    .iter()
                    .filter(|e| e.grab_type == grab_type)
                    .map(|e| e.object)
                    .collect()
            })
            .unwrap_or_default();
        for object in objects.into_iter().rev() {
            self.release(world, handedness, object, true);
        }
    }

    /// Drop references to vanished objects.
    ///
    /// Objects destroyed while held leave the stack with a lost
    /// notification; a vanished hover target ends hover.
    pub fn prune(&mut self, world: &mut GrabWorld<'_>) {
        for hand in self.hands.iter_mut().flatten() {
            validate_hover(hand, world);
            let mut i = 0;
            while i < hand.stack.len() {
                if world.scene.contains(hand.stack[i].object) {
                    i += 1;
                    continue;
                }
                let entry = hand.stack.remove(i);
                warn!(hand = ?hand.handedness, object = %entry.object, "grabbed object vanished; releasing");
                if let Some(owner) = entry.interactable {
                    world.registry.select_exit(owner, hand.interactor);
                }
                world.events.push(InteractionEvent::Released {
                    hand: hand.handedness,
                    object: entry.object,
                    lost: true,
                });
            }
        }
    }
}

fn follows_by_velocity(entry: &GrabbedObject, scene: &Scene) -> bool {
    entry.flags.contains(GrabFlags::VELOCITY_MOVEMENT) && scene.body(entry.object).is_some_and(|b| !b.is_kinematic)
}

fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance == 0.0 {
        target
    } else {
        current + delta / distance * max_delta
    }
}

fn validate_hover(hand: &mut Hand, world: &mut GrabWorld<'_>) {
    if let Some(current) = hand.hover.current {
        if !world.scene.is_active_in_hierarchy(current) || !world.registry.contains(current) {
            debug!(hand = ?hand.handedness, object = %current, "hover target lost");
            hand.hover.locked = false;
            set_hover(hand, world, None);
        }
    }
}

fn set_hover(hand: &mut Hand, world: &mut GrabWorld<'_>, next: Option<ObjectId>) {
    if hand.hover.current == next {
        return;
    }
    if let Some(old) = hand.hover.current.take() {
        world.registry.hover_exit(old, hand.interactor);
        world.events.push(InteractionEvent::HoverEnd {
            hand: hand.handedness,
            object: old,
        });
    }
    if let Some(new) = next {
        world.registry.hover_enter(new, hand.interactor, Some(hand.handedness));
        world.events.push(InteractionEvent::HoverBegin {
            hand: hand.handedness,
            object: new,
        });
    }
    hand.hover.current = next;
}

fn search_hover(
    config: &GrabConfig,
    hand: &Hand,
    scene: &Scene,
    registry: &InteractableRegistry,
    overlap: &mut Vec<ObjectId>,
) -> Option<ObjectId> {
    let hand_pose = scene.world_pose(hand.object)?;
    let center = hand_pose.mul_pose(&hand.grab_point).position;
    let radius = config.hover_radius * scene.lossy_scale(hand.object).unwrap_or(1.0).abs();
    scene.overlap_sphere(center, radius, config.hover_layer_mask, overlap);

    let mut seen = BTreeSet::new();
    let candidates = overlap.iter().filter_map(|&collider| {
        let owner = registry.owning_interactable(scene, collider)?;
        if !seen.insert(owner) || hand.is_grabbed(owner) {
            return None;
        }
        let entry = registry.get(owner)?;
        if !entry.accepts(hand.interactor, Some(hand.handedness)) {
            return None;
        }
        Some(HoverCandidate {
            object: owner,
            distance: scene.world_pose(owner)?.position.distance(center),
            priority: entry.hover_priority(),
        })
    });
    pick_closest(candidates).map(|c| c.object)
}

fn detach(
    world: &mut GrabWorld<'_>,
    hand: &Hand,
    entry: GrabbedObject,
    restore_original_parent: bool,
    release: ReleaseSettings,
    now: f64,
) {
    let scene = &mut *world.scene;
    if scene.contains(entry.object) {
        if entry.flags.contains(GrabFlags::PARENT_TO_HAND) {
            let parent = if restore_original_parent {
                entry.original_parent.filter(|p| scene.contains(*p))
            } else {
                None
            };
            scene.set_parent(entry.object, parent, true);
        }
        if let (Some(snapshot), Some(body)) = (entry.body_snapshot, scene.body_mut(entry.object)) {
            snapshot.restore(body);
        }
        apply_release_velocity(scene, &entry, hand, release, now);
    }
    if let Some(owner) = entry.interactable {
        world.registry.select_exit(owner, hand.interactor);
    }
    debug!(hand = ?hand.handedness, object = %entry.object, "released");
    world.events.push(InteractionEvent::Released {
        hand: hand.handedness,
        object: entry.object,
        lost: false,
    });
}

fn apply_release_velocity(scene: &mut Scene, entry: &GrabbedObject, hand: &Hand, release: ReleaseSettings, now: f64) {
    let (velocity, angular) = match release.style {
        ReleaseStyle::NoChange => return,
        ReleaseStyle::GetFromHand => hand
            .history
            .velocity_at(now + HAND_LOOKBACK)
            .unwrap_or((Vec3::ZERO, Vec3::ZERO)),
        ReleaseStyle::ShortEstimation => (entry.estimator.velocity(), entry.estimator.angular_velocity()),
    };
    let factor = release.scale_factor(velocity.length());
    if let Some(body) = scene.body_mut(entry.object) {
        if !body.is_kinematic {
            body.velocity = velocity * factor;
            body.angular_velocity = angular;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InteractableDesc;
    use glam::Quat;
    use xrinteract_input::HandFrame;
    use xrinteract_physics::{Collider, ObjectDesc, Rigidbody};

    const LEFT_ID: InteractorId = InteractorId(10);
    const RIGHT_ID: InteractorId = InteractorId(11);

    struct Rig {
        scene: Scene,
        registry: InteractableRegistry,
        events: Vec<InteractionEvent>,
        engine: GrabEngine,
        cube: ObjectId,
        shelf: ObjectId,
    }

    impl Rig {
        fn new() -> Self {
            let mut scene = Scene::new();
            let left = scene.spawn(ObjectDesc::new("left", Pose::from_position(Vec3::new(-0.3, 1.0, 0.3))));
            let right = scene.spawn(ObjectDesc::new("right", Pose::from_position(Vec3::new(0.3, 1.0, 0.3))));
            let shelf = scene.spawn(ObjectDesc::new("shelf", Pose::from_position(Vec3::new(0.0, 1.0, 0.5))));
            let cube = scene.spawn(
                ObjectDesc::new("cube", Pose::from_position(Vec3::new(0.3, 0.0, -0.3)))
                    .with_parent(shelf)
                    .with_collider(Collider::cuboid(Vec3::splat(0.05)))
                    .with_body(Rigidbody {
                        collision_mode: CollisionMode::ContinuousDynamic,
                        ..Rigidbody::default()
                    }),
            );
            let mut registry = InteractableRegistry::new();
            registry.register(cube, InteractableDesc::default());

            let mut engine = GrabEngine::new(GrabConfig::default());
            for (hand, id, object) in [(Handedness::Left, LEFT_ID, left), (Handedness::Right, RIGHT_ID, right)] {
                engine.add_hand(
                    hand,
                    HandDesc {
                        interactor: id,
                        object,
                        grab_point: Pose::IDENTITY,
                        snap_point: Pose::from_position(Vec3::new(0.0, 0.0, 0.05)),
                    },
                );
            }
            Self {
                scene,
                registry,
                events: Vec::new(),
                engine,
                cube,
                shelf,
            }
        }

        fn world(&mut self) -> (GrabWorld<'_>, &mut GrabEngine) {
            (
                GrabWorld {
                    scene: &mut self.scene,
                    registry: &mut self.registry,
                    events: &mut self.events,
                },
                &mut self.engine,
            )
        }

        fn grab(&mut self, hand: Handedness, flags: GrabFlags) -> bool {
            let cube = self.cube;
            let (mut world, engine) = self.world();
            engine.grab(&mut world, hand, cube, GrabType::Grip, flags, None)
        }

        fn release(&mut self, hand: Handedness, restore: bool) -> bool {
            let cube = self.cube;
            let (mut world, engine) = self.world();
            engine.release(&mut world, hand, cube, restore)
        }
    }

    #[test]
    fn regrab_keeps_one_entry() {
        let mut rig = Rig::new();
        assert!(rig.grab(Handedness::Right, GrabFlags::default()));
        assert!(rig.grab(Handedness::Right, GrabFlags::default()));
        assert_eq!(rig.engine.hand(Handedness::Right).unwrap().stack().len(), 1);
        assert_eq!(rig.engine.current_grabbed(Handedness::Right), Some(rig.cube));
    }

    #[test]
    fn releasing_unheld_object_is_noop() {
        let mut rig = Rig::new();
        assert!(!rig.release(Handedness::Left, true));
        assert!(rig.events.is_empty());
    }

    #[test]
    fn kinematic_snapshot_is_restored() {
        let mut rig = Rig::new();
        let flags = GrabFlags::PARENT_TO_HAND | GrabFlags::TURN_ON_KINEMATIC;
        assert!(rig.grab(Handedness::Right, flags));

        let held = *rig.scene.body(rig.cube).unwrap();
        assert!(held.is_kinematic);
        assert_eq!(held.collision_mode, CollisionMode::Discrete);
        let hand = rig.engine.hand(Handedness::Right).unwrap().object();
        assert_eq!(rig.scene.parent(rig.cube), Some(hand));

        assert!(rig.release(Handedness::Right, true));
        let body = *rig.scene.body(rig.cube).unwrap();
        assert!(!body.is_kinematic);
        assert!(body.use_gravity);
        assert_eq!(body.collision_mode, CollisionMode::ContinuousDynamic);
        assert_eq!(rig.scene.parent(rig.cube), Some(rig.shelf));
    }

    #[test]
    fn release_without_restore_unparents() {
        let mut rig = Rig::new();
        rig.grab(Handedness::Right, GrabFlags::default());
        let before = rig.scene.world_pose(rig.cube).unwrap();
        rig.release(Handedness::Right, false);
        assert_eq!(rig.scene.parent(rig.cube), None);
        let after = rig.scene.world_pose(rig.cube).unwrap();
        assert!(before.position.distance(after.position) < 1e-4);
    }

    #[test]
    fn other_hand_needs_release_flag() {
        let mut rig = Rig::new();
        assert!(rig.grab(Handedness::Left, GrabFlags::default()));
        assert!(!rig.grab(Handedness::Right, GrabFlags::PARENT_TO_HAND));
        assert_eq!(rig.engine.holder_of(rig.cube), Some(Handedness::Left));

        assert!(rig.grab(Handedness::Right, GrabFlags::default()));
        assert_eq!(rig.engine.holder_of(rig.cube), Some(Handedness::Right));
        assert!(!rig.engine.is_grabbed(Handedness::Left, rig.cube));
    }

    #[test]
    fn detach_others_empties_stack_first() {
        let mut rig = Rig::new();
        let ball = rig.scene.spawn(ObjectDesc::new("ball", Pose::IDENTITY).with_body(Rigidbody::default()));
        {
            let (mut world, engine) = rig.world();
            assert!(engine.grab(&mut world, Handedness::Right, ball, GrabType::Grip, GrabFlags::empty(), None));
        }
        assert!(rig.grab(Handedness::Right, GrabFlags::DETACH_OTHERS));
        let stack: Vec<ObjectId> = rig
            .engine
            .hand(Handedness::Right)
            .unwrap()
            .stack()
            .iter()
            .map(|e| e.object)
            .collect();
        assert_eq!(stack, vec![rig.cube]);
    }

    #[test]
    fn vetoed_takeover_leaves_other_hand_holding() {
        let mut rig = Rig::new();
        assert!(rig.grab(Handedness::Right, GrabFlags::default()));
        rig.registry.add_filter(rig.cube, Box::new(|interactor, _| interactor != LEFT_ID));
        rig.events.clear();

        assert!(!rig.grab(Handedness::Left, GrabFlags::default()));
        assert_eq!(rig.engine.holder_of(rig.cube), Some(Handedness::Right));
        assert_eq!(rig.engine.current_grabbed(Handedness::Left), None);
        assert!(rig.events.is_empty());
        assert!(rig.registry.get(rig.cube).unwrap().selecting().contains(&RIGHT_ID));
    }

    #[test]
    fn vetoed_detach_others_keeps_stack() {
        let mut rig = Rig::new();
        let ball = rig.scene.spawn(ObjectDesc::new("ball", Pose::IDENTITY).with_body(Rigidbody::default()));
        {
            let (mut world, engine) = rig.world();
            assert!(engine.grab(&mut world, Handedness::Right, ball, GrabType::Grip, GrabFlags::empty(), None));
        }
        rig.registry.add_filter(rig.cube, Box::new(|_, hand| hand != Some(Handedness::Right)));
        rig.events.clear();

        assert!(!rig.grab(Handedness::Right, GrabFlags::DETACH_OTHERS));
        assert_eq!(rig.engine.current_grabbed(Handedness::Right), Some(ball));
        assert!(rig.events.is_empty());
    }

    #[test]
    fn full_interactable_refuses_without_dropping() {
        let mut rig = Rig::new();
        let seats = |max| InteractableDesc {
            max_selecting: Some(max),
            ..InteractableDesc::default()
        };
        rig.registry.register(rig.cube, seats(2));
        assert!(rig.grab(Handedness::Right, GrabFlags::default()));
        assert!(rig.registry.select_enter(rig.cube, InteractorId(99), None));
        rig.registry.register(rig.cube, seats(1));

        // The takeover frees the right hand's seat but not the outside one.
        assert!(!rig.grab(Handedness::Left, GrabFlags::default()));
        assert_eq!(rig.engine.holder_of(rig.cube), Some(Handedness::Right));
    }

    #[test]
    fn destroyed_object_is_released_as_lost() {
        let mut rig = Rig::new();
        rig.grab(Handedness::Right, GrabFlags::PARENT_TO_HAND | GrabFlags::TURN_ON_KINEMATIC);
        rig.scene.destroy(rig.cube);
        rig.events.clear();

        let cube = rig.cube;
        let input = InputState::new();
        let (mut world, engine) = rig.world();
        engine.track_hands(&mut world, &input, 0.016);
        assert_eq!(engine.current_grabbed(Handedness::Right), None);
        assert!(rig.events.contains(&InteractionEvent::Released {
            hand: Handedness::Right,
            object: cube,
            lost: true,
        }));
    }

    #[test]
    fn ease_in_completes_once_then_velocity_follows() {
        let mut rig = Rig::new();
        rig.engine.set_settings(
            rig.cube,
            GrabSettings {
                ease_in: true,
                ..GrabSettings::default()
            },
        );
        let offset = Some(Pose::IDENTITY);
        let cube = rig.cube;
        {
            let (mut world, engine) = rig.world();
            let flags = GrabFlags::VELOCITY_MOVEMENT | GrabFlags::TURN_OFF_GRAVITY;
            assert!(engine.grab(&mut world, Handedness::Right, cube, GrabType::Grip, flags, offset));
        }

        let before = rig.scene.body(cube).unwrap().velocity;
        rig.engine.fixed_update(&mut rig.scene, 0.02);
        assert_eq!(rig.scene.body(cube).unwrap().velocity, before, "no velocity follow while easing");

        for _ in 0..20 {
            let (mut world, engine) = rig.world();
            engine.update_follow(&mut world, 0.016);
        }
        let completions = rig
            .events
            .iter()
            .filter(|e| matches!(e, InteractionEvent::EaseInCompleted { .. }))
            .count();
        assert_eq!(completions, 1);

        let hand_pos = rig.scene.world_pose(rig.engine.hand(Handedness::Right).unwrap().object()).unwrap().position;
        let cube_pos = rig.scene.world_pose(cube).unwrap().position;
        assert!(hand_pos.distance(cube_pos) < 1e-3, "eased onto the attach point");

        let hand = rig.engine.hand(Handedness::Right).unwrap().object();
        rig.scene
            .set_world_pose(hand, Pose::from_position(hand_pos + Vec3::new(0.0, 0.1, 0.0)));
        rig.engine.fixed_update(&mut rig.scene, 0.02);
        let velocity = rig.scene.body(cube).unwrap().velocity;
        assert!(velocity.y > 0.0);
        assert!(velocity.length() <= 10.0 + 1e-4, "clamped by the max change");
    }

    #[test]
    fn hover_search_finds_nearby_interactable() {
        let mut rig = Rig::new();
        let cube_pos = rig.scene.world_pose(rig.cube).unwrap().position;
        let hand = rig.engine.hand(Handedness::Right).unwrap().object();
        rig.scene.set_world_pose(hand, Pose::from_position(cube_pos + Vec3::new(0.08, 0.0, 0.0)));

        let cube = rig.cube;
        let (mut world, engine) = rig.world();
        engine.update_hover(&mut world, 0.016);
        assert_eq!(engine.hand(Handedness::Right).unwrap().hovering(), Some(cube));
        assert!(engine.is_near(Handedness::Right));
        assert!(!engine.is_near(Handedness::Left));
        assert_eq!(rig.registry.state(cube), Some(crate::registry::InteractableState::Hover));
    }

    #[test]
    fn hover_lock_survives_search() {
        let mut rig = Rig::new();
        let cube = rig.cube;
        let (mut world, engine) = rig.world();
        engine.hover_lock(&mut world, Handedness::Left, cube);
        for _ in 0..10 {
            engine.update_hover(&mut world, 0.05);
        }
        assert_eq!(engine.hand(Handedness::Left).unwrap().hovering(), Some(cube));
        engine.hover_unlock(Handedness::Left, cube);
        engine.update_hover(&mut world, 0.2);
        assert_eq!(engine.hand(Handedness::Left).unwrap().hovering(), None);
    }

    #[test]
    fn pinch_grabs_hovered_and_release_throws() {
        let mut rig = Rig::new();
        rig.engine.set_settings(
            rig.cube,
            GrabSettings {
                flags: GrabFlags::PARENT_TO_HAND | GrabFlags::TURN_ON_KINEMATIC,
                release: ReleaseSettings::throwable(),
                ..GrabSettings::default()
            },
        );
        let cube = rig.cube;
        let cube_pos = rig.scene.world_pose(cube).unwrap().position;
        let mut input = InputState::new();
        let mut frame = HandFrame {
            grip_pose: Pose::new(cube_pos, Quat::IDENTITY),
            ..HandFrame::default()
        };
        input.set_hand(Handedness::Right, Some(frame));
        {
            let (mut world, engine) = rig.world();
            engine.track_hands(&mut world, &input, 0.01);
            engine.update_hover(&mut world, 0.01);
        }

        input.begin_frame();
        frame.pinch = true;
        input.set_hand(Handedness::Right, Some(frame));
        {
            let (mut world, engine) = rig.world();
            engine.track_hands(&mut world, &input, 0.01);
            engine.apply_gestures(&mut world, &input);
            assert_eq!(engine.current_grabbed(Handedness::Right), Some(cube));
        }

        for step in 1..=4 {
            input.begin_frame();
            frame.grip_pose.position = cube_pos + Vec3::new(0.02 * step as f32, 0.0, 0.0);
            frame.pinch = step < 4;
            input.set_hand(Handedness::Right, Some(frame));
            let (mut world, engine) = rig.world();
            engine.track_hands(&mut world, &input, 0.01);
            engine.apply_gestures(&mut world, &input);
            engine.update_follow(&mut world, 0.01);
        }
        assert_eq!(rig.engine.current_grabbed(Handedness::Right), None);
        let body = rig.scene.body(cube).unwrap();
        assert!(!body.is_kinematic);
        assert!((body.velocity.x - 2.2).abs() < 1e-2, "hand speed 2 m/s scaled by 1.1");
    }
}
