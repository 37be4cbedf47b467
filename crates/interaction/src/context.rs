//! The explicitly owned interaction session.

use crate::config::InteractionConfig;
use crate::events::InteractionEvent;
use crate::grab::{GrabEngine, GrabFlags, GrabSettings, GrabType, GrabWorld, HandDesc};
use crate::modality::{
    Arbitrator, ConsumerId, ConsumerTarget, EnablementConsumer, EnablementRule, HandSignals, HeadHandMode, Modality,
    ModalityListener, ModalityMask, ModalityProducers, ProximityMask,
};
use crate::pointer::{CasterInput, EventRouter, PointerCaster, PointerEvent, PointerEventHandler, PointerEventKind};
use crate::raycast::{GraphicSurface, RayHitTester, RaycastHit};
use crate::registry::{InteractableDesc, InteractableRegistry, InteractorFilter};
use glam::Quat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};
use xrinteract_audio::CuePlayer;
use xrinteract_camera::Camera;
use xrinteract_core::{CueId, Handedness, InteractorId, ObjectId, PlatformRequest, Pose, Ray, RequestQueue};
use xrinteract_input::InputState;
use xrinteract_physics::Scene;

/// Where a caster's ray comes from each frame.
///
/// A ray supplied through [`InputState::set_ray`] for the caster's id always
/// takes precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaySource {
    /// Pointer pose of a tracked hand; pinch presses.
    Hand(Handedness),
    /// Phone orientation from the head position; the phone button presses.
    ThreeDof,
    /// Mouse cursor through the camera.
    Mouse,
    /// Head gaze, pressed by touch-surface taps.
    Touch,
    /// Only rays set explicitly on the input state.
    Explicit,
}

impl RaySource {
    /// Rule a caster of this source gets when none is given.
    ///
    /// Hand rays run only while the hand is tracked and nothing is within
    /// grab reach; the others follow their modality.
    pub fn default_rule(self) -> EnablementRule {
        match self {
            RaySource::Hand(hand) => EnablementRule::for_modality(Modality::Gesture)
                .with_hand(hand)
                .with_proximity(ProximityMask::FAR),
            RaySource::ThreeDof => EnablementRule::for_modality(Modality::ThreeDofPointer),
            RaySource::Mouse => EnablementRule::for_modality(Modality::Mouse),
            RaySource::Touch => EnablementRule::for_modality(Modality::TouchSurface),
            RaySource::Explicit => EnablementRule::default(),
        }
    }

    fn hand(self) -> Option<Handedness> {
        match self {
            RaySource::Hand(hand) => Some(hand),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct CasterSlot {
    caster: PointerCaster,
    source: RaySource,
    consumer: ConsumerId,
    hovered: Option<ObjectId>,
    selected: Option<ObjectId>,
}

/// Owns the scene, the five interaction components and their wiring.
///
/// Call [`InteractionContext::update`] once per rendered frame and
/// [`InteractionContext::fixed_update`] once per physics step.
pub struct InteractionContext {
    config: InteractionConfig,
    scene: Scene,
    camera: Camera,
    registry: InteractableRegistry,
    hit_tester: RayHitTester,
    casters: BTreeMap<InteractorId, CasterSlot>,
    router: EventRouter,
    grab: GrabEngine,
    hand_consumers: [Option<ConsumerId>; 2],
    arbitrator: Arbitrator,
    producers: ModalityProducers,
    cues: CuePlayer,
    signals: [HandSignals; 2],
    three_dof_recenter: Quat,
    events: Vec<InteractionEvent>,
    pointer_log: Vec<PointerEvent>,
    requests: RequestQueue,
    hits: Vec<RaycastHit>,
    scratch: Vec<PointerEvent>,
    now: f64,
}

impl std::fmt::Debug for InteractionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionContext")
            .field("objects", &self.scene.len())
            .field("interactables", &self.registry.len())
            .field("casters", &self.casters.len())
            .field("arbitrator", &self.arbitrator)
            .field("now", &self.now)
            .finish()
    }
}

impl InteractionContext {
    /// Session over `scene`, initialized to the configured modality.
    pub fn new(config: InteractionConfig, scene: Scene, camera: Camera) -> Self {
        let mut arbitrator = Arbitrator::new(config.cues.clone());
        arbitrator.initialize(config.modality.initial);
        let mut ctx = Self {
            scene,
            camera,
            registry: InteractableRegistry::new(),
            hit_tester: RayHitTester::new(config.hit_test),
            casters: BTreeMap::new(),
            router: EventRouter::new(),
            grab: GrabEngine::new(config.grab),
            hand_consumers: [None; 2],
            arbitrator,
            producers: ModalityProducers::new(&config.modality, config.mouse_interactor),
            cues: CuePlayer::new(config.cues.clone()),
            signals: [HandSignals::default(); 2],
            three_dof_recenter: Quat::IDENTITY,
            events: Vec::new(),
            pointer_log: Vec::new(),
            requests: RequestQueue::new(),
            hits: Vec::new(),
            scratch: Vec::new(),
            now: 0.0,
            config,
        };
        ctx.events.extend(ctx.arbitrator.drain_events());
        ctx
    }

    /// Settings the session was built with.
    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Scene objects.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable scene. Destroying objects here is detected on the next update;
    /// [`InteractionContext::destroy_object`] cleans up immediately.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Event camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable event camera.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Registered interactables.
    pub fn registry(&self) -> &InteractableRegistry {
        &self.registry
    }

    /// Modality status and consumer decisions.
    pub fn arbitrator(&self) -> &Arbitrator {
        &self.arbitrator
    }

    /// Hands and their grabbed objects.
    pub fn grab_engine(&self) -> &GrabEngine {
        &self.grab
    }

    /// Pointer caster for `id`.
    pub fn caster(&self, id: InteractorId) -> Option<&PointerCaster> {
        self.casters.get(&id).map(|slot| &slot.caster)
    }

    /// Session time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    // --- authoring ---

    /// Register `object` as an interactable, with optional grab behaviour.
    ///
    /// Returns `false` if the object does not exist.
    pub fn register_interactable(
        &mut self,
        object: ObjectId,
        desc: InteractableDesc,
        grab: Option<GrabSettings>,
    ) -> bool {
        if !self.scene.contains(object) {
            return false;
        }
        self.registry.register(object, desc);
        if let Some(settings) = grab {
            self.grab.set_settings(object, settings);
        }
        true
    }

    /// Attach a capability filter to an interactable.
    pub fn add_interactable_filter(&mut self, object: ObjectId, filter: InteractorFilter) -> bool {
        self.registry.add_filter(object, filter)
    }

    /// Unregister `object`; its hover and select occupants are dropped.
    pub fn unregister_interactable(&mut self, object: ObjectId) -> bool {
        let Some(lost) = self.registry.unregister(object) else {
            return false;
        };
        self.forget_interactable(lost.object);
        self.collect_state_changes();
        true
    }

    /// Add a UI surface to the hit tester.
    pub fn add_surface(&mut self, surface: GraphicSurface) {
        self.hit_tester.add_surface(surface);
    }

    /// Attach a pointer-event handler to `object`.
    pub fn add_handler(&mut self, object: ObjectId, handler: Box<dyn PointerEventHandler>) {
        self.router.add_handler(object, handler);
    }

    /// Add an app-level pointer listener that sees broadcast events.
    pub fn add_pointer_listener(&mut self, listener: Box<dyn PointerEventHandler>) {
        self.router.add_listener(listener);
    }

    /// Add a modality-change observer.
    pub fn add_modality_listener(&mut self, listener: Box<dyn ModalityListener>) {
        self.arbitrator.add_listener(listener);
    }

    /// Register an application-owned consumer driven by `rule`.
    pub fn add_consumer(&mut self, consumer: Box<dyn EnablementConsumer>, rule: EnablementRule) -> ConsumerId {
        let id = self.arbitrator.register_consumer(ConsumerTarget::External(consumer), rule);
        self.apply_enablement();
        id
    }

    /// Add (or replace) a pointer caster.
    ///
    /// Without a rule the source's [`RaySource::default_rule`] applies.
    pub fn add_interactor(&mut self, id: InteractorId, source: RaySource, rule: Option<EnablementRule>) -> ConsumerId {
        self.remove_interactor(id);
        let caster = PointerCaster::new(id, source.hand(), self.config.pointer);
        let consumer = self
            .arbitrator
            .register_consumer(ConsumerTarget::Caster(id), rule.unwrap_or_else(|| source.default_rule()));
        self.casters.insert(
            id,
            CasterSlot {
                caster,
                source,
                consumer,
                hovered: None,
                selected: None,
            },
        );
        debug!(interactor = %id, ?source, "interactor added");
        self.apply_enablement();
        consumer
    }

    /// Remove a caster, flushing its press and hover first.
    pub fn remove_interactor(&mut self, id: InteractorId) -> bool {
        let Some(slot) = self.casters.get_mut(&id) else {
            return false;
        };
        let mut out = std::mem::take(&mut self.scratch);
        slot.caster.set_enabled(false, &mut out);
        let consumer = slot.consumer;
        self.deliver(id, &mut out);
        self.scratch = out;
        self.arbitrator.unregister_consumer(consumer);
        self.registry.release_interactor(id);
        self.casters.remove(&id);
        self.collect_state_changes();
        true
    }

    /// Install a hand for grabbing and hover search.
    ///
    /// Without a rule the hand runs while the gesture modality is active and
    /// the hand is tracked.
    pub fn add_hand(&mut self, hand: Handedness, desc: HandDesc, rule: Option<EnablementRule>) -> ConsumerId {
        if let Some(old) = self.hand_consumers[hand.index()].take() {
            self.arbitrator.unregister_consumer(old);
        }
        self.grab.add_hand(hand, desc);
        let rule = rule.unwrap_or_else(|| EnablementRule::for_modality(Modality::Gesture).with_hand(hand));
        let consumer = self.arbitrator.register_consumer(ConsumerTarget::HandGrab(hand), rule);
        self.hand_consumers[hand.index()] = Some(consumer);
        self.apply_enablement();
        consumer
    }

    /// Per-object grab behaviour.
    pub fn set_grab_settings(&mut self, object: ObjectId, settings: GrabSettings) {
        self.grab.set_settings(object, settings);
    }

    // --- modality ---

    /// Ask for `modality`. Refused silently when locked or already active.
    pub fn request_activate(&mut self, modality: Modality) -> bool {
        let switched = self.arbitrator.request_activate(modality);
        self.apply_enablement();
        switched
    }

    /// Refuse activation of the modalities in `mask`.
    pub fn lock(&mut self, mask: ModalityMask) {
        self.arbitrator.lock(mask);
        self.apply_enablement();
    }

    /// Activate `modality` and lock every other one.
    pub fn lock_to(&mut self, modality: Modality) {
        self.arbitrator.lock_to(modality);
        self.apply_enablement();
    }

    /// Clear every lock.
    pub fn unlock(&mut self) {
        self.arbitrator.unlock();
        self.apply_enablement();
    }

    /// Switch between normal and head-locked hand routing.
    pub fn set_head_hand_mode(&mut self, mode: HeadHandMode) {
        self.arbitrator.set_head_hand_mode(mode);
        self.apply_enablement();
    }

    /// Re-centre the phone ray on the current head direction.
    pub fn recenter_ray(&mut self, input: &InputState) {
        if let Some(frame) = input.three_dof {
            self.three_dof_recenter = input.head_pose.rotation * frame.orientation.inverse();
        }
        self.requests.push(PlatformRequest::RecenterRay);
        debug!("ray recentered");
    }

    // --- grab ---

    /// Grab `object` with `hand`. See [`GrabEngine::grab`].
    pub fn grab(
        &mut self,
        hand: Handedness,
        object: ObjectId,
        grab_type: GrabType,
        flags: GrabFlags,
        offset: Option<Pose>,
    ) -> bool {
        let mark = self.events.len();
        let (engine, mut world) = self.grab_parts();
        let grabbed = engine.grab(&mut world, hand, object, grab_type, flags, offset);
        self.play_grab_cues(mark);
        self.collect_state_changes();
        grabbed
    }

    /// Release `object` from `hand`. See [`GrabEngine::release`].
    pub fn release(&mut self, hand: Handedness, object: ObjectId, restore_original_parent: bool) -> bool {
        let mark = self.events.len();
        let (engine, mut world) = self.grab_parts();
        let released = engine.release(&mut world, hand, object, restore_original_parent);
        self.play_grab_cues(mark);
        self.collect_state_changes();
        released
    }

    /// Pin a hand's hover on `object`.
    pub fn hover_lock(&mut self, hand: Handedness, object: ObjectId) {
        let (engine, mut world) = self.grab_parts();
        engine.hover_lock(&mut world, hand, object);
        self.collect_state_changes();
    }

    /// Release a hover lock.
    pub fn hover_unlock(&mut self, hand: Handedness, object: ObjectId) {
        self.grab.hover_unlock(hand, object);
    }

    /// Destroy `object` (and its children) and clean up every reference now.
    pub fn destroy_object(&mut self, object: ObjectId) -> bool {
        if !self.scene.destroy(object) {
            return false;
        }
        self.self_heal();
        true
    }

    // --- ticks ---

    /// Render tick.
    ///
    /// Order: producers and arbitration, self-heal, hand tracking and hover
    /// search, then per enabled caster hit test and dispatch, then gesture
    /// grabs and follow.
    pub fn update(&mut self, dt: f32, input: &InputState) {
        let dt = dt.max(0.0);
        self.now += f64::from(dt);
        self.camera.pose = input.head_pose;
        self.arbitrator.advance_time(dt);

        self.producers.update(input, dt, self.signals, &mut self.arbitrator);
        self.apply_enablement();
        self.self_heal();

        let mark = self.events.len();
        {
            let (engine, mut world) = self.grab_parts();
            engine.track_hands(&mut world, input, dt);
            engine.update_hover(&mut world, dt);
        }

        let ids: Vec<InteractorId> = self.casters.keys().copied().collect();
        for id in ids {
            self.process_caster(id, input, dt);
        }

        {
            let (engine, mut world) = self.grab_parts();
            engine.apply_gestures(&mut world, input);
            engine.update_follow(&mut world, dt);
        }
        self.play_grab_cues(mark);

        for hand in Handedness::BOTH {
            self.signals[hand.index()] = HandSignals {
                near: self.grab.is_near(hand),
                dragging: self
                    .casters
                    .values()
                    .any(|slot| slot.caster.hand() == Some(hand) && slot.caster.is_dragging()),
            };
        }
        self.collect_state_changes();
        trace!(now = self.now, "frame");
    }

    /// Physics tick: velocity follow, then scene integration.
    pub fn fixed_update(&mut self, dt: f32) {
        self.grab.fixed_update(&mut self.scene, dt);
        self.scene.step(dt);
    }

    // --- output ---

    /// Take lifecycle notifications.
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Take every pointer event emitted since the last call.
    pub fn drain_pointer_events(&mut self) -> Vec<PointerEvent> {
        std::mem::take(&mut self.pointer_log)
    }

    /// Take outbound platform requests.
    pub fn drain_requests(&mut self) -> Vec<PlatformRequest> {
        self.requests.append(self.arbitrator.requests_mut());
        self.requests.drain()
    }

    // --- internals ---

    fn grab_parts(&mut self) -> (&mut GrabEngine, GrabWorld<'_>) {
        (
            &mut self.grab,
            GrabWorld {
                scene: &mut self.scene,
                registry: &mut self.registry,
                events: &mut self.events,
            },
        )
    }

    fn apply_enablement(&mut self) {
        self.events.extend(self.arbitrator.drain_events());
        for change in self.arbitrator.take_changes() {
            if let Some(id) = change.caster {
                let mut out = std::mem::take(&mut self.scratch);
                if let Some(slot) = self.casters.get_mut(&id) {
                    slot.caster.set_enabled(change.enabled, &mut out);
                }
                self.deliver(id, &mut out);
                self.scratch = out;
            }
            if let Some(hand) = change.hand {
                let (engine, mut world) = self.grab_parts();
                engine.set_enabled(&mut world, hand, change.enabled);
            }
        }
        self.requests.append(self.arbitrator.requests_mut());
    }

    /// Drop references to vanished objects everywhere.
    fn self_heal(&mut self) {
        for lost in self.registry.prune(&self.scene) {
            self.forget_interactable(lost.object);
        }
        self.router.prune(&self.scene);
        self.hit_tester.prune(&self.scene);

        let ids: Vec<InteractorId> = self.casters.keys().copied().collect();
        for id in ids {
            let mut out = std::mem::take(&mut self.scratch);
            if let Some(slot) = self.casters.get_mut(&id) {
                slot.caster.validate(&self.scene, &mut out);
            }
            self.deliver(id, &mut out);
            self.scratch = out;
        }

        let mark = self.events.len();
        let (engine, mut world) = self.grab_parts();
        engine.prune(&mut world);
        self.play_grab_cues(mark);
        self.collect_state_changes();
    }

    fn forget_interactable(&mut self, object: ObjectId) {
        for slot in self.casters.values_mut() {
            if slot.hovered == Some(object) {
                slot.hovered = None;
            }
            if slot.selected == Some(object) {
                slot.selected = None;
            }
        }
    }

    fn process_caster(&mut self, id: InteractorId, input: &InputState, dt: f32) {
        let Some(slot) = self.casters.get(&id) else {
            return;
        };
        if !slot.caster.is_enabled() {
            return;
        }
        let source = slot.source;
        let ray = self.caster_ray(id, source, input);
        let hit = match ray {
            Some(ray) => {
                self.hit_tester
                    .cast(&ray, &self.camera, &self.scene, &self.registry, &mut self.hits);
                self.hits.first().copied()
            }
            None => None,
        };
        let frame = CasterInput {
            ray,
            hit,
            pressed: Self::caster_pressed(id, source, input),
        };

        let mut out = std::mem::take(&mut self.scratch);
        if let Some(slot) = self.casters.get_mut(&id) {
            slot.caster.process(&frame, dt, &mut out);
        }
        self.deliver(id, &mut out);
        self.scratch = out;
    }

    fn caster_ray(&self, id: InteractorId, source: RaySource, input: &InputState) -> Option<Ray> {
        if let Some(ray) = input.ray(id) {
            return Some(ray);
        }
        match source {
            RaySource::Hand(hand) => input
                .hand(hand)
                .filter(|f| f.tracking)
                .and_then(|f| Ray::from_pose(&f.pointer_pose)),
            RaySource::ThreeDof => input.three_dof.and_then(|frame| {
                Ray::from_pose(&Pose::new(
                    input.head_pose.position,
                    self.three_dof_recenter * frame.orientation,
                ))
            }),
            RaySource::Mouse => {
                if input.mouse_connected {
                    self.camera.screen_to_ray(input.mouse_position, input.screen_size)
                } else {
                    None
                }
            }
            RaySource::Touch => Ray::from_pose(&input.head_pose),
            RaySource::Explicit => None,
        }
    }

    fn caster_pressed(id: InteractorId, source: RaySource, input: &InputState) -> bool {
        input.button_pressed(id)
            || match source {
                RaySource::Hand(hand) => input.hand(hand).is_some_and(|f| f.tracking && f.pinch),
                RaySource::ThreeDof => input.three_dof.is_some_and(|f| f.button),
                _ => false,
            }
    }

    /// Apply pointer events to registry occupancy, route them and log them.
    fn deliver(&mut self, id: InteractorId, events: &mut Vec<PointerEvent>) {
        let batch: Vec<PointerEvent> = events.drain(..).collect();
        let owners: Vec<Option<ObjectId>> = batch
            .iter()
            .map(|event| {
                event
                    .target
                    .and_then(|target| self.registry.owning_interactable(&self.scene, target))
            })
            .collect();
        let kinds: Vec<PointerEventKind> = batch.iter().map(|event| event.kind).collect();

        for (i, event) in batch.into_iter().enumerate() {
            let (hand, broadcast) = match self.casters.get(&id) {
                Some(slot) => (slot.caster.hand(), slot.caster.config().broadcast),
                None => (None, self.config.pointer.broadcast),
            };
            let owner = owners[i];

            if let Some(slot) = self.casters.get_mut(&id) {
                match event.kind {
                    PointerEventKind::Enter => {
                        if slot.hovered != owner {
                            if let Some(old) = slot.hovered.take() {
                                self.registry.hover_exit(old, id);
                            }
                            if let Some(owner) = owner {
                                if self.registry.hover_enter(owner, id, hand) {
                                    slot.hovered = Some(owner);
                                }
                            }
                        }
                    }
                    PointerEventKind::Exit => {
                        // Crossing between colliders of one interactable keeps it hovered.
                        let reentered = kinds.get(i + 1) == Some(&PointerEventKind::Enter)
                            && slot.hovered.is_some()
                            && owners.get(i + 1).copied().flatten() == slot.hovered;
                        if !reentered {
                            if let Some(old) = slot.hovered.take() {
                                self.registry.hover_exit(old, id);
                            }
                        }
                    }
                    PointerEventKind::Down => {
                        if let Some(owner) = owner {
                            if self.registry.select_enter(owner, id, hand) {
                                slot.selected = Some(owner);
                            }
                        }
                    }
                    PointerEventKind::Up | PointerEventKind::DragEnd => {
                        if let Some(old) = slot.selected.take() {
                            self.registry.select_exit(old, id);
                        }
                    }
                    _ => {}
                }
            }

            if event.kind == PointerEventKind::Click {
                self.cues
                    .play(CueId::Click, self.now, hand, event.target, &mut self.requests);
            }
            self.router.dispatch(&self.scene, &event, broadcast);
            self.pointer_log.push(event);
        }
    }

    fn play_grab_cues(&mut self, from: usize) {
        for event in &self.events[from.min(self.events.len())..] {
            let (cue, hand, object) = match *event {
                InteractionEvent::Grabbed { hand, object } => (CueId::Grab, hand, object),
                InteractionEvent::Released {
                    hand,
                    object,
                    lost: false,
                } => (CueId::Release, hand, object),
                _ => continue,
            };
            self.cues
                .play(cue, self.now, Some(hand), Some(object), &mut self.requests);
        }
    }

    fn collect_state_changes(&mut self) {
        for change in self.registry.drain_changes() {
            self.events.push(InteractionEvent::InteractableStateChanged {
                object: change.object,
                from: change.from,
                to: change.to,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InteractableState;
    use glam::{Vec2, Vec3};
    use xrinteract_physics::{Collider, ObjectDesc, Rigidbody};

    const POINTER: InteractorId = InteractorId(20);

    fn context() -> (InteractionContext, ObjectId) {
        let mut scene = Scene::new();
        let cube = scene.spawn(
            ObjectDesc::new("cube", Pose::from_position(Vec3::new(0.0, 0.0, 2.0)))
                .with_collider(Collider::cuboid(Vec3::splat(0.2)))
                .with_body(Rigidbody::default()),
        );
        let mut ctx = InteractionContext::new(InteractionConfig::default(), scene, Camera::default());
        assert!(ctx.register_interactable(cube, InteractableDesc::default(), None));
        (ctx, cube)
    }

    fn kinds(events: &[PointerEvent]) -> Vec<PointerEventKind> {
        events
            .iter()
            .map(|e| e.kind)
            .filter(|k| *k != PointerEventKind::Hover)
            .collect()
    }

    #[test]
    fn crossing_colliders_of_one_interactable_keeps_hover() {
        let mut scene = Scene::new();
        let widget = scene.spawn(ObjectDesc::new("widget", Pose::from_position(Vec3::new(0.0, 0.0, 2.0))));
        for (name, x) in [("knob", -0.1), ("slider", 0.1)] {
            scene.spawn(
                ObjectDesc::new(name, Pose::from_position(Vec3::new(x, 0.0, 0.0)))
                    .with_parent(widget)
                    .with_collider(Collider::cuboid(Vec3::splat(0.09))),
            );
        }
        let mut ctx = InteractionContext::new(InteractionConfig::default(), scene, Camera::default());
        assert!(ctx.register_interactable(widget, InteractableDesc::default(), None));
        ctx.add_interactor(POINTER, RaySource::Explicit, None);

        let mut input = InputState::new();
        input.set_ray(POINTER, Ray::new(Vec3::new(-0.1, 0.0, 0.0), Vec3::Z).unwrap());
        ctx.update(0.016, &input);
        assert_eq!(ctx.registry().state(widget), Some(InteractableState::Hover));
        ctx.drain_events();

        input.begin_frame();
        input.set_ray(POINTER, Ray::new(Vec3::new(0.1, 0.0, 0.0), Vec3::Z).unwrap());
        ctx.update(0.016, &input);
        assert_eq!(ctx.registry().state(widget), Some(InteractableState::Hover));
        assert!(!ctx
            .drain_events()
            .iter()
            .any(|e| matches!(e, InteractionEvent::InteractableStateChanged { .. })));

        input.begin_frame();
        input.set_ray(POINTER, Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::Z).unwrap());
        ctx.update(0.016, &input);
        assert_eq!(ctx.registry().state(widget), Some(InteractableState::Normal));
    }

    #[test]
    fn explicit_ray_click_drives_registry() {
        let (mut ctx, cube) = context();
        ctx.add_interactor(POINTER, RaySource::Explicit, None);
        let mut input = InputState::new();
        input.set_ray(POINTER, Ray::new(Vec3::ZERO, Vec3::Z).unwrap());

        ctx.update(0.016, &input);
        assert_eq!(ctx.registry().state(cube), Some(InteractableState::Hover));

        input.begin_frame();
        input.press(POINTER);
        ctx.update(0.016, &input);
        assert_eq!(ctx.registry().state(cube), Some(InteractableState::Select));

        input.begin_frame();
        input.release(POINTER);
        ctx.update(0.016, &input);
        assert_eq!(ctx.registry().state(cube), Some(InteractableState::Hover));

        use PointerEventKind::*;
        assert_eq!(kinds(&ctx.drain_pointer_events()), vec![Enter, Down, Up, Click]);
        assert!(ctx
            .drain_requests()
            .iter()
            .any(|r| matches!(r, PlatformRequest::PlayCue { cue: CueId::Click, .. })));
    }

    #[test]
    fn mouse_motion_enables_mouse_caster() {
        let (mut ctx, _) = context();
        let mouse = ctx.config().mouse_interactor;
        ctx.add_interactor(mouse, RaySource::Mouse, None);
        assert!(!ctx.caster(mouse).unwrap().is_enabled());

        let mut input = InputState::new();
        input.mouse_connected = true;
        input.add_mouse_motion(Vec2::new(10.0, 0.0));
        ctx.update(0.016, &input);
        assert_eq!(ctx.arbitrator().active(), Modality::Mouse);
        assert!(ctx.caster(mouse).unwrap().is_enabled());
    }

    #[test]
    fn lock_to_gesture_ignores_touch() {
        let (mut ctx, _) = context();
        ctx.lock_to(Modality::Gesture);
        let mut input = InputState::new();
        input.touching = true;
        ctx.update(0.016, &input);
        assert_eq!(ctx.arbitrator().active(), Modality::Gesture);
    }

    #[test]
    fn destroying_held_object_releases_immediately() {
        let (mut ctx, cube) = context();
        let hand_object = ctx.scene_mut().spawn(ObjectDesc::new("hand", Pose::IDENTITY));
        ctx.add_hand(
            Handedness::Right,
            HandDesc {
                interactor: InteractorId(30),
                object: hand_object,
                grab_point: Pose::IDENTITY,
                snap_point: Pose::IDENTITY,
            },
            None,
        );
        let flags = GrabFlags::PARENT_TO_HAND | GrabFlags::TURN_ON_KINEMATIC;
        assert!(ctx.grab(Handedness::Right, cube, GrabType::Grip, flags, None));
        assert_eq!(ctx.registry().state(cube), Some(InteractableState::Select));

        assert!(ctx.destroy_object(cube));
        assert_eq!(ctx.grab_engine().current_grabbed(Handedness::Right), None);
        assert!(ctx.drain_events().contains(&InteractionEvent::Released {
            hand: Handedness::Right,
            object: cube,
            lost: true,
        }));
        assert!(ctx.registry().is_empty());
    }

    #[test]
    fn removing_pressed_interactor_flushes_select() {
        let (mut ctx, cube) = context();
        ctx.add_interactor(POINTER, RaySource::Explicit, None);
        let mut input = InputState::new();
        input.set_ray(POINTER, Ray::new(Vec3::ZERO, Vec3::Z).unwrap());
        ctx.update(0.016, &input);
        input.begin_frame();
        input.press(POINTER);
        ctx.update(0.016, &input);

        assert!(ctx.remove_interactor(POINTER));
        assert_eq!(ctx.registry().state(cube), Some(InteractableState::Normal));
        let tail = kinds(&ctx.drain_pointer_events());
        use PointerEventKind::*;
        assert_eq!(&tail[tail.len() - 3..], &[Up, Click, Exit]);
    }
}
