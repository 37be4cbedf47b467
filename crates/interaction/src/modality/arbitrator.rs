//! The single source of truth for the active modality.

use super::{EnablementRule, HandStatus, HeadHandMode, Modality, ModalityMask, ModuleActivationStatus, SleepFlags};
use crate::events::InteractionEvent;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::{debug, trace, warn};
use xrinteract_audio::{CuePlayer, CueSettings};
use xrinteract_core::{CueId, Handedness, InteractorId, PlatformRequest, RequestQueue, TrackerKind};

/// Upper bound on listener-triggered activations drained in one settle.
const MAX_PASSES: usize = 8;

/// Handle returned by [`Arbitrator::register_consumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConsumerId(pub u32);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer#{}", self.0)
    }
}

/// Component that is switched on and off by its rule.
pub trait EnablementConsumer {
    /// Called whenever the evaluated rule result changes.
    fn set_enabled(&mut self, enabled: bool);
}

/// What an enablement decision is applied to.
pub enum ConsumerTarget {
    /// A pointer caster owned by the interaction context.
    Caster(InteractorId),
    /// Grab and hover search of one hand.
    HandGrab(Handedness),
    /// Application-owned consumer, called back directly.
    External(Box<dyn EnablementConsumer>),
}

impl fmt::Debug for ConsumerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumerTarget::Caster(id) => f.debug_tuple("Caster").field(id).finish(),
            ConsumerTarget::HandGrab(hand) => f.debug_tuple("HandGrab").field(hand).finish(),
            ConsumerTarget::External(_) => f.write_str("External"),
        }
    }
}

/// Decision for a consumer owned by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnablementChange {
    /// Consumer handle.
    pub consumer: ConsumerId,
    /// Caster, when the consumer is a caster.
    pub caster: Option<InteractorId>,
    /// Hand, when the consumer is a hand.
    pub hand: Option<Handedness>,
    /// New state.
    pub enabled: bool,
}

/// Activation requests raised while a modality change is being delivered.
#[derive(Debug, Default)]
pub struct ModalityRequests {
    queue: VecDeque<Modality>,
}

impl ModalityRequests {
    /// Ask for `modality` once the current delivery finishes.
    pub fn request_activate(&mut self, modality: Modality) {
        self.queue.push_back(modality);
    }

    fn pop(&mut self) -> Option<Modality> {
        self.queue.pop_front()
    }

    fn clear(&mut self) {
        self.queue.clear();
    }
}

/// Observer of modality changes. May request further switches.
pub trait ModalityListener {
    /// The active modality changed from `from` to `to`.
    fn modality_changed(&mut self, from: Modality, to: Modality, requests: &mut ModalityRequests);
}

struct Consumer {
    target: ConsumerTarget,
    rule: EnablementRule,
    enabled: Option<bool>,
}

/// Picks the active modality and drives every consumer's enabled state.
///
/// Every status mutation re-evaluates all rules and pushes changes out;
/// consumers never poll. Refused requests are silent.
pub struct Arbitrator {
    status: ModuleActivationStatus,
    initialized: bool,
    locked: ModalityMask,
    consumers: BTreeMap<ConsumerId, Consumer>,
    next_consumer: u32,
    listeners: Vec<Box<dyn ModalityListener>>,
    pending: ModalityRequests,
    undelivered: Vec<(Modality, Modality)>,
    changes: Vec<EnablementChange>,
    events: Vec<InteractionEvent>,
    requests: RequestQueue,
    cues: CuePlayer,
    now: f64,
}

impl fmt::Debug for Arbitrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arbitrator")
            .field("status", &self.status)
            .field("initialized", &self.initialized)
            .field("locked", &self.locked)
            .field("consumers", &self.consumers.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Arbitrator {
    /// Uninitialized arbitrator; every activation request is refused until [`Arbitrator::initialize`].
    pub fn new(cues: CueSettings) -> Self {
        Self {
            status: ModuleActivationStatus::default(),
            initialized: false,
            locked: ModalityMask::empty(),
            consumers: BTreeMap::new(),
            next_consumer: 0,
            listeners: Vec::new(),
            pending: ModalityRequests::default(),
            undelivered: Vec::new(),
            changes: Vec::new(),
            events: Vec::new(),
            requests: RequestQueue::new(),
            cues: CuePlayer::new(cues),
            now: 0.0,
        }
    }

    /// Start arbitration with `initial` active. Locks do not apply; no cue plays.
    pub fn initialize(&mut self, initial: Modality) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        if initial != Modality::None {
            self.switch_to(initial, false);
        }
        self.settle();
    }

    /// Whether [`Arbitrator::initialize`] ran.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Current status record.
    pub fn status(&self) -> &ModuleActivationStatus {
        &self.status
    }

    /// Active modality.
    pub fn active(&self) -> Modality {
        self.status.active
    }

    /// Advance the cue clock.
    pub fn advance_time(&mut self, dt: f32) {
        self.now += f64::from(dt.max(0.0));
    }

    /// Switch to `modality`.
    ///
    /// Returns `false` (and changes nothing) when uninitialized, when
    /// `modality` is `None`, locked or already active.
    pub fn request_activate(&mut self, modality: Modality) -> bool {
        let switched = self.try_switch(modality);
        if switched {
            self.settle();
        }
        switched
    }

    /// Refuse activation of every modality in `mask`. The current status is kept.
    pub fn lock(&mut self, mask: ModalityMask) {
        self.locked |= mask;
        debug!(locked = ?self.locked, "modality lock");
    }

    /// Activate `modality` and lock every other one.
    pub fn lock_to(&mut self, modality: Modality) {
        self.locked.remove(modality.mask());
        self.request_activate(modality);
        self.locked = ModalityMask::all().difference(modality.mask());
        debug!(?modality, "modality locked to");
    }

    /// Lift every lock.
    pub fn unlock(&mut self) {
        self.locked = ModalityMask::empty();
        debug!("modality unlocked");
    }

    /// Whether requests for `modality` are refused.
    pub fn is_locked(&self, modality: Modality) -> bool {
        self.locked.intersects(modality.mask())
    }

    /// Update an idle flag.
    pub fn report_sleep(&mut self, modality: Modality, hand: Option<Handedness>, sleeping: bool) {
        let flag = SleepFlags::for_modality(modality, hand);
        if flag.is_empty() {
            return;
        }
        let before = self.status.sleep;
        self.status.sleep.set(flag, sleeping);
        if before != self.status.sleep {
            trace!(?modality, ?hand, sleeping, "sleep flag");
            self.events.push(InteractionEvent::SleepChanged {
                modality,
                hand,
                sleeping,
            });
            self.settle();
        }
    }

    /// Replace one hand's detail.
    pub fn set_hand_status(&mut self, hand: Handedness, detail: HandStatus) {
        if self.status.hands[hand.index()] != detail {
            self.status.hands[hand.index()] = detail;
            self.settle();
        }
    }

    /// Set the head/hand routing mode.
    pub fn set_head_hand_mode(&mut self, mode: HeadHandMode) {
        if self.status.head_hand_mode != mode {
            self.status.head_hand_mode = mode;
            self.settle();
        }
    }

    /// Set the hand whose ray is active.
    pub fn set_active_hand_ray(&mut self, hand: Option<Handedness>) {
        if self.status.active_hand_ray != hand {
            self.status.active_hand_ray = hand;
            self.settle();
        }
    }

    /// Register a consumer. Its initial state is evaluated immediately.
    pub fn register_consumer(&mut self, target: ConsumerTarget, rule: EnablementRule) -> ConsumerId {
        let id = ConsumerId(self.next_consumer);
        self.next_consumer += 1;
        self.consumers.insert(
            id,
            Consumer {
                target,
                rule,
                enabled: None,
            },
        );
        self.evaluate_consumers();
        id
    }

    /// Replace a consumer's rule.
    pub fn set_rule(&mut self, id: ConsumerId, rule: EnablementRule) -> bool {
        let Some(consumer) = self.consumers.get_mut(&id) else {
            return false;
        };
        consumer.rule = rule;
        self.evaluate_consumers();
        true
    }

    /// Remove a consumer.
    pub fn unregister_consumer(&mut self, id: ConsumerId) -> bool {
        self.consumers.remove(&id).is_some()
    }

    /// Last evaluated state of a consumer.
    pub fn consumer_enabled(&self, id: ConsumerId) -> Option<bool> {
        self.consumers.get(&id).and_then(|c| c.enabled)
    }

    /// Add a modality-change observer.
    pub fn add_listener(&mut self, listener: Box<dyn ModalityListener>) {
        self.listeners.push(listener);
    }

    /// Take decisions for context-owned consumers.
    pub fn take_changes(&mut self) -> Vec<EnablementChange> {
        std::mem::take(&mut self.changes)
    }

    /// Take lifecycle notifications.
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Outbound platform requests (cues, tracker open/close).
    pub fn requests_mut(&mut self) -> &mut RequestQueue {
        &mut self.requests
    }

    fn try_switch(&mut self, modality: Modality) -> bool {
        if !self.initialized {
            trace!(?modality, "activation refused: uninitialized");
            return false;
        }
        if modality == Modality::None || modality == self.status.active {
            return false;
        }
        if self.is_locked(modality) {
            trace!(?modality, "activation refused: locked");
            return false;
        }
        self.switch_to(modality, true);
        true
    }

    fn switch_to(&mut self, to: Modality, cue: bool) {
        let from = self.status.active;
        self.status.active = to;
        debug!(?from, ?to, "modality changed");
        self.events.push(InteractionEvent::ModalityChanged { from, to });
        self.undelivered.push((from, to));

        if cue {
            self.cues
                .play(CueId::ModalitySwitch, self.now, None, None, &mut self.requests);
        }
        if to == Modality::Gesture {
            self.requests.push(PlatformRequest::StartTracking(TrackerKind::Hand));
        }
        if from == Modality::Gesture {
            self.requests.push(PlatformRequest::StopTracking(TrackerKind::Hand));
        }
    }

    /// Deliver changes to listeners, run the enablement pass, then drain any
    /// activations the listeners asked for.
    fn settle(&mut self) {
        let mut passes = 0;
        loop {
            for (from, to) in std::mem::take(&mut self.undelivered) {
                for listener in self.listeners.iter_mut() {
                    listener.modality_changed(from, to, &mut self.pending);
                }
            }
            self.evaluate_consumers();

            let Some(next) = self.pending.pop() else {
                break;
            };
            passes += 1;
            if passes > MAX_PASSES {
                warn!(passes, "modality listeners keep re-requesting; dropping the rest");
                self.pending.clear();
                break;
            }
            self.try_switch(next);
        }
    }

    fn evaluate_consumers(&mut self) {
        for (id, consumer) in self.consumers.iter_mut() {
            let enabled = consumer.rule.evaluate(&self.status);
            if consumer.enabled == Some(enabled) {
                continue;
            }
            consumer.enabled = Some(enabled);
            trace!(consumer = %id, enabled, "consumer enablement");
            self.events.push(InteractionEvent::ConsumerEnabled {
                consumer: *id,
                enabled,
            });
            match &mut consumer.target {
                ConsumerTarget::External(target) => target.set_enabled(enabled),
                ConsumerTarget::Caster(caster) => self.changes.push(EnablementChange {
                    consumer: *id,
                    caster: Some(*caster),
                    hand: None,
                    enabled,
                }),
                ConsumerTarget::HandGrab(hand) => self.changes.push(EnablementChange {
                    consumer: *id,
                    caster: None,
                    hand: Some(*hand),
                    enabled,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn arbitrator() -> Arbitrator {
        let mut arb = Arbitrator::new(CueSettings::default());
        arb.initialize(Modality::Gesture);
        arb.drain_events();
        arb.requests_mut().drain();
        arb
    }

    struct Flag(Rc<Cell<bool>>);

    impl EnablementConsumer for Flag {
        fn set_enabled(&mut self, enabled: bool) {
            self.0.set(enabled);
        }
    }

    #[test]
    fn uninitialized_refuses_requests() {
        let mut arb = Arbitrator::new(CueSettings::default());
        assert!(!arb.request_activate(Modality::Mouse));
        assert_eq!(arb.active(), Modality::None);
    }

    #[test]
    fn activation_switches_and_reports() {
        let mut arb = arbitrator();
        assert!(arb.request_activate(Modality::Mouse));
        assert_eq!(arb.active(), Modality::Mouse);
        assert!(!arb.request_activate(Modality::Mouse), "already active is a no-op");

        let events = arb.drain_events();
        assert_eq!(
            events[0],
            InteractionEvent::ModalityChanged {
                from: Modality::Gesture,
                to: Modality::Mouse
            }
        );
        let requests = arb.requests_mut().drain();
        assert!(requests.contains(&PlatformRequest::StopTracking(TrackerKind::Hand)));
        assert!(requests.iter().any(|r| matches!(
            r,
            PlatformRequest::PlayCue {
                cue: CueId::ModalitySwitch,
                ..
            }
        )));
    }

    #[test]
    fn lock_to_keeps_gesture() {
        let mut arb = arbitrator();
        arb.lock_to(Modality::Gesture);
        assert!(!arb.request_activate(Modality::TouchSurface));
        assert_eq!(arb.active(), Modality::Gesture);
        arb.unlock();
        assert!(arb.request_activate(Modality::TouchSurface));
    }

    #[test]
    fn lock_mask_blocks_only_named_modalities() {
        let mut arb = arbitrator();
        arb.lock(ModalityMask::MOUSE);
        assert!(!arb.request_activate(Modality::Mouse));
        assert!(arb.request_activate(Modality::ThreeDofPointer));
        assert_eq!(arb.active(), Modality::ThreeDofPointer, "locking keeps the current status");
    }

    #[test]
    fn cue_respects_cooldown() {
        let mut arb = arbitrator();
        arb.request_activate(Modality::Mouse);
        arb.request_activate(Modality::TouchSurface);
        let cues = arb
            .requests_mut()
            .drain()
            .into_iter()
            .filter(|r| matches!(r, PlatformRequest::PlayCue { .. }))
            .count();
        assert_eq!(cues, 1);

        arb.advance_time(0.5);
        arb.request_activate(Modality::Mouse);
        assert!(arb
            .requests_mut()
            .drain()
            .iter()
            .any(|r| matches!(r, PlatformRequest::PlayCue { .. })));
    }

    #[test]
    fn external_consumers_are_pushed() {
        let mut arb = arbitrator();
        let flag = Rc::new(Cell::new(false));
        let id = arb.register_consumer(
            ConsumerTarget::External(Box::new(Flag(flag.clone()))),
            EnablementRule::for_modality(Modality::Mouse),
        );
        assert_eq!(arb.consumer_enabled(id), Some(false));
        arb.request_activate(Modality::Mouse);
        assert!(flag.get());
        arb.report_sleep(Modality::Mouse, None, true);
        assert!(!flag.get());
        arb.report_sleep(Modality::Mouse, None, false);
        assert!(flag.get());
    }

    #[test]
    fn owned_consumers_produce_changes() {
        let mut arb = arbitrator();
        let id = arb.register_consumer(
            ConsumerTarget::Caster(InteractorId(3)),
            EnablementRule::for_modality(Modality::Gesture),
        );
        let changes = arb.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].consumer, id);
        assert_eq!(changes[0].caster, Some(InteractorId(3)));
        assert!(changes[0].enabled);

        arb.request_activate(Modality::Mouse);
        let changes = arb.take_changes();
        assert_eq!(changes.len(), 1);
        assert!(!changes[0].enabled);
    }

    struct Bounce {
        seen: Rc<RefCell<Vec<(Modality, Modality)>>>,
    }

    impl ModalityListener for Bounce {
        fn modality_changed(&mut self, from: Modality, to: Modality, requests: &mut ModalityRequests) {
            self.seen.borrow_mut().push((from, to));
            if to == Modality::Mouse {
                requests.request_activate(Modality::TouchSurface);
            }
        }
    }

    #[test]
    fn listener_requests_are_applied_after_delivery() {
        let mut arb = arbitrator();
        let seen = Rc::new(RefCell::new(Vec::new()));
        arb.add_listener(Box::new(Bounce { seen: seen.clone() }));
        arb.register_consumer(
            ConsumerTarget::Caster(InteractorId(0)),
            EnablementRule::for_modality(Modality::Mouse),
        );
        arb.take_changes();

        arb.request_activate(Modality::Mouse);
        assert_eq!(arb.active(), Modality::TouchSurface);
        assert_eq!(
            *seen.borrow(),
            vec![
                (Modality::Gesture, Modality::Mouse),
                (Modality::Mouse, Modality::TouchSurface)
            ]
        );
        let changes = arb.take_changes();
        assert_eq!(changes.iter().map(|c| c.enabled).collect::<Vec<_>>(), vec![true, false]);
    }

    struct PingPong;

    impl ModalityListener for PingPong {
        fn modality_changed(&mut self, from: Modality, _to: Modality, requests: &mut ModalityRequests) {
            requests.request_activate(from);
        }
    }

    #[test]
    fn endless_reentry_is_bounded() {
        let mut arb = arbitrator();
        arb.add_listener(Box::new(PingPong));
        arb.request_activate(Modality::Mouse);
        let active = arb.active();
        assert!(active == Modality::Mouse || active == Modality::Gesture);
    }
}
