//! Modality producers: translate raw input into activation requests,
//! per-hand detail and idle reports.

use super::{Arbitrator, HandOrientation, HandStatus, Modality, Proximity};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use xrinteract_core::{Handedness, InteractorId};
use xrinteract_input::{IdleTimer, InputState, PalmFacing};

/// Arbitration settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModalityConfig {
    /// Modality active after initialization.
    pub initial: Modality,
    /// Seconds without hand activity before a hand sleeps.
    pub gesture_idle: f32,
    /// Seconds without phone activity before the 3DOF pointer sleeps.
    pub three_dof_idle: f32,
    /// Seconds without mouse activity before the mouse sleeps.
    pub mouse_idle: f32,
    /// Seconds without touches before the touch surface sleeps.
    pub touch_idle: f32,
    /// Phone rotation (radians per frame) that counts as activity.
    pub rotation_threshold: f32,
    /// Hand grip movement (metres per frame) that counts as activity.
    pub hand_motion_threshold: f32,
}

impl Default for ModalityConfig {
    fn default() -> Self {
        Self {
            initial: Modality::Gesture,
            gesture_idle: 10.0,
            three_dof_idle: 5.0,
            mouse_idle: 5.0,
            touch_idle: 5.0,
            rotation_threshold: 0.01,
            hand_motion_threshold: 0.005,
        }
    }
}

/// Per-hand signals computed elsewhere in the context (previous frame).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandSignals {
    /// Hand hovers an interactable within reach.
    pub near: bool,
    /// Hand ray is dragging.
    pub dragging: bool,
}

/// Tracked hands.
#[derive(Debug, Clone)]
pub struct GestureProducer {
    idle: [IdleTimer; 2],
    last_grip: [Option<Vec3>; 2],
    motion_threshold: f32,
}

impl GestureProducer {
    /// Producer using `config` thresholds.
    pub fn new(config: &ModalityConfig) -> Self {
        Self {
            idle: [IdleTimer::new(config.gesture_idle), IdleTimer::new(config.gesture_idle)],
            last_grip: [None; 2],
            motion_threshold: config.hand_motion_threshold,
        }
    }

    /// Publish hand detail and request the gesture modality on hand activity.
    pub fn update(&mut self, input: &InputState, dt: f32, signals: [HandSignals; 2], arbitrator: &mut Arbitrator) {
        for hand in Handedness::BOTH {
            let i = hand.index();
            let frame = input.hand(hand).filter(|f| f.tracking);
            let edges = input.hand_edges(hand);

            let detail = HandStatus {
                tracking_active: frame.is_some(),
                proximity: if signals[i].near { Proximity::Near } else { Proximity::Far },
                orientation: match frame.map(|f| f.facing) {
                    Some(PalmFacing::Palm) => HandOrientation::Palm,
                    _ => HandOrientation::Back,
                },
                watch_overlay: frame.is_some_and(|f| f.watch_overlay),
                is_dragging: signals[i].dragging,
            };
            arbitrator.set_hand_status(hand, detail);

            let grip = frame.map(|f| f.grip_pose.position);
            let moved = match (self.last_grip[i], grip) {
                (Some(a), Some(b)) => a.distance(b) > self.motion_threshold,
                _ => false,
            };
            self.last_grip[i] = grip;

            let gesturing = frame.is_some_and(|f| f.pinch || f.grip);
            if let Some(sleeping) = self.idle[i].tick(dt, moved || gesturing) {
                arbitrator.report_sleep(Modality::Gesture, Some(hand), sleeping);
            }

            if frame.is_some() && (edges.pinch_started || edges.grip_started || edges.tracking_gained) {
                arbitrator.request_activate(Modality::Gesture);
                if arbitrator.active() == Modality::Gesture {
                    arbitrator.set_active_hand_ray(Some(hand));
                }
            }
        }

        if let Some(ray_hand) = arbitrator.status().active_hand_ray {
            if !input.hand_tracked(ray_hand) {
                let fallback = input.hand_tracked(ray_hand.other()).then_some(ray_hand.other());
                arbitrator.set_active_hand_ray(fallback);
            }
        }
    }
}

/// Phone pointer.
#[derive(Debug, Clone)]
pub struct ThreeDofProducer {
    idle: IdleTimer,
    rotation_threshold: f32,
    last_button: bool,
}

impl ThreeDofProducer {
    /// Producer using `config` thresholds.
    pub fn new(config: &ModalityConfig) -> Self {
        Self {
            idle: IdleTimer::new(config.three_dof_idle),
            rotation_threshold: config.rotation_threshold,
            last_button: false,
        }
    }

    /// Request the 3DOF pointer on rotation or button changes.
    pub fn update(&mut self, input: &InputState, dt: f32, arbitrator: &mut Arbitrator) {
        let Some(frame) = input.three_dof else {
            self.last_button = false;
            if let Some(sleeping) = self.idle.tick(dt, false) {
                arbitrator.report_sleep(Modality::ThreeDofPointer, None, sleeping);
            }
            return;
        };
        let active = input.three_dof_rotation_delta > self.rotation_threshold || frame.button != self.last_button;
        self.last_button = frame.button;
        if let Some(sleeping) = self.idle.tick(dt, active) {
            arbitrator.report_sleep(Modality::ThreeDofPointer, None, sleeping);
        }
        if active {
            arbitrator.request_activate(Modality::ThreeDofPointer);
        }
    }
}

/// Bluetooth mouse.
#[derive(Debug, Clone)]
pub struct MouseProducer {
    idle: IdleTimer,
    interactor: InteractorId,
}

impl MouseProducer {
    /// Producer whose buttons are read from `interactor`.
    pub fn new(config: &ModalityConfig, interactor: InteractorId) -> Self {
        Self {
            idle: IdleTimer::new(config.mouse_idle),
            interactor,
        }
    }

    /// Request the mouse on motion or button edges.
    pub fn update(&mut self, input: &InputState, dt: f32, arbitrator: &mut Arbitrator) {
        let active = input.mouse_connected
            && (input.mouse_delta != Vec2::ZERO
                || input.button_just_pressed(self.interactor)
                || input.button_just_released(self.interactor));
        if let Some(sleeping) = self.idle.tick(dt, active) {
            arbitrator.report_sleep(Modality::Mouse, None, sleeping);
        }
        if active {
            arbitrator.request_activate(Modality::Mouse);
        }
    }
}

/// Device touch surface.
#[derive(Debug, Clone)]
pub struct TouchProducer {
    idle: IdleTimer,
}

impl TouchProducer {
    /// Producer using `config` thresholds.
    pub fn new(config: &ModalityConfig) -> Self {
        Self {
            idle: IdleTimer::new(config.touch_idle),
        }
    }

    /// Request the touch surface while a finger rests or moves on it.
    pub fn update(&mut self, input: &InputState, dt: f32, arbitrator: &mut Arbitrator) {
        let active = input.touching || input.touch_delta != Vec2::ZERO;
        if let Some(sleeping) = self.idle.tick(dt, active) {
            arbitrator.report_sleep(Modality::TouchSurface, None, sleeping);
        }
        if active {
            arbitrator.request_activate(Modality::TouchSurface);
        }
    }
}

/// All four producers, run in a fixed order each frame.
#[derive(Debug, Clone)]
pub struct ModalityProducers {
    /// Hands.
    pub gesture: GestureProducer,
    /// Phone pointer.
    pub three_dof: ThreeDofProducer,
    /// Mouse.
    pub mouse: MouseProducer,
    /// Touch surface.
    pub touch: TouchProducer,
}

impl ModalityProducers {
    /// Producers for `config`; `mouse` names the mouse interactor.
    pub fn new(config: &ModalityConfig, mouse: InteractorId) -> Self {
        Self {
            gesture: GestureProducer::new(config),
            three_dof: ThreeDofProducer::new(config),
            mouse: MouseProducer::new(config, mouse),
            touch: TouchProducer::new(config),
        }
    }

    /// Run every producer for one render frame.
    pub fn update(&mut self, input: &InputState, dt: f32, signals: [HandSignals; 2], arbitrator: &mut Arbitrator) {
        self.gesture.update(input, dt, signals, arbitrator);
        self.three_dof.update(input, dt, arbitrator);
        self.mouse.update(input, dt, arbitrator);
        self.touch.update(input, dt, arbitrator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrinteract_audio::CueSettings;
    use xrinteract_input::HandFrame;

    const MOUSE: InteractorId = InteractorId(9);

    fn setup() -> (ModalityProducers, Arbitrator) {
        let config = ModalityConfig::default();
        let mut arb = Arbitrator::new(CueSettings::default());
        arb.initialize(Modality::Gesture);
        (ModalityProducers::new(&config, MOUSE), arb)
    }

    #[test]
    fn mouse_motion_activates_mouse() {
        let (mut producers, mut arb) = setup();
        let mut input = InputState::new();
        input.mouse_connected = true;
        input.add_mouse_motion(Vec2::new(4.0, 0.0));
        producers.update(&input, 0.016, [HandSignals::default(); 2], &mut arb);
        assert_eq!(arb.active(), Modality::Mouse);
    }

    #[test]
    fn disconnected_mouse_is_ignored() {
        let (mut producers, mut arb) = setup();
        let mut input = InputState::new();
        input.add_mouse_motion(Vec2::new(4.0, 0.0));
        producers.update(&input, 0.016, [HandSignals::default(); 2], &mut arb);
        assert_eq!(arb.active(), Modality::Gesture);
    }

    #[test]
    fn pinch_brings_back_gesture_and_sets_ray_hand() {
        let (mut producers, mut arb) = setup();
        arb.request_activate(Modality::TouchSurface);
        let mut input = InputState::new();
        input.set_hand(
            Handedness::Left,
            Some(HandFrame {
                pinch: true,
                ..HandFrame::default()
            }),
        );
        producers.update(&input, 0.016, [HandSignals::default(); 2], &mut arb);
        assert_eq!(arb.active(), Modality::Gesture);
        assert_eq!(arb.status().active_hand_ray, Some(Handedness::Left));
        assert!(arb.status().hand(Handedness::Left).tracking_active);
        assert!(!arb.status().hand(Handedness::Right).tracking_active);
    }

    #[test]
    fn touch_sleeps_after_idle() {
        let (mut producers, mut arb) = setup();
        let mut input = InputState::new();
        input.touching = true;
        producers.update(&input, 0.25, [HandSignals::default(); 2], &mut arb);
        assert_eq!(arb.active(), Modality::TouchSurface);

        input.begin_frame();
        input.touching = false;
        for _ in 0..21 {
            producers.update(&input, 0.25, [HandSignals::default(); 2], &mut arb);
        }
        assert!(arb.status().sleep.contains(super::super::SleepFlags::TOUCH_SURFACE));
    }

    #[test]
    fn signals_feed_hand_detail() {
        let (mut producers, mut arb) = setup();
        let mut input = InputState::new();
        input.set_hand(Handedness::Right, Some(HandFrame::default()));
        let mut signals = [HandSignals::default(); 2];
        signals[Handedness::Right.index()].near = true;
        producers.update(&input, 0.016, signals, &mut arb);
        assert_eq!(arb.status().hand(Handedness::Right).proximity, Proximity::Near);
    }
}
