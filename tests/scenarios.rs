use glam::{Vec2, Vec3};
use xrinteract_camera::Camera;
use xrinteract_core::{Handedness, InteractorId, ObjectId, Pose, Ray};
use xrinteract_input::InputState;
use xrinteract_interaction::{
    GrabFlags, GrabType, InteractableDesc, InteractionConfig, InteractionContext, InteractionEvent, Modality,
    PointerEventKind, RaySource,
};
use xrinteract_physics::{Collider, ObjectDesc, Rigidbody, Scene};
use xrinteract_testkit::{kinds_without_hover, EventRecorder, StandardRig, MOUSE};

const POINTER: InteractorId = InteractorId(40);
const DT: f32 = 0.1;

fn pointer_scene() -> (InteractionContext, ObjectId) {
    let mut scene = Scene::new();
    let target = scene.spawn(
        ObjectDesc::new("target", Pose::from_position(Vec3::new(0.0, 0.0, 2.0)))
            .with_collider(Collider::cuboid(Vec3::splat(0.2)))
            .with_body(Rigidbody::default()),
    );
    let mut ctx = InteractionContext::new(InteractionConfig::default(), scene, Camera::default());
    ctx.register_interactable(target, InteractableDesc::default(), None);
    ctx.add_interactor(POINTER, RaySource::Explicit, None);
    (ctx, target)
}

fn ray_at(x: f32) -> Ray {
    Ray::new(Vec3::new(x, 0.0, 0.0), Vec3::Z).expect("non-degenerate ray")
}

/// Hover, press at t=0, hold, release at t=0.3 with the ray moved to `moved`.
fn press_cycle(moved: f32) -> (Vec<PointerEventKind>, ObjectId) {
    let (mut ctx, target) = pointer_scene();
    let (recorder, log) = EventRecorder::new();
    ctx.add_handler(target, Box::new(recorder));
    let mut input = InputState::new();

    input.set_ray(POINTER, ray_at(0.0));
    ctx.update(DT, &input);

    input.begin_frame();
    input.press(POINTER);
    ctx.update(DT, &input);

    for x in [moved * 0.5, moved] {
        input.begin_frame();
        input.set_ray(POINTER, ray_at(x));
        ctx.update(DT, &input);
    }

    input.begin_frame();
    input.release(POINTER);
    ctx.update(DT, &input);

    let kinds = kinds_without_hover(&log);
    (kinds, target)
}

#[test]
fn short_press_without_motion_clicks() {
    use PointerEventKind::*;
    let (kinds, _) = press_cycle(0.001);
    assert_eq!(kinds, vec![Enter, Down, Up, Click]);
}

#[test]
fn press_moved_past_threshold_drags_without_click() {
    use PointerEventKind::*;
    let (kinds, _) = press_cycle(0.05);
    assert_eq!(&kinds[..3], &[Enter, Down, DragBegin]);
    assert_eq!(kinds.last(), Some(&DragEnd));
    assert!(kinds.iter().filter(|k| **k == Drag).count() >= 1);
    assert!(!kinds.contains(&Click));
    assert!(!kinds.contains(&Up));
    assert_eq!(kinds.iter().filter(|k| **k == DragBegin).count(), 1);
}

#[test]
fn destroying_held_object_externally_self_heals() {
    let mut rig = StandardRig::new();
    let cube = rig.objects.cube;
    let flags = GrabFlags::PARENT_TO_HAND | GrabFlags::TURN_ON_KINEMATIC;
    assert!(rig.ctx.grab(Handedness::Right, cube, GrabType::Grip, flags, None));
    assert_eq!(rig.ctx.grab_engine().current_grabbed(Handedness::Right), Some(cube));

    assert!(rig.ctx.scene_mut().destroy(cube));
    rig.ctx.update(DT, &InputState::new());

    assert_eq!(rig.ctx.grab_engine().current_grabbed(Handedness::Right), None);
    assert!(rig.ctx.drain_events().contains(&InteractionEvent::Released {
        hand: Handedness::Right,
        object: cube,
        lost: true,
    }));
    assert!(!rig.ctx.registry().contains(cube));
}

#[test]
fn gesture_lock_refuses_touch() {
    let mut rig = StandardRig::new();
    rig.ctx.lock_to(Modality::Gesture);

    let mut input = InputState::new();
    input.touching = true;
    input.add_touch_motion(Vec2::new(5.0, 0.0));
    for _ in 0..5 {
        rig.ctx.update(DT, &input);
        input.begin_frame();
        input.add_touch_motion(Vec2::new(5.0, 0.0));
    }
    assert_eq!(rig.ctx.arbitrator().active(), Modality::Gesture);
    assert!(!rig.ctx.request_activate(Modality::TouchSurface));
    assert_eq!(rig.ctx.arbitrator().active(), Modality::Gesture);

    rig.ctx.unlock();
    assert!(rig.ctx.request_activate(Modality::TouchSurface));
}

#[test]
fn mouse_clicks_the_panel() {
    let mut rig = StandardRig::new();
    let (recorder, log) = EventRecorder::new();
    rig.ctx.add_handler(rig.objects.panel, Box::new(recorder));

    let mut input = InputState::new();
    input.head_pose = Pose::from_position(Vec3::new(0.0, 1.5, 0.0));
    input.mouse_connected = true;
    input.add_mouse_motion(input.screen_size * 0.5);
    rig.ctx.update(0.016, &input);
    assert_eq!(rig.ctx.arbitrator().active(), Modality::Mouse);

    input.begin_frame();
    input.press(MOUSE);
    rig.ctx.update(0.016, &input);
    input.begin_frame();
    input.release(MOUSE);
    rig.ctx.update(0.016, &input);

    use PointerEventKind::*;
    assert_eq!(kinds_without_hover(&log), vec![Enter, Down, Up, Click]);
    assert!(log.borrow().iter().all(|e| e.target == Some(rig.objects.panel)));
}
