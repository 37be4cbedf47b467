//! A standard scene with every interactor kind wired in.

use glam::{Vec2, Vec3};
use xrinteract_camera::Camera;
use xrinteract_core::{Handedness, InteractorId, ObjectId, Pose};
use xrinteract_interaction::{
    GrabFlags, GrabSettings, GraphicSurface, HandDesc, InteractableDesc, InteractionConfig, InteractionContext,
    RaySource, ReleaseSettings,
};
use xrinteract_physics::{Collider, ObjectDesc, Rigidbody, Scene};

/// Left hand ray.
pub const LEFT_HAND_RAY: InteractorId = InteractorId(0);
/// Right hand ray.
pub const RIGHT_HAND_RAY: InteractorId = InteractorId(1);
/// Phone pointer.
pub const THREE_DOF: InteractorId = InteractorId(2);
/// Bluetooth mouse.
pub const MOUSE: InteractorId = InteractorId(3);
/// Touch surface.
pub const TOUCH: InteractorId = InteractorId(4);
/// Left grab hand.
pub const LEFT_GRAB: InteractorId = InteractorId(5);
/// Right grab hand.
pub const RIGHT_GRAB: InteractorId = InteractorId(6);

/// Position of the grabbable cube.
pub const CUBE_POSITION: Vec3 = Vec3::new(0.2, 1.0, 0.4);
/// Position of the UI panel.
pub const PANEL_POSITION: Vec3 = Vec3::new(0.0, 1.5, 2.0);

/// Scene objects of the standard rig.
#[derive(Debug, Clone, Copy)]
pub struct RigObjects {
    /// Dynamic cube in reach of the right hand.
    pub cube: ObjectId,
    /// Ball resting farther away.
    pub ball: ObjectId,
    /// UI panel in front of the head.
    pub panel: ObjectId,
    /// Left hand object.
    pub left_hand: ObjectId,
    /// Right hand object.
    pub right_hand: ObjectId,
}

/// Context plus the objects it was built with.
#[derive(Debug)]
pub struct StandardRig {
    /// Session under test.
    pub ctx: InteractionContext,
    /// Spawned objects.
    pub objects: RigObjects,
}

impl StandardRig {
    /// Build with default tuning.
    pub fn new() -> Self {
        Self::with_config(InteractionConfig::default())
    }

    /// Build with `config`.
    pub fn with_config(config: InteractionConfig) -> Self {
        let mut scene = Scene::new();
        let cube = scene.spawn(
            ObjectDesc::new("cube", Pose::from_position(CUBE_POSITION))
                .with_collider(Collider::cuboid(Vec3::splat(0.05)))
                .with_body(Rigidbody::default()),
        );
        let ball = scene.spawn(
            ObjectDesc::new("ball", Pose::from_position(Vec3::new(-1.0, 0.5, 3.0)))
                .with_collider(Collider::sphere(0.15))
                .with_body(Rigidbody::default()),
        );
        let panel = scene.spawn(ObjectDesc::new("panel", Pose::from_position(PANEL_POSITION)));
        let left_hand = scene.spawn(ObjectDesc::new("left_hand", Pose::IDENTITY));
        let right_hand = scene.spawn(ObjectDesc::new("right_hand", Pose::IDENTITY));

        let mut ctx = InteractionContext::new(config, scene, Camera::default());
        ctx.add_surface(GraphicSurface::new(panel, Vec2::new(1.0, 0.6)));
        ctx.register_interactable(panel, InteractableDesc::default(), None);
        let grabbable = GrabSettings {
            flags: GrabFlags::PARENT_TO_HAND | GrabFlags::TURN_ON_KINEMATIC | GrabFlags::DETACH_OTHERS,
            offset: None,
            ease_in: false,
            release: ReleaseSettings::throwable(),
        };
        ctx.register_interactable(cube, InteractableDesc::default(), Some(grabbable));
        ctx.register_interactable(ball, InteractableDesc::default(), Some(grabbable));

        ctx.add_interactor(LEFT_HAND_RAY, RaySource::Hand(Handedness::Left), None);
        ctx.add_interactor(RIGHT_HAND_RAY, RaySource::Hand(Handedness::Right), None);
        ctx.add_interactor(THREE_DOF, RaySource::ThreeDof, None);
        ctx.add_interactor(MOUSE, RaySource::Mouse, None);
        ctx.add_interactor(TOUCH, RaySource::Touch, None);
        for (hand, interactor, object) in [
            (Handedness::Left, LEFT_GRAB, left_hand),
            (Handedness::Right, RIGHT_GRAB, right_hand),
        ] {
            ctx.add_hand(
                hand,
                HandDesc {
                    interactor,
                    object,
                    grab_point: Pose::IDENTITY,
                    snap_point: Pose::IDENTITY,
                },
                None,
            );
        }

        Self {
            ctx,
            objects: RigObjects {
                cube,
                ball,
                panel,
                left_hand,
                right_hand,
            },
        }
    }
}

impl Default for StandardRig {
    fn default() -> Self {
        Self::new()
    }
}
