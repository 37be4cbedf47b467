//! Scene-object store: hierarchy, queries and integration.

use crate::{Aabb, Collider, ColliderShape, Rigidbody, GRAVITY, QUERY_BUFFER_CAPACITY};
use glam::{Quat, Vec3};
use std::collections::BTreeMap;
use tracing::{trace, warn};
use xrinteract_core::{ObjectId, Pose, Ray, EPSILON};

/// One object in the scene.
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Debug name.
    pub name: String,
    /// Pose relative to the parent (or world when unparented).
    pub local: Pose,
    /// Uniform local scale.
    pub scale: f32,
    /// Inactive objects (and their descendants) are invisible to queries.
    pub active: bool,
    /// Optional collision volume.
    pub collider: Option<Collider>,
    /// Optional simulated body.
    pub body: Option<Rigidbody>,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
}

impl SceneObject {
    /// Parent object, if any.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Direct children in attachment order.
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }
}

/// Construction parameters for [`Scene::spawn`].
#[derive(Debug, Clone)]
pub struct ObjectDesc {
    /// Debug name.
    pub name: String,
    /// Pose relative to `parent`, or world pose when `parent` is `None`.
    pub pose: Pose,
    /// Uniform scale.
    pub scale: f32,
    /// Parent to attach to.
    pub parent: Option<ObjectId>,
    /// Collision volume.
    pub collider: Option<Collider>,
    /// Simulated body.
    pub body: Option<Rigidbody>,
}

impl ObjectDesc {
    /// Unparented, unit-scale object at `pose` with no components.
    pub fn new(name: impl Into<String>, pose: Pose) -> Self {
        Self {
            name: name.into(),
            pose,
            scale: 1.0,
            parent: None,
            collider: None,
            body: None,
        }
    }

    /// Attach under `parent` (the pose becomes local).
    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add a collider.
    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self
    }

    /// Add a rigidbody.
    pub fn with_body(mut self, body: Rigidbody) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the uniform scale.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

/// Collider hit reported by [`Scene::raycast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsHit {
    /// Object owning the collider.
    pub object: ObjectId,
    /// Distance along the ray.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// World-space surface normal.
    pub normal: Vec3,
}

/// Owns every scene object. Iteration order is by id, so queries are deterministic.
#[derive(Debug, Default)]
pub struct Scene {
    objects: BTreeMap<ObjectId, SceneObject>,
    next_id: u32,
}

impl Scene {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object and return its id.
    ///
    /// A `parent` that does not exist is ignored and the object is created at
    /// the root with `pose` interpreted as a world pose.
    pub fn spawn(&mut self, desc: ObjectDesc) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;

        let parent = desc.parent.filter(|p| self.objects.contains_key(p));
        if let Some(p) = parent {
            if let Some(parent_obj) = self.objects.get_mut(&p) {
                parent_obj.children.push(id);
            }
        }

        self.objects.insert(
            id,
            SceneObject {
                name: desc.name,
                local: desc.pose,
                scale: desc.scale,
                active: true,
                collider: desc.collider,
                body: desc.body,
                parent,
                children: Vec::new(),
            },
        );
        trace!(%id, "spawned scene object");
        id
    }

    /// Destroy an object and its whole subtree. Returns `false` if it was already gone.
    pub fn destroy(&mut self, id: ObjectId) -> bool {
        let Some(obj) = self.objects.get(&id) else {
            return false;
        };
        if let Some(parent) = obj.parent {
            if let Some(parent_obj) = self.objects.get_mut(&parent) {
                parent_obj.children.retain(|c| *c != id);
            }
        }

        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(removed) = self.objects.remove(&next) {
                stack.extend(removed.children);
            }
        }
        trace!(%id, "destroyed scene object");
        true
    }

    /// Whether the object still exists.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the scene has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Borrow an object.
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// Mutably borrow an object.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    /// All live object ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    /// Parent of `id`.
    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects.get(&id).and_then(|o| o.parent)
    }

    /// `id` followed by each ancestor up to the root.
    pub fn ancestors(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut chain = Vec::new();
        let mut cursor = self.objects.contains_key(&id).then_some(id);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.parent(current);
        }
        chain
    }

    /// Topmost ancestor of `id` (itself when unparented).
    pub fn root_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.ancestors(id).last().copied()
    }

    /// Whether the object and all its ancestors are active.
    pub fn is_active_in_hierarchy(&self, id: ObjectId) -> bool {
        let chain = self.ancestors(id);
        !chain.is_empty()
            && chain
                .iter()
                .all(|a| self.objects.get(a).is_some_and(|o| o.active))
    }

    /// World pose (scale excluded).
    pub fn world_pose(&self, id: ObjectId) -> Option<Pose> {
        let chain = self.ancestors(id);
        if chain.is_empty() {
            return None;
        }
        let mut pose = Pose::IDENTITY;
        for ancestor in chain.iter().rev() {
            let obj = self.objects.get(ancestor)?;
            let scaled_local = Pose::new(
                obj.local.position * self.parent_scale(*ancestor),
                obj.local.rotation,
            );
            pose = pose.mul_pose(&scaled_local);
        }
        Some(pose)
    }

    /// Product of the scales of `id` and all its ancestors.
    pub fn lossy_scale(&self, id: ObjectId) -> Option<f32> {
        let chain = self.ancestors(id);
        if chain.is_empty() {
            return None;
        }
        Some(
            chain
                .iter()
                .filter_map(|a| self.objects.get(a))
                .map(|o| o.scale)
                .product(),
        )
    }

    fn parent_scale(&self, id: ObjectId) -> f32 {
        self.parent(id)
            .and_then(|p| self.lossy_scale(p))
            .unwrap_or(1.0)
    }

    /// Move an object so its world pose equals `pose`. Returns `false` if it does not exist.
    pub fn set_world_pose(&mut self, id: ObjectId, pose: Pose) -> bool {
        if !self.objects.contains_key(&id) {
            return false;
        }
        let local = match self.parent(id) {
            Some(parent) => {
                let parent_pose = self.world_pose(parent).unwrap_or_default();
                let scale = self.lossy_scale(parent).unwrap_or(1.0);
                let mut local = parent_pose.relative(&pose);
                if scale.abs() > EPSILON {
                    local.position /= scale;
                }
                local
            }
            None => pose,
        };
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.local = local;
        }
        true
    }

    /// Reparent `id` under `new_parent` (or to the root).
    ///
    /// With `keep_world` the world pose is preserved; otherwise the local
    /// pose is kept. Cycles and dead parents are refused.
    pub fn set_parent(&mut self, id: ObjectId, new_parent: Option<ObjectId>, keep_world: bool) -> bool {
        if !self.objects.contains_key(&id) {
            return false;
        }
        if let Some(p) = new_parent {
            if !self.objects.contains_key(&p) || self.ancestors(p).contains(&id) {
                return false;
            }
        }

        let world = self.world_pose(id).unwrap_or_default();
        if let Some(old) = self.parent(id) {
            if let Some(old_obj) = self.objects.get_mut(&old) {
                old_obj.children.retain(|c| *c != id);
            }
        }
        if let Some(p) = new_parent {
            if let Some(parent_obj) = self.objects.get_mut(&p) {
                parent_obj.children.push(id);
            }
        }
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.parent = new_parent;
        }
        if keep_world {
            self.set_world_pose(id, world);
        }
        true
    }

    /// Borrow the rigidbody of `id`.
    pub fn body(&self, id: ObjectId) -> Option<&Rigidbody> {
        self.objects.get(&id).and_then(|o| o.body.as_ref())
    }

    /// Mutably borrow the rigidbody of `id`.
    pub fn body_mut(&mut self, id: ObjectId) -> Option<&mut Rigidbody> {
        self.objects.get_mut(&id).and_then(|o| o.body.as_mut())
    }

    /// Cast `ray` against every enabled collider on a layer in `layer_mask`.
    ///
    /// `hits` is cleared and refilled nearest-first, capped at
    /// [`QUERY_BUFFER_CAPACITY`]. Returns the number of hits written.
    pub fn raycast(&self, ray: &Ray, max_distance: f32, layer_mask: u32, hits: &mut Vec<PhysicsHit>) -> usize {
        hits.clear();
        for (&id, obj) in &self.objects {
            let Some(collider) = obj.collider.filter(|c| c.enabled) else {
                continue;
            };
            if collider.layer_bit() & layer_mask == 0 || !self.is_active_in_hierarchy(id) {
                continue;
            }
            if let Some(hit) = self.raycast_collider(id, &collider, ray) {
                if hit.distance <= max_distance {
                    hits.push(hit);
                }
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.object.cmp(&b.object)));
        if hits.len() > QUERY_BUFFER_CAPACITY {
            warn!(
                found = hits.len(),
                capacity = QUERY_BUFFER_CAPACITY,
                "raycast hit buffer full; farthest hits dropped"
            );
            hits.truncate(QUERY_BUFFER_CAPACITY);
        }
        hits.len()
    }

    fn raycast_collider(&self, id: ObjectId, collider: &Collider, ray: &Ray) -> Option<PhysicsHit> {
        let pose = self.world_pose(id)?;
        let scale = self.lossy_scale(id)?.abs();
        match collider.shape {
            ColliderShape::Sphere { center, radius } => {
                let world_center = pose.transform_point(center * scale);
                let r = radius * scale;
                let oc = ray.origin - world_center;
                let b = oc.dot(ray.direction);
                let c = oc.length_squared() - r * r;
                if c <= 0.0 {
                    return None;
                }
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let t = -b - disc.sqrt();
                if t < 0.0 {
                    return None;
                }
                let point = ray.at(t);
                Some(PhysicsHit {
                    object: id,
                    distance: t,
                    point,
                    normal: (point - world_center).normalize_or_zero(),
                })
            }
            ColliderShape::Box { center, half_extents } => {
                let local_origin = pose.inverse_transform_point(ray.origin);
                let local_dir = pose.rotation.inverse() * ray.direction;
                let aabb = Aabb::from_center_half_extents(center * scale, half_extents * scale);
                let (t, local_normal) = aabb.ray_intersection(local_origin, local_dir)?;
                Some(PhysicsHit {
                    object: id,
                    distance: t,
                    point: ray.at(t),
                    normal: pose.rotation * local_normal,
                })
            }
        }
    }

    /// Collect objects whose enabled collider touches the sphere.
    ///
    /// `out` is cleared and refilled in id order, capped at [`QUERY_BUFFER_CAPACITY`].
    pub fn overlap_sphere(&self, center: Vec3, radius: f32, layer_mask: u32, out: &mut Vec<ObjectId>) -> usize {
        out.clear();
        for (&id, obj) in &self.objects {
            let Some(collider) = obj.collider.filter(|c| c.enabled) else {
                continue;
            };
            if collider.layer_bit() & layer_mask == 0 || !self.is_active_in_hierarchy(id) {
                continue;
            }
            let (Some(pose), Some(scale)) = (self.world_pose(id), self.lossy_scale(id)) else {
                continue;
            };
            let scale = scale.abs();
            let touching = match collider.shape {
                ColliderShape::Sphere { center: c, radius: r } => {
                    let world_center = pose.transform_point(c * scale);
                    world_center.distance(center) <= r * scale + radius
                }
                ColliderShape::Box { center: c, half_extents } => {
                    let local = pose.inverse_transform_point(center);
                    Aabb::from_center_half_extents(c * scale, half_extents * scale)
                        .intersects_sphere(local, radius)
                }
            };
            if touching {
                if out.len() == QUERY_BUFFER_CAPACITY {
                    warn!(capacity = QUERY_BUFFER_CAPACITY, "overlap buffer full; remaining colliders skipped");
                    break;
                }
                out.push(id);
            }
        }
        out.len()
    }

    /// Advance every non-kinematic body by one fixed step.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let dynamic: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|(_, o)| o.active && o.body.is_some_and(|b| !b.is_kinematic))
            .map(|(id, _)| *id)
            .collect();

        for id in dynamic {
            let Some(mut body) = self.body(id).copied() else {
                continue;
            };
            if body.use_gravity {
                body.velocity += GRAVITY * dt;
            }
            let Some(mut pose) = self.world_pose(id) else {
                continue;
            };
            pose.position += body.velocity * dt;
            let spin = body.angular_velocity * dt;
            if spin.length_squared() > EPSILON * EPSILON {
                pose.rotation = (Quat::from_scaled_axis(spin) * pose.rotation).normalize();
            }
            self.set_world_pose(id, pose);
            if let Some(b) = self.body_mut(id) {
                *b = body;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollisionMode;

    fn ray(origin: Vec3, dir: Vec3) -> Ray {
        Ray::new(origin, dir).expect("valid ray")
    }

    #[test]
    fn destroy_removes_subtree() {
        let mut scene = Scene::new();
        let root = scene.spawn(ObjectDesc::new("root", Pose::IDENTITY));
        let child = scene.spawn(ObjectDesc::new("child", Pose::IDENTITY).with_parent(root));
        let grandchild = scene.spawn(ObjectDesc::new("gc", Pose::IDENTITY).with_parent(child));

        assert!(scene.destroy(child));
        assert!(scene.contains(root));
        assert!(!scene.contains(child));
        assert!(!scene.contains(grandchild));
        assert!(scene.get(root).unwrap().children().is_empty());
        assert!(!scene.destroy(child));
    }

    #[test]
    fn world_pose_composes_parent_chain() {
        let mut scene = Scene::new();
        let parent = scene.spawn(ObjectDesc::new(
            "parent",
            Pose::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
        ));
        let child = scene.spawn(
            ObjectDesc::new("child", Pose::from_position(Vec3::new(0.0, 0.0, 1.0))).with_parent(parent),
        );
        let world = scene.world_pose(child).unwrap();
        assert!((world.position - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn reparent_keeps_world_pose() {
        let mut scene = Scene::new();
        let hand = scene.spawn(ObjectDesc::new("hand", Pose::from_position(Vec3::new(0.0, 1.0, 0.0))).with_scale(2.0));
        let cube = scene.spawn(ObjectDesc::new("cube", Pose::from_position(Vec3::new(0.5, 1.0, 0.3))));
        assert!(scene.set_parent(cube, Some(hand), true));
        let world = scene.world_pose(cube).unwrap();
        assert!((world.position - Vec3::new(0.5, 1.0, 0.3)).length() < 1e-5);
        assert_eq!(scene.parent(cube), Some(hand));

        assert!(scene.set_parent(cube, None, true));
        let world = scene.world_pose(cube).unwrap();
        assert!((world.position - Vec3::new(0.5, 1.0, 0.3)).length() < 1e-5);
    }

    #[test]
    fn reparent_refuses_cycles() {
        let mut scene = Scene::new();
        let a = scene.spawn(ObjectDesc::new("a", Pose::IDENTITY));
        let b = scene.spawn(ObjectDesc::new("b", Pose::IDENTITY).with_parent(a));
        assert!(!scene.set_parent(a, Some(b), true));
        assert!(!scene.set_parent(a, Some(a), true));
    }

    #[test]
    fn raycast_orders_nearest_first() {
        let mut scene = Scene::new();
        let far = scene.spawn(
            ObjectDesc::new("far", Pose::from_position(Vec3::new(0.0, 0.0, 5.0)))
                .with_collider(Collider::cuboid(Vec3::splat(0.5))),
        );
        let near = scene.spawn(
            ObjectDesc::new("near", Pose::from_position(Vec3::new(0.0, 0.0, 2.0)))
                .with_collider(Collider::sphere(0.25)),
        );
        let mut hits = Vec::new();
        let n = scene.raycast(&ray(Vec3::ZERO, Vec3::Z), 100.0, u32::MAX, &mut hits);
        assert_eq!(n, 2);
        assert_eq!(hits[0].object, near);
        assert_eq!(hits[1].object, far);
        assert!((hits[0].distance - 1.75).abs() < 1e-4);
        assert!((hits[1].normal - Vec3::NEG_Z).length() < 1e-5);

        let n = scene.raycast(&ray(Vec3::ZERO, Vec3::Z), 3.0, u32::MAX, &mut hits);
        assert_eq!(n, 1);
    }

    #[test]
    fn raycast_respects_layers_and_activity() {
        let mut scene = Scene::new();
        let a = scene.spawn(
            ObjectDesc::new("a", Pose::from_position(Vec3::new(0.0, 0.0, 2.0)))
                .with_collider(Collider::sphere(0.5).with_layer(3)),
        );
        let mut hits = Vec::new();
        assert_eq!(scene.raycast(&ray(Vec3::ZERO, Vec3::Z), 10.0, 1 << 0, &mut hits), 0);
        assert_eq!(scene.raycast(&ray(Vec3::ZERO, Vec3::Z), 10.0, 1 << 3, &mut hits), 1);
        scene.get_mut(a).unwrap().active = false;
        assert_eq!(scene.raycast(&ray(Vec3::ZERO, Vec3::Z), 10.0, u32::MAX, &mut hits), 0);
    }

    #[test]
    fn raycast_buffer_is_capped() {
        let mut scene = Scene::new();
        for i in 0..(QUERY_BUFFER_CAPACITY + 10) {
            scene.spawn(
                ObjectDesc::new("wall", Pose::from_position(Vec3::new(0.0, 0.0, 1.0 + i as f32)))
                    .with_collider(Collider::cuboid(Vec3::new(1.0, 1.0, 0.1))),
            );
        }
        let mut hits = Vec::new();
        let n = scene.raycast(&ray(Vec3::new(0.0, 0.0, -1.0), Vec3::Z), 1000.0, u32::MAX, &mut hits);
        assert_eq!(n, QUERY_BUFFER_CAPACITY);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn overlap_sphere_finds_touching_colliders() {
        let mut scene = Scene::new();
        let close = scene.spawn(
            ObjectDesc::new("close", Pose::from_position(Vec3::new(0.1, 0.0, 0.0)))
                .with_collider(Collider::cuboid(Vec3::splat(0.05))),
        );
        scene.spawn(
            ObjectDesc::new("away", Pose::from_position(Vec3::new(2.0, 0.0, 0.0)))
                .with_collider(Collider::sphere(0.05)),
        );
        let mut out = Vec::new();
        assert_eq!(scene.overlap_sphere(Vec3::ZERO, 0.075, u32::MAX, &mut out), 1);
        assert_eq!(out[0], close);
    }

    #[test]
    fn step_integrates_dynamic_bodies_only() {
        let mut scene = Scene::new();
        let falling = scene.spawn(ObjectDesc::new("falling", Pose::IDENTITY).with_body(Rigidbody::default()));
        let pinned = scene.spawn(ObjectDesc::new("pinned", Pose::IDENTITY).with_body(Rigidbody {
            is_kinematic: true,
            collision_mode: CollisionMode::Discrete,
            ..Rigidbody::default()
        }));
        for _ in 0..10 {
            scene.step(0.02);
        }
        assert!(scene.world_pose(falling).unwrap().position.y < 0.0);
        assert_eq!(scene.world_pose(pinned).unwrap().position, Vec3::ZERO);
    }
}
