//! Ray hit-testing against graphic surfaces and physical volumes.
//!
//! Both kinds of hit are merged into one list and ordered by
//! [`sort_hits`]; the first element is the hit the dispatcher acts on.

use crate::registry::InteractableRegistry;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::trace;
use xrinteract_camera::Camera;
use xrinteract_core::{ObjectId, Ray, EPSILON};
use xrinteract_physics::{PhysicsHit, Scene};

/// Hit-tester settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitTesterConfig {
    /// Hits further than this along the ray are ignored.
    pub max_distance: f32,
    /// Skip surfaces seen from behind.
    pub back_face_culling: bool,
    /// Collider layers tested by the physics pass.
    pub layer_mask: u32,
}

impl Default for HitTesterConfig {
    fn default() -> Self {
        Self {
            max_distance: 10.0,
            back_face_culling: true,
            layer_mask: u32::MAX,
        }
    }
}

/// A flat rectangle drawn by a UI canvas, attached to a scene object.
///
/// The rectangle lies in the object's local XY plane, centred on its
/// origin, and faces along the object's forward (+Z).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphicSurface {
    /// Owning scene object.
    pub object: ObjectId,
    /// Width and height in local units (scaled by the object's lossy scale).
    pub size: Vec2,
    /// Whether rays can hit it at all.
    pub raycast_target: bool,
    /// Sorting layer value; higher draws on top.
    pub sorting_layer: i32,
    /// Order within the layer; higher draws on top.
    pub sorting_order: i32,
    /// Draw depth within the canvas; higher draws on top.
    pub depth: i32,
    /// Root canvas id. Depth only orders hits under the same root.
    pub root: u32,
    /// Priority of the rendering context (camera depth of the canvas).
    pub context_priority: i32,
}

impl GraphicSurface {
    /// Raycastable surface of `size` on `object`, under root canvas 0.
    pub fn new(object: ObjectId, size: Vec2) -> Self {
        Self {
            object,
            size,
            raycast_target: true,
            sorting_layer: 0,
            sorting_order: 0,
            depth: 0,
            root: 0,
            context_priority: 0,
        }
    }
}

/// Whether a hit came from a surface or a collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitSource {
    /// Graphic surface.
    Graphic,
    /// Physics collider.
    Physics,
}

/// One hit candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaycastHit {
    /// Object that was hit.
    pub object: ObjectId,
    /// Registered interactable owning `object`, if any.
    pub interactable: Option<ObjectId>,
    /// Surface or collider.
    pub source: HitSource,
    /// Distance along the ray.
    pub distance: f32,
    /// World-space point.
    pub point: Vec3,
    /// World-space normal.
    pub normal: Vec3,
    /// Rendering-context priority.
    pub context_priority: i32,
    /// Sorting layer.
    pub sorting_layer: i32,
    /// Sorting order.
    pub sorting_order: i32,
    /// Depth within the root context.
    pub depth: i32,
    /// Root context, `None` for colliders.
    pub root: Option<u32>,
    /// Position in the unsorted candidate list.
    pub index: usize,
}

/// Sort hits into dispatch order.
///
/// Keys, first difference wins: context priority (higher first), sorting
/// layer (higher first), sorting order (higher first), depth (higher first),
/// distance (nearer first), insertion index (earlier first).
///
/// Depth only ranks hits under the same root. Roots, and hits without one,
/// are placed by their nearest hit, which keeps the order total when
/// depth and distance disagree across roots.
pub fn sort_hits(hits: &mut [RaycastHit]) {
    let mut nearest: BTreeMap<(i32, i32, i32, u32), f32> = BTreeMap::new();
    for hit in hits.iter() {
        if let Some(root) = hit.root {
            nearest
                .entry((hit.context_priority, hit.sorting_layer, hit.sorting_order, root))
                .and_modify(|d| *d = d.min(hit.distance))
                .or_insert(hit.distance);
        }
    }
    let group = |hit: &RaycastHit| match hit.root {
        Some(root) => {
            let key = (hit.context_priority, hit.sorting_layer, hit.sorting_order, root);
            let distance = nearest.get(&key).copied().unwrap_or(hit.distance);
            HitGroup { distance, key: (0, u64::from(root)) }
        }
        None => HitGroup {
            distance: hit.distance,
            key: (1, hit.index as u64),
        },
    };
    hits.sort_by(|a, b| compare_grouped(a, &group(a), b, &group(b)));
}

#[derive(Debug, Clone, Copy)]
struct HitGroup {
    distance: f32,
    key: (u8, u64),
}

fn compare_grouped(a: &RaycastHit, ga: &HitGroup, b: &RaycastHit, gb: &HitGroup) -> Ordering {
    b.context_priority
        .cmp(&a.context_priority)
        .then(b.sorting_layer.cmp(&a.sorting_layer))
        .then(b.sorting_order.cmp(&a.sorting_order))
        .then(ga.distance.total_cmp(&gb.distance))
        .then(ga.key.cmp(&gb.key))
        .then(b.depth.cmp(&a.depth))
        .then(a.distance.total_cmp(&b.distance))
        .then(a.index.cmp(&b.index))
}

/// Casts interactor rays against the scene.
#[derive(Debug, Default)]
pub struct RayHitTester {
    config: HitTesterConfig,
    surfaces: Vec<GraphicSurface>,
    physics: Vec<PhysicsHit>,
}

impl RayHitTester {
    /// Tester with `config` and no surfaces.
    pub fn new(config: HitTesterConfig) -> Self {
        Self {
            config,
            surfaces: Vec::new(),
            physics: Vec::new(),
        }
    }

    /// Current settings.
    pub fn config(&self) -> &HitTesterConfig {
        &self.config
    }

    /// Add a surface, replacing any previous surface on the same object.
    pub fn add_surface(&mut self, surface: GraphicSurface) {
        self.surfaces.retain(|s| s.object != surface.object);
        self.surfaces.push(surface);
    }

    /// Remove the surface on `object`.
    pub fn remove_surface(&mut self, object: ObjectId) -> bool {
        let before = self.surfaces.len();
        self.surfaces.retain(|s| s.object != object);
        before != self.surfaces.len()
    }

    /// Registered surfaces.
    pub fn surfaces(&self) -> &[GraphicSurface] {
        &self.surfaces
    }

    /// Forget surfaces whose object vanished.
    pub fn prune(&mut self, scene: &Scene) {
        self.surfaces.retain(|s| scene.contains(s.object));
    }

    /// Cast `ray` and write the ordered candidates into `out` (cleared first).
    pub fn cast(
        &mut self,
        ray: &Ray,
        camera: &Camera,
        scene: &Scene,
        registry: &InteractableRegistry,
        out: &mut Vec<RaycastHit>,
    ) {
        out.clear();
        self.cast_graphics(ray, camera, scene, registry, out);
        self.cast_physics(ray, camera, scene, registry, out);
        sort_hits(out);
        trace!(hits = out.len(), "ray cast");
    }

    /// Cast `ray` and return only the first hit.
    pub fn first_hit(
        &mut self,
        ray: &Ray,
        camera: &Camera,
        scene: &Scene,
        registry: &InteractableRegistry,
    ) -> Option<RaycastHit> {
        let mut hits = Vec::new();
        self.cast(ray, camera, scene, registry, &mut hits);
        hits.into_iter().next()
    }

    fn cast_graphics(
        &self,
        ray: &Ray,
        camera: &Camera,
        scene: &Scene,
        registry: &InteractableRegistry,
        out: &mut Vec<RaycastHit>,
    ) {
        for surface in &self.surfaces {
            if !surface.raycast_target || !scene.is_active_in_hierarchy(surface.object) {
                continue;
            }
            let (Some(pose), Some(scale)) = (scene.world_pose(surface.object), scene.lossy_scale(surface.object))
            else {
                continue;
            };
            let forward = pose.forward();
            let facing = ray.direction.dot(forward);
            if self.config.back_face_culling && facing <= 0.0 {
                continue;
            }
            if facing.abs() < EPSILON {
                continue;
            }
            let distance = (pose.position - ray.origin).dot(forward) / facing;
            if distance < 0.0 || distance > self.config.max_distance || !camera.within_far_clip(distance) {
                continue;
            }
            let point = ray.at(distance);
            let local = pose.inverse_transform_point(point);
            let half = surface.size * 0.5 * scale.abs();
            if local.x.abs() > half.x || local.y.abs() > half.y {
                continue;
            }
            out.push(RaycastHit {
                object: surface.object,
                interactable: registry.owning_interactable(scene, surface.object),
                source: HitSource::Graphic,
                distance,
                point,
                normal: -forward,
                context_priority: surface.context_priority,
                sorting_layer: surface.sorting_layer,
                sorting_order: surface.sorting_order,
                depth: surface.depth,
                root: Some(surface.root),
                index: out.len(),
            });
        }
    }

    fn cast_physics(
        &mut self,
        ray: &Ray,
        camera: &Camera,
        scene: &Scene,
        registry: &InteractableRegistry,
        out: &mut Vec<RaycastHit>,
    ) {
        scene.raycast(ray, self.config.max_distance, self.config.layer_mask, &mut self.physics);
        for hit in &self.physics {
            let Some(owner) = registry.owning_interactable(scene, hit.object) else {
                continue;
            };
            if !camera.within_far_clip(hit.distance) {
                continue;
            }
            out.push(RaycastHit {
                object: hit.object,
                interactable: Some(owner),
                source: HitSource::Physics,
                distance: hit.distance,
                point: hit.point,
                normal: hit.normal,
                context_priority: camera.depth,
                sorting_layer: 0,
                sorting_order: 0,
                depth: 0,
                root: None,
                index: out.len(),
            });
        }
    }
}
