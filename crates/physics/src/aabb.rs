//! Axis-aligned bounding boxes.

use glam::Vec3;

/// Axis-aligned bounding box used for collisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB ensuring min <= max per axis.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(min.cmple(max).all());
        Self { min, max }
    }

    /// Box centred on `center` extending `half_extents` along each axis.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Tests intersection with another AABB.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Whether `point` lies inside or on the boundary.
    pub fn contains(&self, point: Vec3) -> bool {
        self.min.cmple(point).all() && self.max.cmpge(point).all()
    }

    /// Closest point of the box to `point`.
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    /// Whether a sphere touches the box.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.closest_point(center).distance_squared(center) <= radius * radius
    }

    /// Slab test. Returns the entry distance and the outward face normal.
    ///
    /// Rays starting inside the box report no hit, matching how engine
    /// raycasts ignore colliders that contain the origin.
    pub fn ray_intersection(&self, origin: Vec3, dir: Vec3) -> Option<(f32, Vec3)> {
        let inv_dir = dir.recip();

        let t1 = (self.min - origin) * inv_dir;
        let t2 = (self.max - origin) * inv_dir;
        let near = t1.min(t2);
        let far = t1.max(t2);

        let tmin = near.max_element();
        let tmax = far.min_element();

        if tmax < 0.0 || tmin > tmax || tmin < 0.0 || tmin.is_nan() {
            return None;
        }

        let normal = if near.x >= near.y && near.x >= near.z {
            Vec3::new(-dir.x.signum(), 0.0, 0.0)
        } else if near.y >= near.z {
            Vec3::new(0.0, -dir.y.signum(), 0.0)
        } else {
            Vec3::new(0.0, 0.0, -dir.z.signum())
        };

        Some((tmin, normal))
    }
}
