//! Rigid poses and rays.

use crate::EPSILON;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position + orientation in some space (world, or relative to a parent).
///
/// Forward is `+Z` in the pose's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Translation.
    pub position: Vec3,
    /// Orientation (unit quaternion).
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// Origin, no rotation.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a pose.
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pure translation.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Compose: `self` is the parent frame, `local` is expressed in it.
    pub fn mul_pose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.position + self.rotation * local.position,
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }

    /// Inverse transform.
    pub fn inverse(&self) -> Pose {
        let inv = self.rotation.inverse();
        Pose {
            position: inv * -self.position,
            rotation: inv,
        }
    }

    /// Express `world` relative to this pose.
    pub fn relative(&self, world: &Pose) -> Pose {
        self.inverse().mul_pose(world)
    }

    /// Map a local point into the parent space.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    /// Map a parent-space point into this pose's local frame.
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.position)
    }

    /// Local `+Z` in the parent space.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Interpolate position linearly and rotation spherically.
    pub fn interpolate(&self, to: &Pose, t: f32) -> Pose {
        Pose {
            position: self.position.lerp(to.position, t),
            rotation: self.rotation.slerp(to.rotation, t).normalize(),
        }
    }
}

/// A half-line used for pointing. The direction is always unit length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray, returning `None` for a zero-length or non-finite direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        if !origin.is_finite() || !direction.is_finite() {
            return None;
        }
        let len = direction.length();
        if len <= EPSILON {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / len,
        })
    }

    /// Ray starting at the pose origin and pointing along its forward axis.
    pub fn from_pose(pose: &Pose) -> Option<Self> {
        Self::new(pose.position, pose.forward())
    }

    /// Point at parameter `t` along the ray.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_rays_are_rejected() {
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
        assert!(Ray::new(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 1.0)).is_none());
        assert!(Ray::new(Vec3::splat(f32::INFINITY), Vec3::Z).is_none());
    }

    #[test]
    fn ray_direction_is_normalized() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0)).unwrap();
        assert!((ray.direction.length() - 1.0).abs() < 1e-6);
        assert!((ray.at(2.0) - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-6);
    }

    #[test]
    fn relative_then_compose_is_identity() {
        let parent = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let world = Pose::new(Vec3::new(-4.0, 0.5, 2.0), Quat::from_rotation_x(0.3));
        let local = parent.relative(&world);
        let back = parent.mul_pose(&local);
        assert!((back.position - world.position).length() < 1e-5);
        assert!(back.rotation.angle_between(world.rotation) < 1e-4);
    }

    #[test]
    fn inverse_transform_point_undoes_transform() {
        let pose = Pose::new(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_z(1.0));
        let p = Vec3::new(0.3, -0.2, 0.9);
        let q = pose.inverse_transform_point(pose.transform_point(p));
        assert!((p - q).length() < 1e-5);
    }
}
