#![warn(missing_docs)]
//! Event camera used by the hit tester and the mouse modality.
//!
//! The camera follows the head pose. Its far clip bounds graphic-surface
//! hits, its depth ranks hits from different rendering contexts, and
//! `screen_to_ray` turns a 2D cursor into a world ray.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use xrinteract_core::{Pose, Ray};

/// Head-locked event camera. Looks along the pose's `+Z`, up is `+Y`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// World pose (usually the head pose).
    pub pose: Pose,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
    /// Near clipping plane distance.
    pub near: f32,
    /// Far clipping plane distance.
    pub far: f32,
    /// Rendering-context priority; higher depth draws (and hit-tests) on top.
    pub depth: i32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            fov: std::f32::consts::FRAC_PI_3,
            aspect: 16.0 / 9.0,
            near: 0.05,
            far: 100.0,
            depth: 0,
        }
    }
}

impl Camera {
    /// Create a camera at the given pose.
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            ..Default::default()
        }
    }

    /// World position.
    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    /// Viewing direction.
    pub fn forward(&self) -> Vec3 {
        self.pose.forward()
    }

    /// Local `+Y` in world space.
    pub fn up(&self) -> Vec3 {
        self.pose.rotation * Vec3::Y
    }

    /// Screen-right in world space.
    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up()).normalize()
    }

    /// Whether a point `distance` units from the camera is inside the clip range.
    pub fn within_far_clip(&self, distance: f32) -> bool {
        distance <= self.far
    }

    /// Convert a screen position (pixels, origin top-left) into a world ray.
    ///
    /// Returns `None` for an empty viewport.
    pub fn screen_to_ray(&self, screen_pos: Vec2, screen_size: Vec2) -> Option<Ray> {
        if screen_size.x <= 0.0 || screen_size.y <= 0.0 {
            return None;
        }
        // Normalized device coordinates (-1 to 1), y up.
        let x = (2.0 * screen_pos.x) / screen_size.x - 1.0;
        let y = 1.0 - (2.0 * screen_pos.y) / screen_size.y;

        let tan_half = (self.fov * 0.5).tan();
        let dir = self.forward() + self.right() * (x * tan_half * self.aspect) + self.up() * (y * tan_half);
        Ray::new(self.position(), dir)
    }
}
