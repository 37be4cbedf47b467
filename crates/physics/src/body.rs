//! Collider and rigidbody components.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Collision-detection mode of a rigidbody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionMode {
    /// Per-step overlap tests.
    #[default]
    Discrete,
    /// Swept against static geometry.
    Continuous,
    /// Swept against static and dynamic geometry.
    ContinuousDynamic,
    /// Speculative contacts; the only continuous mode kinematic bodies support.
    ContinuousSpeculative,
}

impl CollisionMode {
    /// Whether a kinematic body can keep this mode.
    pub fn allowed_for_kinematic(self) -> bool {
        matches!(
            self,
            CollisionMode::Discrete | CollisionMode::ContinuousSpeculative
        )
    }
}

/// Dynamic state of a simulated object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rigidbody {
    /// World-space linear velocity (m/s).
    pub velocity: Vec3,
    /// World-space angular velocity (rad/s, axis * rate).
    pub angular_velocity: Vec3,
    /// Kinematic bodies are moved by code only; the integrator skips them.
    pub is_kinematic: bool,
    /// Whether gravity accelerates the body.
    pub use_gravity: bool,
    /// Collision-detection mode.
    pub collision_mode: CollisionMode,
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            is_kinematic: false,
            use_gravity: true,
            collision_mode: CollisionMode::Discrete,
        }
    }
}

/// Collider geometry in the owning object's local frame (before scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Sphere centred at `center`.
    Sphere {
        /// Local centre.
        center: Vec3,
        /// Radius.
        radius: f32,
    },
    /// Oriented box centred at `center`.
    Box {
        /// Local centre.
        center: Vec3,
        /// Half size along each local axis.
        half_extents: Vec3,
    },
}

/// Collision volume attached to a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    /// Geometry.
    pub shape: ColliderShape,
    /// Layer bit index (0..32) used by query masks.
    pub layer: u8,
    /// Disabled colliders are invisible to queries.
    pub enabled: bool,
}

impl Collider {
    /// Enabled sphere collider on layer 0.
    pub fn sphere(radius: f32) -> Self {
        Self {
            shape: ColliderShape::Sphere {
                center: Vec3::ZERO,
                radius,
            },
            layer: 0,
            enabled: true,
        }
    }

    /// Enabled box collider on layer 0.
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self {
            shape: ColliderShape::Box {
                center: Vec3::ZERO,
                half_extents,
            },
            layer: 0,
            enabled: true,
        }
    }

    /// Same collider on another layer.
    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer.min(31);
        self
    }

    /// Bit used by layer masks.
    pub fn layer_bit(&self) -> u32 {
        1u32 << self.layer.min(31)
    }
}
