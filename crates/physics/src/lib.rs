#![warn(missing_docs)]
//! Physics primitives (AABB, colliders, rigidbodies) and the scene-object
//! store the interaction core runs against.
//!
//! The scene stands in for the host engine's transform hierarchy and physics
//! world: it owns object lifetimes, parenting, ray and overlap queries, and a
//! fixed-step integrator. Object ids are never reused, so a destroyed object
//! is detected by `Scene::contains` returning `false`.

mod aabb;
mod body;
mod scene;

pub use aabb::Aabb;
pub use body::{Collider, ColliderShape, CollisionMode, Rigidbody};
pub use scene::{ObjectDesc, PhysicsHit, Scene, SceneObject};

use glam::Vec3;

/// Maximum number of hits a single raycast or overlap query reports.
pub const QUERY_BUFFER_CAPACITY: usize = 64;

/// Gravity applied to non-kinematic bodies with `use_gravity` set.
pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
