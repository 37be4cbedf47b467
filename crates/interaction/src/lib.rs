#![warn(missing_docs)]
//! XR interaction core.
//!
//! Five components, leaf first:
//! - [`registry`]: interactables, their hover/select occupancy and state.
//! - [`raycast`]: ray hit-testing against surfaces and colliders, ranked by a
//!   six-key comparator.
//! - [`pointer`]: per-interactor pointer state machines and typed routing.
//! - [`grab`]: per-hand stacks of grabbed objects, hover search, follow.
//! - [`modality`]: the active-modality arbitrator and enablement rules.
//!
//! [`InteractionContext`] owns all of them for one session. Its render tick
//! and physics tick are separate calls.

pub mod config;
pub mod context;
pub mod events;
pub mod grab;
pub mod modality;
pub mod pointer;
pub mod raycast;
pub mod registry;

pub use config::InteractionConfig;
pub use context::{InteractionContext, RaySource};
pub use events::InteractionEvent;
pub use grab::{GrabEngine, GrabFlags, GrabSettings, GrabType, HandDesc, ReleaseSettings, ReleaseStyle};
pub use modality::{Arbitrator, EnablementRule, Modality, ModalityMask};
pub use pointer::{PointerConfig, PointerEvent, PointerEventHandler, PointerEventKind};
pub use raycast::{GraphicSurface, HitTesterConfig, RayHitTester, RaycastHit};
pub use registry::{InteractableDesc, InteractableRegistry, InteractableState};
