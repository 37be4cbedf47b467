//! Pointer events: per-interactor state machines and typed delivery.

mod caster;
mod router;

pub use caster::{CasterInput, PointerCaster};
pub use router::{EventRouter, HandlerCapabilities, PointerEventHandler};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use xrinteract_core::{InteractorId, ObjectId};

/// Kind of pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerEventKind {
    /// Hover target acquired.
    Enter,
    /// Hover target lost.
    Exit,
    /// Still hovering (every frame).
    Hover,
    /// Press on a target.
    Down,
    /// Release of a press that never became a drag.
    Up,
    /// Release on the pressed target within the click time.
    Click,
    /// Movement passed the drag threshold.
    DragBegin,
    /// Movement while dragging.
    Drag,
    /// Release (or cancel) while dragging.
    DragEnd,
    /// Press with nothing under the ray.
    NothingDown,
}

/// One event in the pointer stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Kind.
    pub kind: PointerEventKind,
    /// Emitting interactor.
    pub interactor: InteractorId,
    /// Target object; `None` for [`PointerEventKind::NothingDown`].
    pub target: Option<ObjectId>,
    /// World-space point.
    pub world_point: Vec3,
    /// World-space normal.
    pub world_normal: Vec3,
    /// Drag: movement since the previous drag event. DragBegin/DragEnd: since the press.
    pub drag_delta: Vec3,
}

/// Per-caster tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// World distance the pointer must travel while pressed to start a drag.
    pub drag_threshold: f32,
    /// Longest press (seconds) that still counts as a click.
    pub click_time: f32,
    /// Also deliver events to global listeners.
    pub broadcast: bool,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 0.01,
            click_time: 0.5,
            broadcast: true,
        }
    }
}
