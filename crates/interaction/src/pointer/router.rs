//! Typed delivery of pointer events to handlers on scene objects.

use super::{PointerEvent, PointerEventKind};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use xrinteract_core::ObjectId;
use xrinteract_physics::Scene;

bitflags! {
    /// Event kinds a handler wants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct HandlerCapabilities: u16 {
        /// Enter.
        const ENTER = 1 << 0;
        /// Exit.
        const EXIT = 1 << 1;
        /// Hover.
        const HOVER = 1 << 2;
        /// Down.
        const DOWN = 1 << 3;
        /// Up.
        const UP = 1 << 4;
        /// Click.
        const CLICK = 1 << 5;
        /// DragBegin.
        const DRAG_BEGIN = 1 << 6;
        /// Drag.
        const DRAG = 1 << 7;
        /// DragEnd.
        const DRAG_END = 1 << 8;
        /// NothingDown.
        const NOTHING_DOWN = 1 << 9;
        /// Enter and Exit.
        const HOVER_EDGES = Self::ENTER.bits() | Self::EXIT.bits();
        /// DragBegin, Drag and DragEnd.
        const DRAGGING = Self::DRAG_BEGIN.bits() | Self::DRAG.bits() | Self::DRAG_END.bits();
    }
}

impl HandlerCapabilities {
    /// Capability required to receive `kind`.
    pub fn for_kind(kind: PointerEventKind) -> Self {
        match kind {
            PointerEventKind::Enter => Self::ENTER,
            PointerEventKind::Exit => Self::EXIT,
            PointerEventKind::Hover => Self::HOVER,
            PointerEventKind::Down => Self::DOWN,
            PointerEventKind::Up => Self::UP,
            PointerEventKind::Click => Self::CLICK,
            PointerEventKind::DragBegin => Self::DRAG_BEGIN,
            PointerEventKind::Drag => Self::DRAG,
            PointerEventKind::DragEnd => Self::DRAG_END,
            PointerEventKind::NothingDown => Self::NOTHING_DOWN,
        }
    }
}

/// Receiver of pointer events.
pub trait PointerEventHandler {
    /// Kinds this handler accepts.
    fn capabilities(&self) -> HandlerCapabilities;

    /// Handle one event. Only called for kinds in [`PointerEventHandler::capabilities`].
    fn handle(&mut self, event: &PointerEvent);
}

/// Handlers attached to objects plus global listeners.
#[derive(Default)]
pub struct EventRouter {
    handlers: BTreeMap<ObjectId, Vec<Box<dyn PointerEventHandler>>>,
    listeners: Vec<Box<dyn PointerEventHandler>>,
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("objects", &self.handlers.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventRouter {
    /// Empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `handler` to `object`.
    pub fn add_handler(&mut self, object: ObjectId, handler: Box<dyn PointerEventHandler>) {
        self.handlers.entry(object).or_default().push(handler);
    }

    /// Detach every handler of `object`.
    pub fn remove_handlers(&mut self, object: ObjectId) -> bool {
        self.handlers.remove(&object).is_some()
    }

    /// Add an app-level listener that sees every broadcast event.
    pub fn add_listener(&mut self, listener: Box<dyn PointerEventHandler>) {
        self.listeners.push(listener);
    }

    /// Drop handlers of objects that no longer exist.
    pub fn prune(&mut self, scene: &Scene) {
        self.handlers.retain(|object, _| scene.contains(*object));
    }

    /// Deliver `event`.
    ///
    /// The target and then its ancestors are searched for the first object
    /// with a handler that accepts the kind; every accepting handler on that
    /// object receives it. With `broadcast`, listeners receive it too.
    /// Returns the object that handled it.
    pub fn dispatch(&mut self, scene: &Scene, event: &PointerEvent, broadcast: bool) -> Option<ObjectId> {
        let wanted = HandlerCapabilities::for_kind(event.kind);
        let mut handled_by = None;

        if let Some(target) = event.target {
            let receiver = scene.ancestors(target).into_iter().find(|candidate| {
                self.handlers
                    .get(candidate)
                    .is_some_and(|hs| hs.iter().any(|h| h.capabilities().contains(wanted)))
            });
            if let Some(object) = receiver {
                if let Some(handlers) = self.handlers.get_mut(&object) {
                    for handler in handlers.iter_mut().filter(|h| h.capabilities().contains(wanted)) {
                        handler.handle(event);
                    }
                }
                handled_by = Some(object);
            }
        }

        if broadcast {
            for listener in self.listeners.iter_mut().filter(|l| l.capabilities().contains(wanted)) {
                listener.handle(event);
            }
        }
        handled_by
    }
}
