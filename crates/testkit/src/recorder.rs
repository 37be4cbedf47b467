//! Handlers that record what they receive, for assertions.

use std::cell::RefCell;
use std::rc::Rc;
use xrinteract_interaction::modality::{ModalityListener, ModalityRequests};
use xrinteract_interaction::pointer::HandlerCapabilities;
use xrinteract_interaction::{Modality, PointerEvent, PointerEventHandler, PointerEventKind};

/// Shared log of pointer events.
pub type PointerLog = Rc<RefCell<Vec<PointerEvent>>>;

/// Pointer handler that appends every accepted event to a shared log.
pub struct EventRecorder {
    capabilities: HandlerCapabilities,
    log: PointerLog,
}

impl EventRecorder {
    /// Recorder accepting every kind. Returns the handler and its log.
    pub fn new() -> (Self, PointerLog) {
        Self::with_capabilities(HandlerCapabilities::all())
    }

    /// Recorder accepting only `capabilities`.
    pub fn with_capabilities(capabilities: HandlerCapabilities) -> (Self, PointerLog) {
        let log = PointerLog::default();
        (
            Self {
                capabilities,
                log: Rc::clone(&log),
            },
            log,
        )
    }
}

impl PointerEventHandler for EventRecorder {
    fn capabilities(&self) -> HandlerCapabilities {
        self.capabilities
    }

    fn handle(&mut self, event: &PointerEvent) {
        self.log.borrow_mut().push(*event);
    }
}

/// Kinds in `log`, skipping the per-frame Hover.
pub fn kinds_without_hover(log: &PointerLog) -> Vec<PointerEventKind> {
    log.borrow()
        .iter()
        .map(|e| e.kind)
        .filter(|k| *k != PointerEventKind::Hover)
        .collect()
}

/// Modality listener that records every transition.
pub struct ModalityRecorder {
    log: Rc<RefCell<Vec<(Modality, Modality)>>>,
}

impl ModalityRecorder {
    /// Recorder and its shared log.
    pub fn new() -> (Self, Rc<RefCell<Vec<(Modality, Modality)>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (Self { log: Rc::clone(&log) }, log)
    }
}

impl ModalityListener for ModalityRecorder {
    fn modality_changed(&mut self, from: Modality, to: Modality, _requests: &mut ModalityRequests) {
        self.log.borrow_mut().push((from, to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use xrinteract_core::{InteractorId, ObjectId};

    #[test]
    fn recorder_shares_its_log() {
        let (mut recorder, log) = EventRecorder::with_capabilities(HandlerCapabilities::CLICK);
        assert_eq!(recorder.capabilities(), HandlerCapabilities::CLICK);
        recorder.handle(&PointerEvent {
            kind: PointerEventKind::Click,
            interactor: InteractorId(0),
            target: Some(ObjectId(1)),
            world_point: Vec3::ZERO,
            world_normal: Vec3::ZERO,
            drag_delta: Vec3::ZERO,
        });
        assert_eq!(kinds_without_hover(&log), vec![PointerEventKind::Click]);
    }
}
