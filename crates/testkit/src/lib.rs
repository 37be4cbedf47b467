#![warn(missing_docs)]
//! Deterministic testing surfaces: JSONL event log, recording handlers and
//! a standard interaction scene.

mod fixture;
mod recorder;
mod summary;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use xrinteract_core::SimTick;
use xrinteract_interaction::{InteractionEvent, PointerEvent, PointerEventKind};

pub use fixture::*;
pub use recorder::*;
pub use summary::*;

/// Primary event record captured by headless runs.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Render tick when the event occurred.
    pub tick: SimTick,
    /// Session time in seconds.
    pub time: f64,
    /// Kind label.
    pub kind: &'a str,
    /// Event body.
    pub payload: Value,
}

impl EventRecord<'static> {
    /// Record for a pointer event.
    pub fn pointer(tick: SimTick, time: f64, event: &PointerEvent) -> Result<Self> {
        Ok(Self {
            tick,
            time,
            kind: pointer_label(event.kind),
            payload: serde_json::to_value(event)?,
        })
    }

    /// Record for a lifecycle notification.
    pub fn lifecycle(tick: SimTick, time: f64, event: &InteractionEvent) -> Result<Self> {
        Ok(Self {
            tick,
            time,
            kind: lifecycle_label(event),
            payload: serde_json::to_value(event)?,
        })
    }
}

/// Stable label for a pointer event kind.
pub fn pointer_label(kind: PointerEventKind) -> &'static str {
    match kind {
        PointerEventKind::Enter => "pointer_enter",
        PointerEventKind::Exit => "pointer_exit",
        PointerEventKind::Hover => "pointer_hover",
        PointerEventKind::Down => "pointer_down",
        PointerEventKind::Up => "pointer_up",
        PointerEventKind::Click => "pointer_click",
        PointerEventKind::DragBegin => "drag_begin",
        PointerEventKind::Drag => "drag",
        PointerEventKind::DragEnd => "drag_end",
        PointerEventKind::NothingDown => "nothing_down",
    }
}

/// Stable label for a lifecycle notification.
pub fn lifecycle_label(event: &InteractionEvent) -> &'static str {
    match event {
        InteractionEvent::ModalityChanged { .. } => "modality_changed",
        InteractionEvent::SleepChanged { .. } => "sleep_changed",
        InteractionEvent::ConsumerEnabled { .. } => "consumer_enabled",
        InteractionEvent::InteractableStateChanged { .. } => "interactable_state",
        InteractionEvent::HoverBegin { .. } => "hover_begin",
        InteractionEvent::HoverEnd { .. } => "hover_end",
        InteractionEvent::Grabbed { .. } => "grabbed",
        InteractionEvent::Released { .. } => "released",
        InteractionEvent::EaseInCompleted { .. } => "ease_in_completed",
    }
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: BufWriter<File>,
    written: usize,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent directories if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = File::create(path).with_context(|| format!("Failed to create event log {}", path.display()))?;
        tracing::debug!(path = %path.display(), "event log opened");
        Ok(Self {
            file: BufWriter::new(file),
            written: 0,
        })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}
