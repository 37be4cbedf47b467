//! Run summaries exported as JSON next to the event log.

use crate::{lifecycle_label, pointer_label};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use xrinteract_interaction::{InteractionEvent, Modality, PointerEvent};

/// Aggregate counts for one headless run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier.
    pub name: String,
    /// Render frames executed.
    pub frames: u64,
    /// Physics steps executed.
    pub physics_steps: u64,
    /// Event counts keyed by label.
    pub counts: BTreeMap<String, u64>,
    /// Modality active at the end of the run.
    pub final_modality: Modality,
    /// Platform requests emitted.
    pub requests: u64,
}

impl RunSummary {
    /// Empty summary.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Count a pointer event.
    pub fn record_pointer(&mut self, event: &PointerEvent) {
        *self.counts.entry(pointer_label(event.kind).to_owned()).or_default() += 1;
    }

    /// Count a lifecycle notification.
    pub fn record_lifecycle(&mut self, event: &InteractionEvent) {
        *self.counts.entry(lifecycle_label(event).to_owned()).or_default() += 1;
    }

    /// Count for `label`, zero when never seen.
    pub fn count(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
