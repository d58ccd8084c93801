// crates/storefront-migrate-core/src/runtime/audit.rs
// ============================================================================
// Module: Migration Event Sinks
// Description: JSON-line sinks for structured migration events.
// Purpose: Route page, record, and gate events to stderr, a file, or nowhere.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Sinks serialize each [`MigrationEvent`] as one JSON line. Write failures
//! are dropped so logging can never abort a migration page.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::MigrationEvent;
use crate::interfaces::MigrationEventSink;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Shared event sink handle.
pub type SharedEventSink = Arc<dyn MigrationEventSink>;

/// Event sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl MigrationEventSink for StderrEventSink {
    fn record(&self, event: &MigrationEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl MigrationEventSink for FileEventSink {
    fn record(&self, event: &MigrationEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl MigrationEventSink for NoopEventSink {
    fn record(&self, _event: &MigrationEvent) {}
}

/// Event sink that keeps events in memory for inspection in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryEventSink {
    /// Captured events.
    events: Arc<Mutex<Vec<MigrationEvent>>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the captured events.
    #[must_use]
    pub fn events(&self) -> Vec<MigrationEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the captured event names in order.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl MigrationEventSink for MemoryEventSink {
    fn record(&self, event: &MigrationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
