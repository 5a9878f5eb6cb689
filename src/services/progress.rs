//! Workflow event reporting service
//!
//! This module separates reporting concerns from the workflow controller,
//! allowing different frontends to render notifications their own way.

use crate::types::{ExportKind, ImageRef, RequestToken};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Events emitted by the workflow controller
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// A new source image was selected (prior results discarded)
    ImageSelected { image: ImageRef },
    /// A removal request was accepted and dispatched
    RemovalStarted { token: RequestToken, image: ImageRef },
    /// The active request completed successfully
    RemovalCompleted {
        token: RequestToken,
        processed: ImageRef,
        elapsed_ms: u64,
    },
    /// The active request failed
    RemovalFailed { token: RequestToken, error: String },
    /// A completion arrived for a superseded request and was dropped
    StaleCompletionDiscarded { token: RequestToken },
    /// The full-screen original preview was toggled
    OverlayToggled { shown: bool },
    /// The session returned to its initial state
    SessionReset,
    /// A completed result was auto-saved to the library
    ResultSaved { entry_id: u64 },
    /// A completed result was exported
    Exported { kind: ExportKind, destination: PathBuf },
}

impl WorkflowEvent {
    /// Get a human-readable description of the event
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            WorkflowEvent::ImageSelected { .. } => "Image selected",
            WorkflowEvent::RemovalStarted { .. } => "Removing background",
            WorkflowEvent::RemovalCompleted { .. } => "Background removed",
            WorkflowEvent::RemovalFailed { .. } => "Background removal failed",
            WorkflowEvent::StaleCompletionDiscarded { .. } => "Discarded stale completion",
            WorkflowEvent::OverlayToggled { .. } => "Toggled original preview",
            WorkflowEvent::SessionReset => "Session reset",
            WorkflowEvent::ResultSaved { .. } => "Saved to library",
            WorkflowEvent::Exported { .. } => "Exported result",
        }
    }

    /// Whether the event is worth a user-facing notification
    #[must_use]
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            WorkflowEvent::RemovalCompleted { .. }
                | WorkflowEvent::RemovalFailed { .. }
                | WorkflowEvent::ResultSaved { .. }
                | WorkflowEvent::Exported { .. }
        )
    }
}

/// Trait for reporting workflow events
pub trait WorkflowReporter: Send + Sync {
    /// Report a workflow event
    fn report(&self, event: &WorkflowEvent);
}

/// No-op reporter that discards all events
pub struct NoOpReporter;

impl WorkflowReporter for NoOpReporter {
    fn report(&self, _event: &WorkflowEvent) {
        // Intentionally empty
    }
}

/// Console reporter that logs events
///
/// Notifications (completion, failure, saves, exports) are logged at info
/// level only while `notifications` is enabled; everything else goes to debug.
pub struct ConsoleReporter {
    notifications: bool,
}

impl ConsoleReporter {
    #[must_use]
    pub fn new(notifications: bool) -> Self {
        Self { notifications }
    }
}

impl WorkflowReporter for ConsoleReporter {
    fn report(&self, event: &WorkflowEvent) {
        if !(self.notifications && event.is_notification()) {
            log::debug!("{}: {:?}", event.description(), event);
            return;
        }

        match event {
            WorkflowEvent::RemovalCompleted { processed, elapsed_ms, .. } => {
                log::info!("✅ Background removed in {}ms: {}", elapsed_ms, processed);
            },
            WorkflowEvent::RemovalFailed { error, .. } => {
                log::error!("❌ Background removal failed: {} (retry or pick another photo)", error);
            },
            WorkflowEvent::ResultSaved { entry_id } => {
                log::info!("💾 Saved to library as #{}", entry_id);
            },
            WorkflowEvent::Exported { kind, destination } => {
                log::info!("📤 Exported ({}) to {}", kind, destination.display());
            },
            other => log::info!("{}", other.description()),
        }
    }
}

/// Reporter that keeps every event in memory
///
/// Useful for frontends that poll for notifications and for tests.
#[derive(Clone, Default)]
pub struct MemoryReporter {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl MemoryReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Remove and return the recorded events
    pub fn drain(&self) -> Vec<WorkflowEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    /// Number of recorded events matching `predicate`
    pub fn count<F: Fn(&WorkflowEvent) -> bool>(&self, predicate: F) -> usize {
        self.events
            .lock()
            .map(|e| e.iter().filter(|event| predicate(event)).count())
            .unwrap_or(0)
    }
}

impl WorkflowReporter for MemoryReporter {
    fn report(&self, event: &WorkflowEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fan an event out to several reporters
pub struct CompositeReporter {
    reporters: Vec<Arc<dyn WorkflowReporter>>,
}

impl CompositeReporter {
    #[must_use]
    pub fn new(reporters: Vec<Arc<dyn WorkflowReporter>>) -> Self {
        Self { reporters }
    }
}

impl WorkflowReporter for CompositeReporter {
    fn report(&self, event: &WorkflowEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}
