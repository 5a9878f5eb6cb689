//! Service layer for separated concerns
//!
//! Reporting lives here so the controller stays free of presentation logic.

pub mod progress;

pub use progress::{
    CompositeReporter, ConsoleReporter, MemoryReporter, NoOpReporter, WorkflowEvent,
    WorkflowReporter,
};
