//! Background removal service implementations
//!
//! This module provides the collaborators the workflow controller can drive:
//! - Simulated service (fixed delay, no model)
//! - Remote service (HTTP endpoint running a segmentation model)
//! - Scripted and instant services for tests

pub mod remote;
pub mod simulated;

// Test doubles, also used by integration tests and benches
pub mod test_utils;

pub use self::remote::RemoteRemovalService;
pub use self::simulated::SimulatedRemovalService;
