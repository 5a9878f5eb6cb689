#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # BackZap
//!
//! Core of a photo background-removal app: the image workflow controller,
//! the edit session it owns, and the collaborators around it.
//!
//! The controller accepts four commands (select an image, start removal,
//! toggle the original overlay, reset) and keeps the session consistent
//! while removal runs asynchronously. Every accepted removal gets a request
//! token; a completion whose token is no longer active is discarded, so a
//! late result can never overwrite a newer selection.
//!
//! ## Features
//!
//! - **Non-blocking commands**: removal runs on a Tokio task, state is published
//!   through a `watch` channel
//! - **Duplicate submission guard**: only one removal request per session at a time
//! - **Stale completion guard**: results for abandoned requests are dropped
//! - **Pluggable removal**: simulated, remote HTTP, or your own
//!   [`BackgroundRemovalService`]
//! - **Results library**: auto-save completed results, storage stats
//! - **Exports**: download to a directory or drop into a share outbox
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use backzap::{
//!     ImageRef, ImageWorkflowController, ProcessingStatus, SimulatedRemovalService,
//!     WorkflowConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = WorkflowConfig::default();
//! let service = Arc::new(SimulatedRemovalService::from_config(&config));
//! let controller = ImageWorkflowController::new(service, &config);
//!
//! controller.select_image(ImageRef::new("photos/portrait.jpg"));
//! let handle = controller.start_removal()?;
//! assert_eq!(controller.snapshot().processing_status(), ProcessingStatus::InFlight);
//!
//! handle.settled().await?;
//! let session = controller.snapshot();
//! if let Some(result) = session.result_image() {
//!     println!("Processed: {}", result);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Observing the session
//!
//! ```rust,no_run
//! # use backzap::ImageWorkflowController;
//! # async fn example(controller: ImageWorkflowController) {
//! let mut updates = controller.subscribe();
//! while updates.changed().await.is_ok() {
//!     let session = updates.borrow_and_update().clone();
//!     println!("{}", session.processing_status());
//! }
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP decoding in the simulated remover
//! - `tracing-json`: JSON log output
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! backzap = { version = "0.1", default-features = false }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod library;
pub mod onboarding;
pub mod removal;
pub mod services;
pub mod session;
pub mod settings;
pub mod tracing_config;
pub mod types;

pub use backends::{RemoteRemovalService, SimulatedRemovalService};
pub use config::{WorkflowConfig, WorkflowConfigBuilder};
pub use controller::{ImageWorkflowController, RemovalHandle};
pub use error::{BackZapError, Result};
pub use export::{ExportReceipt, ExportService, FileExporter};
pub use library::{format_size, LibraryEntry, LibraryStats, ResultLibrary};
pub use onboarding::{OnboardingAction, OnboardingFlow, OnboardingStep};
pub use removal::{BackgroundRemovalService, RemovalOutput};
pub use services::{
    CompositeReporter, ConsoleReporter, MemoryReporter, NoOpReporter, WorkflowEvent,
    WorkflowReporter,
};
pub use session::{CompletionDisposition, EditSession};
pub use settings::{Appearance, Settings};
pub use tracing_config::{TracingConfig, TracingFormat};
pub use types::{ExportKind, ImageRef, ProcessingStatus, RequestToken};

#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;
