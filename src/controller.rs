//! Image workflow controller
//!
//! [`ImageWorkflowController`] is the only code that mutates the
//! [`EditSession`]. The session lives in a `tokio::sync::watch` channel:
//! commands mutate it in place and publish a new snapshot, frontends read
//! snapshots through [`snapshot`](ImageWorkflowController::snapshot) or a
//! [`subscribe`](ImageWorkflowController::subscribe)d receiver.
//!
//! Commands never block. `start_removal` flips the session to `InFlight`
//! synchronously and spawns a single task that calls the removal service and
//! applies the result when it arrives. Each accepted request gets a fresh
//! [`RequestToken`]; `select_image` and `reset` clear the active token, so a
//! completion that arrives afterwards is dropped without touching the session.

use crate::{
    config::WorkflowConfig,
    error::{BackZapError, Result},
    export::{ExportReceipt, ExportService},
    library::ResultLibrary,
    removal::BackgroundRemovalService,
    services::{NoOpReporter, WorkflowEvent, WorkflowReporter},
    session::{CompletionDisposition, EditSession},
    tracing_config::spans,
    types::{ExportKind, ImageRef, RequestToken},
};
use instant::Instant;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

/// Handle to the task applying one removal result
#[derive(Debug)]
pub struct RemovalHandle {
    token: RequestToken,
    join: JoinHandle<CompletionDisposition>,
}

impl RemovalHandle {
    #[must_use]
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Wait until the result has been applied or discarded
    ///
    /// Dropping the handle instead leaves the task running detached.
    ///
    /// # Errors
    /// - The completion task panicked or was aborted
    pub async fn settled(self) -> Result<CompletionDisposition> {
        self.join
            .await
            .map_err(|e| BackZapError::internal(format!("Removal task for {} failed: {}", self.token, e)))
    }
}

/// Everything the completion task needs, shared with the controller
#[derive(Clone)]
struct CompletionContext {
    state: Arc<watch::Sender<EditSession>>,
    service: Arc<dyn BackgroundRemovalService>,
    reporter: Arc<dyn WorkflowReporter>,
    library: Option<Arc<Mutex<ResultLibrary>>>,
    auto_save: bool,
    timeout: Option<Duration>,
}

/// Sole owner and mutator of the edit session
pub struct ImageWorkflowController {
    ctx: CompletionContext,
    next_token: AtomicU64,
}

impl ImageWorkflowController {
    /// Create a controller with a fresh session
    #[must_use]
    pub fn new(service: Arc<dyn BackgroundRemovalService>, config: &WorkflowConfig) -> Self {
        let (state, _) = watch::channel(EditSession::new());
        Self {
            ctx: CompletionContext {
                state: Arc::new(state),
                service,
                reporter: Arc::new(NoOpReporter),
                library: None,
                auto_save: false,
                timeout: config.removal_timeout(),
            },
            next_token: AtomicU64::new(0),
        }
    }

    /// Send workflow events to `reporter`
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn WorkflowReporter>) -> Self {
        self.ctx.reporter = reporter;
        self
    }

    /// Attach a results library; with `auto_save` every applied success is added
    #[must_use]
    pub fn with_library(mut self, library: Arc<Mutex<ResultLibrary>>, auto_save: bool) -> Self {
        self.ctx.library = Some(library);
        self.ctx.auto_save = auto_save;
        self
    }

    /// Current session snapshot
    #[must_use]
    pub fn snapshot(&self) -> EditSession {
        self.ctx.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<EditSession> {
        self.ctx.state.subscribe()
    }

    /// Select a new source image, discarding any previous result
    ///
    /// An in-flight request for the previous image becomes stale.
    pub fn select_image(&self, image: ImageRef) {
        self.ctx.state.send_modify(|session| {
            if let Some(abandoned) = session.active_request() {
                debug!(token = %abandoned, "Abandoning in-flight removal for new image");
            }
            session.select_image(image.clone());
            debug_assert!(session.check_invariants().is_ok());
        });
        info!(image = %image, "Image selected");
        self.ctx.reporter.report(&WorkflowEvent::ImageSelected { image });
    }

    /// Return to the initial state, abandoning any in-flight request
    pub fn reset(&self) {
        self.ctx.state.send_modify(|session| {
            if let Some(abandoned) = session.active_request() {
                debug!(token = %abandoned, "Abandoning in-flight removal on reset");
            }
            session.reset();
        });
        info!("Session reset");
        self.ctx.reporter.report(&WorkflowEvent::SessionReset);
    }

    /// Start background removal for the current source image
    ///
    /// # Errors
    /// - `BackZapError::NoSourceImage` when no image is selected
    /// - `BackZapError::RemovalInFlight` when a request is already outstanding
    /// - `BackZapError::Internal` when called outside a Tokio runtime
    ///
    /// All of them leave the session unchanged and publish nothing.
    pub fn start_removal(&self) -> Result<RemovalHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BackZapError::internal(format!("No runtime to run the removal on: {}", e)))?;
        let token = RequestToken(self.next_token.fetch_add(1, Ordering::SeqCst) + 1);

        let mut begun = Err(BackZapError::NoSourceImage);
        self.ctx.state.send_if_modified(|session| {
            begun = session.begin_removal(token);
            debug_assert!(session.check_invariants().is_ok());
            begun.is_ok()
        });
        let image = begun.map_err(|e| {
            debug!(error = %e, "start_removal ignored");
            e
        })?;

        info!(token = %token, image = %image, service = %self.ctx.service.name(), "Removal started");
        self.ctx.reporter.report(&WorkflowEvent::RemovalStarted {
            token,
            image: image.clone(),
        });

        let span = spans::removal(token, &image);
        let join = runtime.spawn(run_removal(self.ctx.clone(), token, image).instrument(span));
        Ok(RemovalHandle { token, join })
    }

    /// Flip the full-screen original preview over the comparison view
    ///
    /// Returns the new overlay state.
    ///
    /// # Errors
    /// - `BackZapError::ComparisonNotVisible` unless a result is being compared
    pub fn toggle_original_overlay(&self) -> Result<bool> {
        let mut toggled = Err(BackZapError::ComparisonNotVisible);
        self.ctx.state.send_if_modified(|session| {
            toggled = session.toggle_original_overlay();
            toggled.is_ok()
        });
        let shown = toggled?;
        debug!(shown, "Original overlay toggled");
        self.ctx.reporter.report(&WorkflowEvent::OverlayToggled { shown });
        Ok(shown)
    }

    /// Hand the processed result to an export collaborator
    ///
    /// The session is not modified, whatever the export outcome.
    ///
    /// # Errors
    /// - `BackZapError::NoResultImage` unless the session is `Completed`
    /// - Errors reported by the exporter
    pub async fn export(&self, kind: ExportKind, exporter: &dyn ExportService) -> Result<ExportReceipt> {
        let result_image = self
            .snapshot()
            .result_image()
            .cloned()
            .ok_or(BackZapError::NoResultImage)?;

        let span = spans::export(&kind.to_string(), &result_image);
        match exporter.export(kind, &result_image).instrument(span).await {
            Ok(receipt) => {
                info!(kind = %kind, destination = %receipt.destination.display(), "Result exported");
                self.ctx.reporter.report(&WorkflowEvent::Exported {
                    kind,
                    destination: receipt.destination.clone(),
                });
                Ok(receipt)
            },
            Err(e) => {
                warn!(kind = %kind, error = %e, "Export failed");
                Err(e)
            },
        }
    }
}

/// Call the service and apply the outcome if `token` is still active
async fn run_removal(ctx: CompletionContext, token: RequestToken, image: ImageRef) -> CompletionDisposition {
    let started = Instant::now();
    let call = ctx.service.remove(&image);
    let outcome = match ctx.timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(BackZapError::Timeout(limit))),
        None => call.await,
    };
    let elapsed = started.elapsed();

    let processed = outcome.as_ref().ok().map(|output| output.processed_image.clone());
    let applied_outcome = outcome
        .map(|output| output.processed_image)
        .map_err(|e| e.retry_message());
    let failure = applied_outcome.as_ref().err().cloned();

    let mut disposition = CompletionDisposition::Stale;
    ctx.state.send_if_modified(|session| {
        disposition = session.complete(token, applied_outcome);
        debug_assert!(session.check_invariants().is_ok());
        disposition.is_applied()
    });

    match (disposition, processed) {
        (CompletionDisposition::Completed, Some(processed)) => {
            let elapsed_ms = elapsed.as_millis() as u64;
            info!(elapsed_ms, processed = %processed, "Removal completed");
            ctx.reporter.report(&WorkflowEvent::RemovalCompleted {
                token,
                processed: processed.clone(),
                elapsed_ms,
            });
            if ctx.auto_save {
                auto_save(&ctx, image, processed, elapsed);
            }
        },
        (CompletionDisposition::Failed, _) => {
            let error = failure.unwrap_or_default();
            warn!(error = %error, "Removal failed");
            ctx.reporter.report(&WorkflowEvent::RemovalFailed { token, error });
        },
        _ => {
            debug!("{}", BackZapError::StaleCompletion(token.0));
            ctx.reporter
                .report(&WorkflowEvent::StaleCompletionDiscarded { token });
        },
    }

    disposition
}

fn auto_save(ctx: &CompletionContext, original: ImageRef, processed: ImageRef, elapsed: Duration) {
    let Some(library) = &ctx.library else {
        return;
    };
    match library.lock() {
        Ok(mut library) => {
            let entry_id = library.add(original, processed, elapsed);
            debug!(entry_id, "Result auto-saved to library");
            ctx.reporter.report(&WorkflowEvent::ResultSaved { entry_id });
        },
        Err(e) => warn!(error = %e, "Library lock poisoned, result not saved"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::{InstantRemovalService, ScriptedRemovalService};
    use crate::types::ProcessingStatus;

    fn controller_with(service: Arc<dyn BackgroundRemovalService>) -> ImageWorkflowController {
        ImageWorkflowController::new(service, &WorkflowConfig::default())
    }

    #[tokio::test]
    async fn test_start_without_image_is_ignored() {
        let service = Arc::new(InstantRemovalService::succeeding());
        let controller = controller_with(service.clone());
        let mut updates = controller.subscribe();

        assert!(matches!(controller.start_removal(), Err(BackZapError::NoSourceImage)));
        assert!(controller.snapshot().is_initial());
        assert!(!updates.has_changed().unwrap());
        assert_eq!(service.call_count(), 0);
    }

    #[test]
    fn test_start_outside_runtime_is_rejected() {
        let service = Arc::new(InstantRemovalService::succeeding());
        let controller = controller_with(service.clone());
        controller.select_image(ImageRef::new("img1"));
        let mut updates = controller.subscribe();

        assert!(matches!(controller.start_removal(), Err(BackZapError::Internal(_))));
        let session = controller.snapshot();
        assert_eq!(session.processing_status(), ProcessingStatus::Idle);
        assert_eq!(session.active_request(), None);
        assert!(!updates.has_changed().unwrap());
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_success_applies_result() {
        let (service, mut requests) = ScriptedRemovalService::new();
        let controller = controller_with(Arc::new(service));

        controller.select_image(ImageRef::new("img1"));
        let handle = controller.start_removal().unwrap();
        assert_eq!(controller.snapshot().processing_status(), ProcessingStatus::InFlight);

        requests.recv().await.unwrap().succeed("img1_result");
        assert_eq!(handle.settled().await.unwrap(), CompletionDisposition::Completed);

        let session = controller.snapshot();
        assert_eq!(session.processing_status(), ProcessingStatus::Completed);
        assert_eq!(session.result_image(), Some(&ImageRef::new("img1_result")));
        assert!(session.comparison_visible());
    }

    #[tokio::test]
    async fn test_toggle_before_completion_is_rejected() {
        let controller = controller_with(Arc::new(InstantRemovalService::succeeding()));
        controller.select_image(ImageRef::new("a"));
        assert!(matches!(
            controller.toggle_original_overlay(),
            Err(BackZapError::ComparisonNotVisible)
        ));
        assert!(!controller.snapshot().original_overlay_shown());
    }

    #[tokio::test]
    async fn test_export_requires_completed_result() {
        let controller = controller_with(Arc::new(InstantRemovalService::succeeding()));
        let exporter = crate::export::FileExporter::new("/nonexistent/dl", "/nonexistent/share").unwrap();
        let result = controller.export(ExportKind::Download, &exporter).await;
        assert!(matches!(result, Err(BackZapError::NoResultImage)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_resolves_to_failed() {
        let (service, mut requests) = ScriptedRemovalService::new();
        let config = WorkflowConfig::builder()
            .removal_timeout(Some(Duration::from_secs(5)))
            .build()
            .unwrap();
        let controller = ImageWorkflowController::new(Arc::new(service), &config);

        controller.select_image(ImageRef::new("slow.jpg"));
        let handle = controller.start_removal().unwrap();
        let _pending = requests.recv().await.unwrap();

        assert_eq!(handle.settled().await.unwrap(), CompletionDisposition::Failed);
        let session = controller.snapshot();
        assert_eq!(session.processing_status(), ProcessingStatus::Failed);
        assert_eq!(session.last_error(), Some("timed out after 5.0s"));
    }
}
