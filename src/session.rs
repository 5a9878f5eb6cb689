//! Edit session state
//!
//! [`EditSession`] is the single record describing the image currently being
//! edited. Its fields are private and every transition lives here as a
//! crate-internal method, so the only way to change a session from outside the
//! crate is through [`crate::controller::ImageWorkflowController`]. Frontends
//! receive cloned snapshots.

use crate::{
    error::{BackZapError, Result},
    types::{ImageRef, ProcessingStatus, RequestToken},
};
use serde::{Deserialize, Serialize};

/// What happened to a removal completion when it reached the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDisposition {
    /// Success applied: the session is now `Completed`
    Completed,
    /// Failure applied: the session is now `Failed`
    Failed,
    /// The request was superseded by `select_image`/`reset`; nothing changed
    Stale,
}

impl CompletionDisposition {
    #[must_use]
    pub fn is_applied(self) -> bool {
        !matches!(self, Self::Stale)
    }
}

/// The in-progress image edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSession {
    source_image: Option<ImageRef>,
    processing_status: ProcessingStatus,
    result_image: Option<ImageRef>,
    comparison_visible: bool,
    original_overlay_shown: bool,
    last_error: Option<String>,
    active_request: Option<RequestToken>,
}

impl EditSession {
    /// Fresh session: no image, `Idle`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn source_image(&self) -> Option<&ImageRef> {
        self.source_image.as_ref()
    }

    #[must_use]
    pub fn processing_status(&self) -> ProcessingStatus {
        self.processing_status
    }

    #[must_use]
    pub fn result_image(&self) -> Option<&ImageRef> {
        self.result_image.as_ref()
    }

    #[must_use]
    pub fn comparison_visible(&self) -> bool {
        self.comparison_visible
    }

    #[must_use]
    pub fn original_overlay_shown(&self) -> bool {
        self.original_overlay_shown
    }

    /// Failure message for the retry prompt, present only while `Failed`
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Token of the outstanding request, present only while `InFlight`
    #[must_use]
    pub fn active_request(&self) -> Option<RequestToken> {
        self.active_request
    }

    /// Whether the session is in its initial (all-absent, `Idle`) state
    #[must_use]
    pub fn is_initial(&self) -> bool {
        *self == Self::default()
    }

    /// Whether `start_removal` would be accepted right now
    #[must_use]
    pub fn can_start_removal(&self) -> bool {
        self.source_image.is_some() && self.processing_status != ProcessingStatus::InFlight
    }

    /// Image the comparison surface should show full-screen, if any
    #[must_use]
    pub fn displayed_image(&self) -> Option<&ImageRef> {
        if self.comparison_visible && !self.original_overlay_shown {
            self.result_image.as_ref()
        } else {
            self.source_image.as_ref()
        }
    }

    /// Verify every session invariant, reporting the first one that fails
    ///
    /// # Errors
    /// - `BackZapError::InvariantViolation` naming the broken invariant
    pub fn check_invariants(&self) -> Result<()> {
        let completed = self.processing_status == ProcessingStatus::Completed;
        let in_flight = self.processing_status == ProcessingStatus::InFlight;
        let failed = self.processing_status == ProcessingStatus::Failed;

        if self.result_image.is_some() != completed {
            return Err(BackZapError::invariant(format!(
                "result image present={} but status is {}",
                self.result_image.is_some(),
                self.processing_status
            )));
        }
        if self.comparison_visible && !completed {
            return Err(BackZapError::invariant(format!(
                "comparison visible while status is {}",
                self.processing_status
            )));
        }
        if self.original_overlay_shown && !self.comparison_visible {
            return Err(BackZapError::invariant(
                "original overlay shown without comparison view",
            ));
        }
        if in_flight && self.source_image.is_none() {
            return Err(BackZapError::invariant("removal in flight without a source image"));
        }
        if self.active_request.is_some() != in_flight {
            return Err(BackZapError::invariant(format!(
                "active request present={} but status is {}",
                self.active_request.is_some(),
                self.processing_status
            )));
        }
        if self.last_error.is_some() != failed {
            return Err(BackZapError::invariant(format!(
                "error message present={} but status is {}",
                self.last_error.is_some(),
                self.processing_status
            )));
        }
        Ok(())
    }

    /// Full reset keyed to a new image; any prior result is discarded
    pub(crate) fn select_image(&mut self, image: ImageRef) {
        *self = Self {
            source_image: Some(image),
            ..Self::default()
        };
    }

    /// Back to the initial state, abandoning any in-flight request
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move to `InFlight` under `token`, returning the image to submit
    pub(crate) fn begin_removal(&mut self, token: RequestToken) -> Result<ImageRef> {
        let Some(source) = self.source_image.clone() else {
            return Err(BackZapError::NoSourceImage);
        };
        if self.processing_status == ProcessingStatus::InFlight {
            return Err(BackZapError::RemovalInFlight);
        }

        self.processing_status = ProcessingStatus::InFlight;
        self.active_request = Some(token);
        self.result_image = None;
        self.comparison_visible = false;
        self.original_overlay_shown = false;
        self.last_error = None;
        Ok(source)
    }

    /// Apply a collaborator result if `token` is still the active request
    pub(crate) fn complete(
        &mut self,
        token: RequestToken,
        outcome: std::result::Result<ImageRef, String>,
    ) -> CompletionDisposition {
        if self.active_request != Some(token) {
            return CompletionDisposition::Stale;
        }

        self.active_request = None;
        match outcome {
            Ok(processed) => {
                self.processing_status = ProcessingStatus::Completed;
                self.result_image = Some(processed);
                self.comparison_visible = true;
                self.original_overlay_shown = false;
                self.last_error = None;
                CompletionDisposition::Completed
            },
            Err(message) => {
                self.processing_status = ProcessingStatus::Failed;
                self.result_image = None;
                self.comparison_visible = false;
                self.original_overlay_shown = false;
                self.last_error = Some(message);
                CompletionDisposition::Failed
            },
        }
    }

    /// Flip the full-screen original preview; only valid over the comparison view
    pub(crate) fn toggle_original_overlay(&mut self) -> Result<bool> {
        if !self.comparison_visible {
            return Err(BackZapError::ComparisonNotVisible);
        }
        self.original_overlay_shown = !self.original_overlay_shown;
        Ok(self.original_overlay_shown)
    }
}
