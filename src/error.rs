//! Error types for the image editing workflow

use thiserror::Error;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, BackZapError>;

/// Error types for the image editing workflow and its collaborators
#[derive(Error, Debug)]
pub enum BackZapError {
    /// `start_removal` was called before any image was selected
    #[error("No source image selected")]
    NoSourceImage,

    /// `start_removal` was called while a removal is already in flight
    #[error("A background removal is already in flight")]
    RemovalInFlight,

    /// The removal collaborator reported a failure for the active request
    #[error("Background removal failed: {0}")]
    RemovalFailed(String),

    /// Collaborator-level errors (bad response, unreachable service, ...)
    #[error("Removal service error: {0}")]
    Removal(String),

    /// The removal call did not finish within the configured timeout
    #[error("Background removal timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A completion arrived for a request that is no longer active
    #[error("Completion for stale request {0} discarded")]
    StaleCompletion(u64),

    /// The original overlay can only be toggled while the comparison is visible
    #[error("Comparison view is not visible")]
    ComparisonNotVisible,

    /// Export requested before a processed result exists
    #[error("No processed result available")]
    NoResultImage,

    /// An edit session invariant does not hold
    #[error("Session invariant violated: {0}")]
    InvariantViolation(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Image reference that a collaborator cannot resolve
    #[error("Unsupported image reference: {0}")]
    UnsupportedImageRef(String),

    /// Download or share failures
    #[error("Export error: {0}")]
    Export(String),

    /// Results library errors
    #[error("Library error: {0}")]
    Library(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackZapError {
    /// Create a new removal failure (collaborator reported failure)
    pub fn removal_failed<S: Into<String>>(msg: S) -> Self {
        Self::RemovalFailed(msg.into())
    }

    /// Create a new removal service error
    pub fn removal<S: Into<String>>(msg: S) -> Self {
        Self::Removal(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new unsupported image reference error
    pub fn unsupported_image_ref<S: Into<String>>(uri: S) -> Self {
        Self::UnsupportedImageRef(uri.into())
    }

    /// Create a new export error
    pub fn export<S: Into<String>>(msg: S) -> Self {
        Self::Export(msg.into())
    }

    /// Create a new library error
    pub fn library<S: Into<String>>(msg: S) -> Self {
        Self::Library(msg.into())
    }

    /// Create a new invariant violation
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Whether the error is a rejected command that left the session untouched
    #[must_use]
    pub fn is_ignored_command(&self) -> bool {
        matches!(
            self,
            Self::NoSourceImage | Self::RemovalInFlight | Self::ComparisonNotVisible
        )
    }

    /// Message suitable for the retry prompt shown after a failed removal
    #[must_use]
    pub fn retry_message(&self) -> String {
        match self {
            Self::RemovalFailed(msg) | Self::Removal(msg) => msg.clone(),
            Self::Timeout(after) => format!("timed out after {:.1}s", after.as_secs_f64()),
            other => other.to_string(),
        }
    }
}
