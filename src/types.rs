//! Core value types shared by the workflow, collaborators and frontends

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque handle to an image resource
///
/// The workflow only relies on identity and equality. Collaborators that need
/// to read the image (exporters, the simulated remover) resolve it through
/// [`ImageRef::local_path`] or [`ImageRef::is_remote`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef {
    uri: String,
}

impl ImageRef {
    /// Create a new image reference from a URI or filesystem path
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Self { uri: uri.into() }
    }

    /// Create an image reference for a local file
    pub fn from_path<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(path.into().to_string_lossy().into_owned())
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Remote references are fetched over HTTP(S)
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.uri.starts_with("http://") || self.uri.starts_with("https://")
    }

    /// Filesystem path for `file://` URIs and bare paths
    ///
    /// Fragment and query suffixes are not part of the path, so a derived
    /// reference resolves to the file it was derived from.
    #[must_use]
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.is_remote() {
            return None;
        }
        let path = self.uri.strip_prefix("file://").unwrap_or(&self.uri);
        if path.contains("://") {
            return None;
        }
        let path = path.split(['#', '?']).next().unwrap_or_default();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    /// File name component, used when naming exported copies
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        let without_fragment = self.uri.split(['#', '?']).next().unwrap_or_default();
        without_fragment
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    /// Reference to a derived artifact of this image (`<uri>#<label>`)
    #[must_use]
    pub fn derived(&self, label: &str) -> Self {
        Self::new(format!("{}#{}", self.uri, label))
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uri)
    }
}

impl From<&str> for ImageRef {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for ImageRef {
    fn from(uri: String) -> Self {
        Self::new(uri)
    }
}

/// Status of the background removal operation for the current source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProcessingStatus {
    /// Nothing submitted for the current source
    #[default]
    Idle,
    /// Exactly one removal request is outstanding
    InFlight,
    /// A processed result is available
    Completed,
    /// The last request failed; retry or reset
    Failed,
}

impl ProcessingStatus {
    /// Human-readable label for the presentation layer
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStatus::Idle => "Ready",
            ProcessingStatus::InFlight => "Removing background...",
            ProcessingStatus::Completed => "Background removed",
            ProcessingStatus::Failed => "Background removal failed",
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::InFlight => write!(f, "in-flight"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Identity of one accepted `start_removal` call
///
/// Tokens increase monotonically per controller. A completion is applied only
/// if its token is still the session's active request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestToken(pub u64);

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Export collaborators available once a result is completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportKind {
    /// Save the processed image to the device
    Download,
    /// Hand the processed image to a share target
    Share,
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Share => write!(f, "share"),
        }
    }
}
