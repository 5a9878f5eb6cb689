//! Background removal collaborator abstraction

use crate::{error::Result, types::ImageRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Artifact produced by a successful removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalOutput {
    /// Processed image with the background removed
    pub processed_image: ImageRef,
}

impl RemovalOutput {
    #[must_use]
    pub fn new(processed_image: ImageRef) -> Self {
        Self { processed_image }
    }
}

/// Trait for background removal services
///
/// The workflow controller calls [`remove`](Self::remove) at most once per
/// accepted `start_removal` and never batches, coalesces or retries. Latency is
/// opaque; the controller applies its own timeout.
#[async_trait]
pub trait BackgroundRemovalService: Send + Sync {
    /// Remove the background from `image`
    ///
    /// # Errors
    /// - Segmentation or transport failures, surfaced as a `Failed` session
    async fn remove(&self, image: &ImageRef) -> Result<RemovalOutput>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
