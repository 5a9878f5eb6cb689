//! Simulated background removal
//!
//! Waits a fixed delay and returns a processed artifact without running a
//! segmentation model. When an output directory is configured and the source
//! is a local file, the image is decoded and re-encoded as an RGBA PNG so the
//! rest of the pipeline (library sizes, exports) works on real files.

use crate::{
    config::WorkflowConfig,
    error::{BackZapError, Result},
    removal::{BackgroundRemovalService, RemovalOutput},
    types::ImageRef,
};
use async_trait::async_trait;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Label appended to derived references when no file is written
pub const PROCESSED_LABEL: &str = "background-removed";

/// Fixed-delay stand-in for a real removal model
#[derive(Debug, Clone)]
pub struct SimulatedRemovalService {
    delay: Duration,
    output_dir: Option<PathBuf>,
    failure: Option<String>,
}

impl SimulatedRemovalService {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            output_dir: None,
            failure: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            delay: config.simulated_delay(),
            output_dir: config.output_dir.clone(),
            failure: None,
        }
    }

    /// Write processed PNGs into `dir` for local sources
    #[must_use]
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Fail every call with `message` after the delay
    #[must_use]
    pub fn failing<S: Into<String>>(mut self, message: S) -> Self {
        self.failure = Some(message.into());
        self
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl BackgroundRemovalService for SimulatedRemovalService {
    async fn remove(&self, image: &ImageRef) -> Result<RemovalOutput> {
        tokio::time::sleep(self.delay).await;

        if let Some(message) = &self.failure {
            return Err(BackZapError::removal_failed(message.clone()));
        }

        let (Some(dir), Some(source)) = (self.output_dir.clone(), image.local_path()) else {
            return Ok(RemovalOutput::new(image.derived(PROCESSED_LABEL)));
        };

        let written = tokio::task::spawn_blocking(move || render_png(&source, &dir))
            .await
            .map_err(|e| BackZapError::internal(format!("Render task failed: {}", e)))??;

        Ok(RemovalOutput::new(ImageRef::from_path(written)))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// Decode `source` and write it as `<stem>-nobg.png` (RGBA) into `dir`
fn render_png(source: &Path, dir: &Path) -> Result<PathBuf> {
    let decoded = image::open(source)?;
    let rgba = decoded.to_rgba8();

    std::fs::create_dir_all(dir)
        .map_err(|e| BackZapError::file_io_error("create output directory", dir, e))?;
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let destination = dir.join(format!("{}-nobg.png", stem));
    rgba.save_with_format(&destination, ImageFormat::Png)?;

    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        width = rgba.width(),
        height = rgba.height(),
        "Rendered simulated result"
    );
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_returns_derived_reference_after_delay() {
        let service = SimulatedRemovalService::new(Duration::from_millis(2000));
        let start = tokio::time::Instant::now();
        let output = service.remove(&ImageRef::new("https://x/photo.jpg")).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(2000));
        assert_eq!(
            output.processed_image,
            ImageRef::new("https://x/photo.jpg#background-removed")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_service() {
        let service = SimulatedRemovalService::new(Duration::from_millis(10)).failing("no subject found");
        let result = service.remove(&ImageRef::new("a")).await;
        assert!(matches!(result, Err(BackZapError::RemovalFailed(msg)) if msg == "no subject found"));
    }

    #[tokio::test]
    async fn test_writes_rgba_png_for_local_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("portrait.jpg");
        let mut img = RgbImage::new(8, 6);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 20) as u8, (y * 30) as u8, 128]);
        }
        img.save_with_format(&source, ImageFormat::Jpeg).unwrap();

        let out_dir = temp_dir.path().join("out");
        let service = SimulatedRemovalService::new(Duration::ZERO).with_output_dir(&out_dir);
        let output = service.remove(&ImageRef::from_path(&source)).await.unwrap();

        let written = output.processed_image.local_path().unwrap();
        assert_eq!(written, out_dir.join("portrait-nobg.png"));
        let reloaded = image::open(&written).unwrap();
        assert_eq!((reloaded.width(), reloaded.height()), (8, 6));
        assert!(reloaded.color().has_alpha());
    }

    #[test]
    fn test_from_config() {
        let config = WorkflowConfig::builder()
            .simulated_delay(Duration::from_millis(42))
            .build()
            .unwrap();
        let service = SimulatedRemovalService::from_config(&config);
        assert_eq!(service.delay(), Duration::from_millis(42));
        assert_eq!(service.name(), "simulated");
    }
}
