//! Export collaborators: download-to-device and share
//!
//! Exports run only after a removal has completed and never touch the edit
//! session; a failed export leaves the `Completed` state as it was.

use crate::{
    config::WorkflowConfig,
    error::{BackZapError, Result},
    types::{ExportKind, ImageRef},
};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::TryStreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

/// Outcome of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub kind: ExportKind,
    pub destination: PathBuf,
    pub bytes: u64,
    /// Hex SHA-256 of the written file
    pub sha256: String,
}

/// Trait for export targets
#[async_trait]
pub trait ExportService: Send + Sync {
    /// Export `image` for the given purpose
    ///
    /// # Errors
    /// - Unresolvable image references
    /// - Transport or filesystem failures
    async fn export(&self, kind: ExportKind, image: &ImageRef) -> Result<ExportReceipt>;
}

/// Exporter writing into a downloads directory and a share outbox
#[derive(Debug, Clone)]
pub struct FileExporter {
    client: Client,
    downloads_dir: PathBuf,
    share_dir: PathBuf,
}

impl FileExporter {
    /// # Errors
    /// - HTTP client construction failures
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(downloads_dir: P, share_dir: Q) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .user_agent(concat!("backzap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            downloads_dir: downloads_dir.into(),
            share_dir: share_dir.into(),
        })
    }

    /// # Errors
    /// - HTTP client construction failures
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        Self::new(config.downloads_dir.clone(), config.share_dir.clone())
    }

    fn target_dir(&self, kind: ExportKind) -> &Path {
        match kind {
            ExportKind::Download => &self.downloads_dir,
            ExportKind::Share => &self.share_dir,
        }
    }

    /// Unique destination name: `<timestamp>-<original name>`
    fn destination_for(&self, kind: ExportKind, image: &ImageRef) -> PathBuf {
        let name = image.file_name().unwrap_or_else(|| "image.png".to_string());
        let stamp = Utc::now().format("%Y%m%d-%H%M%S%3f");
        self.target_dir(kind).join(format!("{}-{}", stamp, name))
    }
}

#[async_trait]
impl ExportService for FileExporter {
    async fn export(&self, kind: ExportKind, image: &ImageRef) -> Result<ExportReceipt> {
        let dir = self.target_dir(kind);
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| BackZapError::file_io_error("create export directory", dir, e))?;
        let destination = self.destination_for(kind, image);

        let (bytes, sha256) = if let Some(source) = image.local_path() {
            let file = tokio::fs::File::open(&source)
                .await
                .map_err(|e| BackZapError::file_io_error("open export source", &source, e))?;
            copy_hashing(file, &destination).await?
        } else if image.is_remote() {
            let response = self.client.get(image.uri()).send().await?;
            if !response.status().is_success() {
                return Err(BackZapError::export(format!(
                    "HTTP error {} for {}",
                    response.status(),
                    image
                )));
            }
            let stream = StreamReader::new(
                response
                    .bytes_stream()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
            );
            copy_hashing(stream, &destination).await?
        } else {
            return Err(BackZapError::unsupported_image_ref(image.uri()));
        };

        tracing::debug!(
            kind = %kind,
            destination = %destination.display(),
            bytes,
            "Exported image"
        );

        Ok(ExportReceipt {
            kind,
            destination,
            bytes,
            sha256,
        })
    }
}

/// Copy `reader` to `destination`, hashing as we go
///
/// Bytes are staged in a temp file next to `destination` and renamed into
/// place only once the whole source has been written. On error the temp file
/// is removed and `destination` is never created.
async fn copy_hashing<R: AsyncRead + Unpin>(mut reader: R, destination: &Path) -> Result<(u64, String)> {
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let (staging, temp_path) = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| BackZapError::file_io_error("create staging file", dir, e))?
        .into_parts();
    let mut file = tokio::fs::File::from_std(staging);

    let mut hasher = Sha256::new();
    let mut written = 0u64;
    let mut buffer = vec![0; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .await
            .map_err(|e| BackZapError::export(format!("Failed to read export source: {}", e)))?;
        if bytes_read == 0 {
            break;
        }

        let chunk = buffer.get(..bytes_read).unwrap_or(&[]);
        hasher.update(chunk);
        file.write_all(chunk)
            .await
            .map_err(|e| BackZapError::file_io_error("write to file", &temp_path, e))?;
        written += bytes_read as u64;
    }

    file.flush()
        .await
        .map_err(|e| BackZapError::file_io_error("flush file", &temp_path, e))?;
    drop(file);

    temp_path
        .persist(destination)
        .map_err(|e| BackZapError::file_io_error("persist export", destination, e.error))?;

    Ok((written, format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_download_local_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("result.png");
        std::fs::write(&source, b"hello").unwrap();

        let exporter = FileExporter::new(temp_dir.path().join("dl"), temp_dir.path().join("share")).unwrap();
        let receipt = exporter
            .export(ExportKind::Download, &ImageRef::from_path(&source))
            .await
            .unwrap();

        assert_eq!(receipt.kind, ExportKind::Download);
        assert_eq!(receipt.bytes, 5);
        assert!(receipt.destination.starts_with(temp_dir.path().join("dl")));
        assert!(receipt.destination.to_string_lossy().ends_with("result.png"));
        assert_eq!(
            receipt.sha256,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(std::fs::read(&receipt.destination).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_share_goes_to_outbox() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("result.png");
        std::fs::write(&source, b"data").unwrap();

        let exporter = FileExporter::new(temp_dir.path().join("dl"), temp_dir.path().join("share")).unwrap();
        let receipt = exporter
            .export(ExportKind::Share, &ImageRef::from_path(&source))
            .await
            .unwrap();
        assert!(receipt.destination.starts_with(temp_dir.path().join("share")));
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = FileExporter::new(temp_dir.path(), temp_dir.path()).unwrap();
        let result = exporter
            .export(ExportKind::Download, &ImageRef::from_path(temp_dir.path().join("nope.png")))
            .await;
        assert!(matches!(result, Err(BackZapError::Io(_))));
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_no_file_behind() {
        let temp_dir = TempDir::new().unwrap();
        let source_dir = temp_dir.path().join("not-a-file.png");
        std::fs::create_dir(&source_dir).unwrap();
        let downloads = temp_dir.path().join("dl");

        let exporter = FileExporter::new(&downloads, temp_dir.path().join("share")).unwrap();
        let result = exporter
            .export(ExportKind::Download, &ImageRef::from_path(&source_dir))
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(&downloads).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_reference() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = FileExporter::new(temp_dir.path(), temp_dir.path()).unwrap();
        let result = exporter
            .export(ExportKind::Share, &ImageRef::new("content://media/external/42"))
            .await;
        assert!(matches!(result, Err(BackZapError::UnsupportedImageRef(_))));
    }
}
