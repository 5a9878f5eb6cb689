//! Results library
//!
//! Keeps processed results (original + processed reference) with the numbers
//! the library screen shows: images processed, storage used and average
//! processing time. Persisted as JSON.

use crate::{
    error::{BackZapError, Result},
    types::ImageRef,
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// One processed image in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: u64,
    pub original: ImageRef,
    pub processed: ImageRef,
    pub processing_time_ms: u64,
    /// Size of the processed file, when it is a local file
    pub size_bytes: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate library numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryStats {
    pub images_processed: usize,
    pub storage_used_bytes: u64,
    /// `None` for an empty library
    pub average_processing_time: Option<Duration>,
}

impl std::fmt::Display for LibraryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let average = self
            .average_processing_time
            .map_or_else(|| "-".to_string(), |d| format!("{:.1}s", d.as_secs_f64()));
        write!(
            f,
            "{} images processed, {} storage used, {} avg process time",
            self.images_processed,
            format_size(self.storage_used_bytes),
            average
        )
    }
}

/// Collection of processed results, newest last in storage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLibrary {
    next_id: u64,
    entries: Vec<LibraryEntry>,
}

impl ResultLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a library from disk; a missing file is an empty library
    ///
    /// # Errors
    /// - File read failures other than "not found"
    /// - Malformed JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let library: Self = serde_json::from_str(&content).map_err(|e| {
                    BackZapError::library(format!(
                        "Corrupt library file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                debug!("Loaded {} library entries from {}", library.len(), path.display());
                Ok(library)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No library at {}, starting empty", path.display());
                Ok(Self::new())
            },
            Err(e) => Err(BackZapError::file_io_error("read library", path, e)),
        }
    }

    /// Write the library atomically (temp file in the same directory + rename)
    ///
    /// # Errors
    /// - Directory creation, write or rename failures
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .map_err(|e| BackZapError::file_io_error("create library directory", parent, e))?;

        let content = serde_json::to_vec_pretty(self)?;
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(&content)?;
        temp.persist(path)
            .map_err(|e| BackZapError::file_io_error("persist library", path, e.error))?;

        info!("Saved {} library entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Add a processed result and return its id
    pub fn add(&mut self, original: ImageRef, processed: ImageRef, processing_time: Duration) -> u64 {
        self.next_id += 1;
        let id = self.next_id;

        let size_bytes = processed
            .local_path()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len());

        self.entries.push(LibraryEntry {
            id,
            original,
            processed,
            processing_time_ms: processing_time.as_millis() as u64,
            size_bytes,
            created_at: Utc::now(),
        });
        id
    }

    /// Remove an entry by id
    ///
    /// # Errors
    /// - `BackZapError::Library` if no entry has this id
    pub fn remove(&mut self, id: u64) -> Result<LibraryEntry> {
        let Some(index) = self.entries.iter().position(|e| e.id == id) else {
            warn!("Library entry #{} not found", id);
            return Err(BackZapError::library(format!("No library entry with id {}", id)));
        };
        Ok(self.entries.remove(index))
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&LibraryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &LibraryEntry> {
        self.entries.iter().rev()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> LibraryStats {
        let images_processed = self.entries.len();
        let storage_used_bytes = self.entries.iter().filter_map(|e| e.size_bytes).sum();
        let average_processing_time = if images_processed == 0 {
            None
        } else {
            let total_ms: u64 = self.entries.iter().map(|e| e.processing_time_ms).sum();
            Some(Duration::from_millis(total_ms / images_processed as u64))
        };

        LibraryStats {
            images_processed,
            storage_used_bytes,
            average_processing_time,
        }
    }
}

/// Format bytes as human-readable size
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS.get(unit_index).unwrap_or(&"B"))
    } else {
        format!("{:.1} {}", size, UNITS.get(unit_index).unwrap_or(&"B"))
    }
}
