//! Integration tests for auto-save and exports around the workflow
//!
//! Uses the simulated remover with an output directory so results are real
//! PNG files on disk.

use async_trait::async_trait;
use backzap::{
    backends::test_utils::{InstantRemovalService, ScriptedRemovalService},
    BackZapError, CompletionDisposition, ExportKind, ExportReceipt, ExportService, FileExporter,
    ImageRef, ImageWorkflowController, MemoryReporter, ProcessingStatus, Result, ResultLibrary,
    SimulatedRemovalService, WorkflowConfig, WorkflowEvent,
};
use image::{ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Write a small JPEG and return its path
fn create_test_photo(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut img = RgbImage::new(16, 12);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let intensity = ((x + y) * 8) as u8;
        *pixel = Rgb([intensity, 128, 255 - intensity]);
    }
    img.save_with_format(&path, ImageFormat::Jpeg).unwrap();
    path
}

fn shared_library() -> Arc<Mutex<ResultLibrary>> {
    Arc::new(Mutex::new(ResultLibrary::new()))
}

/// Exporter that always fails
struct BrokenExporter;

#[async_trait]
impl ExportService for BrokenExporter {
    async fn export(&self, _kind: ExportKind, _image: &ImageRef) -> Result<ExportReceipt> {
        Err(BackZapError::export("share target unavailable"))
    }
}

#[tokio::test]
async fn test_auto_save_adds_completed_results() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let photo = create_test_photo(temp_dir.path(), "portrait.jpg");
    let library = shared_library();
    let reporter = MemoryReporter::new();

    let service = SimulatedRemovalService::new(Duration::ZERO).with_output_dir(temp_dir.path().join("out"));
    let controller = ImageWorkflowController::new(Arc::new(service), &WorkflowConfig::default())
        .with_reporter(Arc::new(reporter.clone()))
        .with_library(Arc::clone(&library), true);

    controller.select_image(ImageRef::from_path(&photo));
    controller.start_removal()?.settled().await?;

    let library = library.lock().unwrap();
    assert_eq!(library.len(), 1);
    let entry = library.entries().next().unwrap();
    assert_eq!(entry.original, ImageRef::from_path(&photo));
    assert_eq!(Some(&entry.processed), controller.snapshot().result_image());
    assert!(entry.size_bytes.is_some_and(|size| size > 0));
    assert_eq!(
        reporter.count(|e| matches!(e, WorkflowEvent::ResultSaved { entry_id: 1 })),
        1
    );
    Ok(())
}

#[tokio::test]
async fn test_without_auto_save_library_is_untouched() -> Result<()> {
    let library = shared_library();
    let controller = ImageWorkflowController::new(
        Arc::new(InstantRemovalService::succeeding()),
        &WorkflowConfig::default(),
    )
    .with_library(Arc::clone(&library), false);

    controller.select_image(ImageRef::new("https://images.example.com/cat.jpg"));
    controller.start_removal()?.settled().await?;

    assert_eq!(controller.snapshot().processing_status(), ProcessingStatus::Completed);
    assert!(library.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_and_stale_results_are_not_saved() -> Result<()> {
    let library = shared_library();
    let (service, mut requests) = ScriptedRemovalService::new();
    let controller = ImageWorkflowController::new(Arc::new(service), &WorkflowConfig::default())
        .with_library(Arc::clone(&library), true);

    controller.select_image(ImageRef::new("A"));
    let handle = controller.start_removal()?;
    requests.recv().await.unwrap().fail("no subject found");
    assert_eq!(handle.settled().await?, CompletionDisposition::Failed);

    let handle = controller.start_removal()?;
    let pending = requests.recv().await.unwrap();
    controller.select_image(ImageRef::new("B"));
    pending.succeed("A_result");
    assert_eq!(handle.settled().await?, CompletionDisposition::Stale);

    assert!(library.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_download_and_share_completed_result() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let photo = create_test_photo(temp_dir.path(), "portrait.jpg");
    let reporter = MemoryReporter::new();

    let config = WorkflowConfig::builder()
        .simulated_delay(Duration::ZERO)
        .output_dir(temp_dir.path().join("out"))
        .downloads_dir(temp_dir.path().join("downloads"))
        .share_dir(temp_dir.path().join("share"))
        .build()?;
    let controller = ImageWorkflowController::new(
        Arc::new(SimulatedRemovalService::from_config(&config)),
        &config,
    )
    .with_reporter(Arc::new(reporter.clone()));
    let exporter = FileExporter::from_config(&config)?;

    controller.select_image(ImageRef::from_path(&photo));
    controller.start_removal()?.settled().await?;
    let before = controller.snapshot();

    let download = controller.export(ExportKind::Download, &exporter).await?;
    assert!(download.destination.starts_with(temp_dir.path().join("downloads")));
    assert!(download
        .destination
        .to_string_lossy()
        .ends_with("portrait-nobg.png"));
    assert_eq!(std::fs::metadata(&download.destination)?.len(), download.bytes);
    assert_eq!(download.sha256.len(), 64);

    let share = controller.export(ExportKind::Share, &exporter).await?;
    assert!(share.destination.starts_with(temp_dir.path().join("share")));
    assert_eq!(share.sha256, download.sha256);

    assert_eq!(controller.snapshot(), before);
    assert_eq!(
        reporter.count(|e| matches!(e, WorkflowEvent::Exported { .. })),
        2
    );
    Ok(())
}

#[tokio::test]
async fn test_download_simulated_result_without_output_dir() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let photo = create_test_photo(temp_dir.path(), "cat.jpg");
    let controller = ImageWorkflowController::new(
        Arc::new(SimulatedRemovalService::new(Duration::ZERO)),
        &WorkflowConfig::default(),
    );
    let exporter = FileExporter::new(temp_dir.path().join("downloads"), temp_dir.path().join("share"))?;

    controller.select_image(ImageRef::from_path(&photo));
    assert_eq!(
        controller.start_removal()?.settled().await?,
        CompletionDisposition::Completed
    );

    let receipt = controller.export(ExportKind::Download, &exporter).await?;
    assert!(receipt.destination.starts_with(temp_dir.path().join("downloads")));
    assert!(receipt.destination.to_string_lossy().ends_with("cat.jpg"));
    assert_eq!(receipt.bytes, std::fs::metadata(&photo)?.len());
    Ok(())
}

#[tokio::test]
async fn test_export_failure_keeps_completed_state() -> Result<()> {
    let controller = ImageWorkflowController::new(
        Arc::new(InstantRemovalService::succeeding()),
        &WorkflowConfig::default(),
    );
    controller.select_image(ImageRef::new("img1"));
    controller.start_removal()?.settled().await?;
    controller.toggle_original_overlay()?;
    let before = controller.snapshot();

    let result = controller.export(ExportKind::Share, &BrokenExporter).await;
    assert!(matches!(result, Err(BackZapError::Export(_))));

    let after = controller.snapshot();
    assert_eq!(after, before);
    assert_eq!(after.processing_status(), ProcessingStatus::Completed);
    assert!(after.original_overlay_shown());
    Ok(())
}

#[tokio::test]
async fn test_export_before_completion_is_rejected() {
    let (service, _requests) = ScriptedRemovalService::new();
    let controller = ImageWorkflowController::new(Arc::new(service), &WorkflowConfig::default());
    controller.select_image(ImageRef::new("img1"));
    let _handle = controller.start_removal().unwrap();

    let result = controller.export(ExportKind::Download, &BrokenExporter).await;
    assert!(matches!(result, Err(BackZapError::NoResultImage)));
    assert_eq!(controller.snapshot().processing_status(), ProcessingStatus::InFlight);
}

#[tokio::test]
async fn test_library_persists_across_sessions() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("library.json");
    let library = shared_library();

    let controller = ImageWorkflowController::new(
        Arc::new(InstantRemovalService::succeeding()),
        &WorkflowConfig::default(),
    )
    .with_library(Arc::clone(&library), true);

    for uri in ["one.jpg", "two.jpg"] {
        controller.select_image(ImageRef::new(uri));
        controller.start_removal()?.settled().await?;
    }
    library.lock().unwrap().save(&path)?;

    let reloaded = ResultLibrary::load(&path)?;
    assert_eq!(reloaded.len(), 2);
    let newest = reloaded.entries().next().unwrap();
    assert_eq!(newest.original, ImageRef::new("two.jpg"));
    assert_eq!(reloaded.stats().images_processed, 2);
    Ok(())
}
