//! BackZap CLI
//!
//! Command-line frontend for the image workflow: removes backgrounds from
//! local files or URLs, manages the results library, settings and onboarding.

use super::config::CliConfigBuilder;
use crate::{
    backends::{RemoteRemovalService, SimulatedRemovalService},
    config::WorkflowConfig,
    controller::ImageWorkflowController,
    error::BackZapError,
    export::FileExporter,
    library::{format_size, ResultLibrary},
    onboarding::OnboardingFlow,
    removal::BackgroundRemovalService,
    services::ConsoleReporter,
    settings::Settings,
    tracing_config::{events, spans},
    types::{ExportKind, ImageRef, ProcessingStatus},
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, Instrument};

/// Supported input extensions when scanning directories
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tiff", "tif"];

/// Photo background removal
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "backzap")]
pub struct Cli {
    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console, global = true)]
    pub log_format: CliLogFormat,

    /// Workflow config file (JSON). Defaults to <config_dir>/backzap/config.json
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Settings file (JSON). Defaults to <config_dir>/backzap/settings.json
    #[arg(long, value_name = "PATH", global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Remove the background from one or more images
    Remove(RemoveArgs),
    /// Browse and manage saved results
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },
    /// Show or change preferences
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show or create the workflow config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Walk through the introduction
    Onboarding {
        /// Mark onboarding as done without showing it
        #[arg(long)]
        skip: bool,
    },
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct RemoveArgs {
    /// Image files, directories or http(s) URLs
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Scan directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Delay of the simulated remover in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Removal timeout in seconds (0 = no timeout)
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Remote removal service endpoint
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Directory for processed PNGs written by the simulated remover
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Download directory used by --download
    #[arg(long, value_name = "DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// Download each result after processing
    #[arg(long)]
    pub download: bool,

    /// Drop each result into the share outbox
    #[arg(long)]
    pub share: bool,

    /// Save results to the library even when auto-save is off
    #[arg(long)]
    pub save: bool,

    /// Make the simulated remover fail (for trying the retry flow)
    #[arg(long)]
    pub fail: bool,

    /// Retries after a failed removal
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Toggle the original overlay on and off for each result
    #[arg(long)]
    pub compare: bool,
}

#[derive(Subcommand)]
pub enum LibraryAction {
    /// List saved results, newest first
    List,
    /// Show library statistics
    Stats,
    /// Delete one result
    Delete { id: u64 },
    /// Delete all results
    Clear,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print current settings
    Show,
    /// Change one setting (e.g. `auto_save on`, `appearance dark`)
    Set { key: String, value: String },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective workflow configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLogFormat {
    Console,
    Compact,
    /// Requires the `tracing-json` feature
    Json,
}

/// Outcome counts for a `remove` run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct BatchSummary {
    processed: usize,
    failed: usize,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format).context("Failed to initialize tracing")?;

    let settings_path = cli.settings.clone().unwrap_or_else(Settings::default_path);

    match &cli.command {
        Command::Remove(args) => run_remove(&cli, args, &settings_path).await,
        Command::Library { action } => run_library(&cli, action),
        Command::Settings { action } => run_settings(action, &settings_path),
        Command::Config { action } => run_config(&cli, action),
        Command::Onboarding { skip } => run_onboarding(*skip, &settings_path),
    }
}

/// Initialize tracing based on verbosity level
fn init_tracing(verbose_count: u8, format: CliLogFormat) -> Result<()> {
    use crate::tracing_config::TracingFormat;

    let format = match format {
        CliLogFormat::Console => TracingFormat::Console,
        CliLogFormat::Compact => TracingFormat::Compact,
        #[cfg(feature = "tracing-json")]
        CliLogFormat::Json => TracingFormat::Json,
        #[cfg(not(feature = "tracing-json"))]
        CliLogFormat::Json => anyhow::bail!("JSON log output requires the `tracing-json` feature"),
    };
    crate::tracing_config::init_cli_tracing(verbose_count, format)
        .context("Failed to initialize tracing subscriber")?;

    debug!(verbosity = verbose_count, "Tracing initialized");
    Ok(())
}

async fn run_remove(cli: &Cli, args: &RemoveArgs, settings_path: &Path) -> Result<()> {
    CliConfigBuilder::validate_remove_args(args).context("Invalid CLI arguments")?;
    let base = CliConfigBuilder::load_base(cli.config.as_deref())?;
    let config = CliConfigBuilder::from_remove_args(args, base).context("Failed to build configuration")?;
    let settings = Settings::load(settings_path).context("Failed to load settings")?;

    if !settings.onboarding_completed {
        info!("💡 New here? Run `backzap onboarding` for a quick tour");
    }

    let images = collect_inputs(&args.inputs, args.recursive)?;
    if images.is_empty() {
        warn!("No supported images found in the provided inputs");
        return Ok(());
    }
    info!("Found {} image(s) to process", images.len());

    let service = create_service(args, &config)?;
    let library = ResultLibrary::load(&config.library_path).context("Failed to load results library")?;
    let library = Arc::new(Mutex::new(library));
    let auto_save = settings.auto_save || args.save;

    let controller = ImageWorkflowController::new(service, &config)
        .with_reporter(Arc::new(ConsoleReporter::new(settings.notifications)))
        .with_library(Arc::clone(&library), auto_save);

    let exporter = if args.download || args.share {
        Some(FileExporter::from_config(&config).context("Failed to create exporter")?)
    } else {
        None
    };

    let start_time = Instant::now();
    let summary = process_batch(&controller, &images, args, exporter.as_ref())
        .instrument(spans::batch(images.len()))
        .await?;
    controller.reset();

    if auto_save {
        let library = library
            .lock()
            .map_err(|_| anyhow::anyhow!("Results library lock poisoned"))?;
        library
            .save(&config.library_path)
            .context("Failed to save results library")?;
    }

    let total_time = start_time.elapsed();
    events::performance_metric("remove_batch", total_time.as_millis() as u64);
    info!(
        "Processed {} image(s) in {:.2}s",
        summary.processed,
        total_time.as_secs_f64()
    );

    if summary.failed > 0 {
        anyhow::bail!("{} of {} image(s) failed", summary.failed, images.len());
    }
    Ok(())
}

/// Run every image through select → start → settle, retrying failures
async fn process_batch(
    controller: &ImageWorkflowController,
    images: &[ImageRef],
    args: &RemoveArgs,
    exporter: Option<&FileExporter>,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for image in images {
        controller.select_image(image.clone());
        let mut attempt = 0;

        loop {
            let handle = controller.start_removal()?;
            let spinner = create_spinner(controller, image);
            let disposition = handle.settled().await?;
            spinner.finish_and_clear();

            let session = controller.snapshot();
            match session.processing_status() {
                ProcessingStatus::Completed => {
                    if let Some(result) = session.result_image() {
                        println!("✅ {} → {}", image, result);
                    }
                    if args.compare {
                        compare_overlay(controller)?;
                    }
                    if let Some(exporter) = exporter {
                        export_result(controller, exporter, args).await;
                    }
                    summary.processed += 1;
                    break;
                },
                ProcessingStatus::Failed if attempt < args.retries => {
                    attempt += 1;
                    warn!(
                        "Removal failed for {} ({}), retrying {}/{}",
                        image,
                        session.last_error().unwrap_or("unknown error"),
                        attempt,
                        args.retries
                    );
                },
                ProcessingStatus::Failed => {
                    let message = session.last_error().unwrap_or("unknown error");
                    events::error_with_context(
                        &BackZapError::removal_failed(message),
                        &format!("Removing background from {}", image),
                    );
                    println!("❌ {}: {}", image, message);
                    summary.failed += 1;
                    break;
                },
                other => {
                    error!("Unexpected status {} after {:?} completion for {}", other, disposition, image);
                    summary.failed += 1;
                    break;
                },
            }
        }
    }

    Ok(summary)
}

fn create_spinner(controller: &ImageWorkflowController, image: &ImageRef) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!(
        "{} {}",
        controller.snapshot().processing_status().description(),
        image
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Show the original over the result and back again
fn compare_overlay(controller: &ImageWorkflowController) -> Result<()> {
    for _ in 0..2 {
        let shown = controller.toggle_original_overlay()?;
        let session = controller.snapshot();
        let displayed = session
            .displayed_image()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        println!(
            "   👁  original overlay {}: showing {}",
            if shown { "on" } else { "off" },
            displayed
        );
    }
    Ok(())
}

/// Export failures are reported but leave the completed result in place
async fn export_result(controller: &ImageWorkflowController, exporter: &FileExporter, args: &RemoveArgs) {
    let kinds = [
        (args.download, ExportKind::Download),
        (args.share, ExportKind::Share),
    ];
    for kind in kinds.into_iter().filter(|(wanted, _)| *wanted).map(|(_, kind)| kind) {
        match controller.export(kind, exporter).await {
            Ok(receipt) => println!(
                "   📤 {} → {} ({}, sha256 {})",
                kind,
                receipt.destination.display(),
                format_size(receipt.bytes),
                receipt.sha256.get(..12).unwrap_or(&receipt.sha256)
            ),
            Err(e) => events::warning_with_recommendation(
                &format!("Export ({}) failed: {}", kind, e),
                "The result is still available, try the export again",
            ),
        }
    }
}

fn create_service(args: &RemoveArgs, config: &WorkflowConfig) -> Result<Arc<dyn BackgroundRemovalService>> {
    if config.remote_endpoint.is_some() {
        let service = RemoteRemovalService::from_config(config).context("Failed to create remote service")?;
        info!("Using remote removal service at {}", service.endpoint());
        return Ok(Arc::new(service));
    }

    let mut service = SimulatedRemovalService::from_config(config);
    if args.fail {
        service = service.failing("Simulated removal failure");
    }
    info!(
        "Using simulated removal service ({}ms delay)",
        service.delay().as_millis()
    );
    Ok(Arc::new(service))
}

/// Expand CLI inputs into image references, directories sorted by path
fn collect_inputs(inputs: &[String], recursive: bool) -> Result<Vec<ImageRef>> {
    let mut images = Vec::new();

    for input in inputs {
        let path = Path::new(input);
        if input.starts_with("http://") || input.starts_with("https://") {
            images.push(ImageRef::new(input.as_str()));
        } else if path.is_dir() {
            let files = find_image_files(path, recursive)
                .with_context(|| format!("Failed to scan directory {}", path.display()))?;
            images.extend(files.into_iter().map(ImageRef::from_path));
        } else if path.is_file() {
            images.push(ImageRef::from_path(path));
        } else {
            anyhow::bail!("Input not found: {}", input);
        }
    }

    Ok(images)
}

/// Find image files in directory
fn find_image_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry?;
        if entry.file_type().is_file() && is_image_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Check if file is an image based on extension
fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn run_library(cli: &Cli, action: &LibraryAction) -> Result<()> {
    let config = CliConfigBuilder::load_base(cli.config.as_deref())?;
    let path = &config.library_path;
    let mut library = ResultLibrary::load(path).context("Failed to load results library")?;

    match action {
        LibraryAction::List => {
            if library.is_empty() {
                println!("📭 No saved results yet");
            }
            for entry in library.entries() {
                let size = entry.size_bytes.map(format_size).unwrap_or_default();
                println!(
                    "#{:<4} {}  {} → {}  {:.1}s {}",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.original,
                    entry.processed,
                    entry.processing_time_ms as f64 / 1000.0,
                    size
                );
            }
        },
        LibraryAction::Stats => println!("📊 {}", library.stats()),
        LibraryAction::Delete { id } => {
            let removed = library.remove(*id)?;
            library.save(path).context("Failed to save results library")?;
            println!("🗑️  Deleted #{} ({})", removed.id, removed.processed);
        },
        LibraryAction::Clear => {
            let count = library.len();
            library.clear();
            library.save(path).context("Failed to save results library")?;
            println!("🧹 Cleared {} result(s)", count);
        },
    }

    Ok(())
}

fn run_settings(action: &SettingsAction, path: &Path) -> Result<()> {
    let mut settings = Settings::load(path).context("Failed to load settings")?;

    match action {
        SettingsAction::Show => {
            println!("notifications         {}", on_off(settings.notifications));
            println!("auto_save             {}", on_off(settings.auto_save));
            println!("appearance            {}", settings.appearance);
            println!("language              {}", settings.language);
            println!("onboarding_completed  {}", on_off(settings.onboarding_completed));
            println!("\n(from {})", path.display());
        },
        SettingsAction::Set { key, value } => {
            settings.set(key, value)?;
            settings.save(path).context("Failed to save settings")?;
            println!("✅ {} = {}", key, value);
        },
    }

    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn run_config(cli: &Cli, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = CliConfigBuilder::load_base(cli.config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        },
        ConfigAction::Init { force } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(CliConfigBuilder::default_config_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            WorkflowConfig::default()
                .save(&path)
                .context("Failed to write config file")?;
            println!("📝 Wrote {}", path.display());
        },
    }
    Ok(())
}

fn run_onboarding(skip: bool, path: &Path) -> Result<()> {
    let mut flow = OnboardingFlow::default();
    if skip {
        flow.skip();
    }

    while let Some(step) = flow.current() {
        let (index, total) = flow.progress();
        println!("[{}/{}] {}", index + 1, total, step.title);
        println!("      {}", step.subtitle);
        println!("      {}\n", step.description);
        flow.next();
    }

    let mut settings = Settings::load(path).context("Failed to load settings")?;
    settings.onboarding_completed = true;
    settings.save(path).context("Failed to save settings")?;

    if skip {
        println!("Onboarding skipped");
    } else {
        println!("🎉 You're all set. Try `backzap remove <photo>`");
    }
    Ok(())
}
