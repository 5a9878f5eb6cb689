//! BackZap CLI
//!
//! Command-line frontend for the backzap image workflow.

#[cfg(feature = "cli")]
use backzap::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
