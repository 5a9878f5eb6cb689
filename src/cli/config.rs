//! CLI configuration conversion
//!
//! Turns parsed command-line arguments into a [`WorkflowConfig`], layered on
//! top of an optional JSON config file.

use super::main_impl::RemoveArgs;
use crate::config::{default_config_dir, WorkflowConfig};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Default workflow config file (`<config_dir>/backzap/config.json`)
    pub(crate) fn default_config_path() -> PathBuf {
        default_config_dir().join("config.json")
    }

    /// Load the base configuration; a missing default file yields defaults
    pub(crate) fn load_base(path: Option<&Path>) -> Result<WorkflowConfig> {
        match path {
            Some(path) => WorkflowConfig::load(path)
                .with_context(|| format!("Failed to load config file {}", path.display())),
            None => {
                let path = Self::default_config_path();
                if path.exists() {
                    WorkflowConfig::load(&path)
                        .with_context(|| format!("Failed to load config file {}", path.display()))
                } else {
                    Ok(WorkflowConfig::default())
                }
            },
        }
    }

    /// Apply `remove` arguments on top of `base`
    pub(crate) fn from_remove_args(args: &RemoveArgs, base: WorkflowConfig) -> Result<WorkflowConfig> {
        let mut config = base;

        if let Some(delay_ms) = args.delay_ms {
            config.simulated_delay_ms = delay_ms;
        }
        if let Some(timeout_secs) = args.timeout_secs {
            // 0 disables the timeout
            config.removal_timeout_ms =
                (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs).as_millis() as u64);
        }
        if let Some(endpoint) = &args.endpoint {
            config.remote_endpoint = Some(endpoint.clone());
        }
        if let Some(output) = &args.output {
            config.output_dir = Some(output.clone());
        }
        if let Some(downloads) = &args.downloads_dir {
            config.downloads_dir = downloads.clone();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate `remove` arguments for consistency
    pub(crate) fn validate_remove_args(args: &RemoveArgs) -> Result<()> {
        if args.fail && args.endpoint.is_some() {
            anyhow::bail!("--fail only applies to the simulated service, not --endpoint");
        }
        if args.compare && args.inputs.len() > 1 {
            log::warn!("--compare with several inputs toggles the overlay for each result");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn remove_args(argv: &[&str]) -> RemoveArgs {
        let mut full = vec!["backzap", "remove"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Remove(args) => args,
            _ => panic!("expected remove subcommand"),
        }
    }

    #[test]
    fn test_cli_config_conversion() {
        let args = remove_args(&["--delay-ms", "50", "--timeout-secs", "3", "-o", "out", "a.jpg"]);
        let config = CliConfigBuilder::from_remove_args(&args, WorkflowConfig::default()).unwrap();

        assert_eq!(config.simulated_delay(), Duration::from_millis(50));
        assert_eq!(config.removal_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert!(config.remote_endpoint.is_none());
    }

    #[test]
    fn test_zero_timeout_disables_timeout() {
        let args = remove_args(&["--timeout-secs", "0", "a.jpg"]);
        let config = CliConfigBuilder::from_remove_args(&args, WorkflowConfig::default()).unwrap();
        assert_eq!(config.removal_timeout(), None);
    }

    #[test]
    fn test_args_keep_base_values() {
        let base = WorkflowConfig::builder()
            .simulated_delay(Duration::from_millis(7))
            .build()
            .unwrap();
        let args = remove_args(&["a.jpg"]);
        let config = CliConfigBuilder::from_remove_args(&args, base.clone()).unwrap();
        assert_eq!(config, base);
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let args = remove_args(&["--endpoint", "ftp://host/remove", "a.jpg"]);
        assert!(CliConfigBuilder::from_remove_args(&args, WorkflowConfig::default()).is_err());
    }

    #[test]
    fn test_cli_validation() {
        assert!(CliConfigBuilder::validate_remove_args(&remove_args(&["a.jpg"])).is_ok());

        let args = remove_args(&["--fail", "--endpoint", "http://localhost/remove", "a.jpg"]);
        assert!(CliConfigBuilder::validate_remove_args(&args).is_err());
    }
}
