use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Configuration;

/// Command line of the `retention` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "retention",
    about = "flexible retention policy enforcement",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Arguments shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        help = "Enable quiet mode (minimal output)"
    )]
    pub quiet: bool,
}

/// Flags that take precedence over the configuration file and environment.
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    #[arg(
        long,
        global = true,
        help = "Period of backup to handle (daily, weekly, etc). Pass an empty value to apply policy to snapshots"
    )]
    pub period: Option<String>,

    #[arg(long, global = true, help = "Comparison mode (count or datetime)")]
    pub mode: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Number of backups to keep for this retention period"
    )]
    pub num: Option<usize>,

    #[arg(
        long,
        global = true,
        value_parser = humantime::parse_duration,
        help = "Age window for datetime mode (e.g. 10days)"
    )]
    pub max_age: Option<Duration>,

    #[arg(
        long,
        global = true,
        help = "Log copies and deletes without executing them"
    )]
    pub dry_run: bool,

    #[arg(
        long,
        global = true,
        help = "Which storage backend to use (local, s3 or memory; memory starts empty and is only useful for smoke testing)"
    )]
    pub backend: Option<String>,

    #[arg(
        long,
        global = true,
        help = "S3 bucket name (required when using s3 backend)"
    )]
    pub bucket: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Local directory name (required when using local backend)"
    )]
    pub dir: Option<String>,
}

impl OverrideArgs {
    /// Apply every flag that was given on top of the loaded configuration.
    pub fn apply(&self, config: &mut Configuration) {
        if let Some(period) = &self.period {
            config.policy.period = period.clone();
        }
        if let Some(mode) = &self.mode {
            config.policy.mode = mode.clone();
        }
        if let Some(num) = self.num {
            config.policy.keep = Some(num);
        }
        if let Some(max_age) = self.max_age {
            config.policy.max_age = Some(max_age);
        }
        if self.dry_run {
            config.policy.dry_run = true;
        }
        if let Some(backend) = &self.backend {
            config.storage.backend = backend.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.storage.bucket = Some(bucket.clone());
        }
        if let Some(dir) = &self.dir {
            config.storage.dir = Some(dir.clone());
        }
    }
}

/// Subcommands of the `retention` binary
#[derive(Subcommand, Debug, Clone, Default, PartialEq, Eq)]
pub enum Command {
    /// Promote the latest snapshot and prune the tier (default behavior)
    #[default]
    Enforce,
    /// Show effective configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Initialize logging based on CLI arguments. `RUST_LOG` wins when set.
    pub fn init_logging(args: &CommonArgs) {
        let level = if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(args: &Cli) -> Result<Configuration> {
        let mut config = match &args.common.config {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")?
            }
            None => Configuration::load().context("Failed to load configuration")?,
        };

        args.overrides.apply(&mut config);
        Ok(config)
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("Retention Configuration:");
            println!("========================");
            let period = if config.policy.period.is_empty() {
                "(snapshot)"
            } else {
                config.policy.period.as_str()
            };
            println!("Period: {period}");
            println!("Mode: {}", config.policy.mode);
            match config.policy.keep {
                Some(keep) => println!("Keep: {keep}"),
                None => println!("Keep: (unset)"),
            }
            if let Some(max_age) = config.policy.max_age {
                println!("Max age: {}", humantime::format_duration(max_age));
            }
            println!("Dry run: {}", config.policy.dry_run);
            println!("Backend: {}", config.storage.backend);
            if let Some(dir) = &config.storage.dir {
                println!("Directory: {dir}");
            }
            if let Some(bucket) = &config.storage.bucket {
                println!("Bucket: {bucket}");
            }
            if let Some(endpoint) = &config.storage.endpoint {
                println!("Endpoint: {endpoint}");
            }
        }
        Ok(())
    }

    /// Validate the storage part of the configuration and report any issues.
    ///
    /// The policy part is validated by constructing the retention policy.
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");

        if config.policy.keep.is_none() {
            anyhow::bail!("num (policy.keep) is required");
        }

        config.storage.backend()?;

        log::info!("Configuration validation passed");
        Ok(())
    }

    /// Handle commands that don't require touching the store.
    ///
    /// Returns `true` when the command was handled.
    pub fn handle_common_command(command: &Command, config: &Configuration) -> Result<bool> {
        match command {
            Command::Config { json } => {
                display_config(config, *json)?;
                Ok(true)
            }
            Command::Validate | Command::Enforce => Ok(false),
        }
    }
}
