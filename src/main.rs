use anyhow::{Context, Result};
use clap::Parser;
use common::cli::utils::{handle_common_command, init_logging, load_config, validate_config};
use common::cli::{Cli, Command};
use retention::{RetentionPolicy, create_store};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.common);

    let config = load_config(&cli)?;
    let command = cli.command.clone().unwrap_or_default();

    if handle_common_command(&command, &config)? {
        return Ok(());
    }

    validate_config(&config)?;
    let policy =
        RetentionPolicy::from_config(&config.policy).context("Invalid retention policy")?;

    if command == Command::Validate {
        tracing::info!(
            tier = %policy.tier(),
            mode = %policy.mode(),
            keep = policy.keep(),
            max_age_secs = ?policy.max_age().map(|d| d.as_secs()),
            "Retention policy is valid"
        );
        return Ok(());
    }

    let store = create_store(&config.storage).context("Failed to initialize storage backend")?;

    let report = policy
        .enforce(store.as_ref())
        .await
        .context("Retention enforcement failed")?;
    report.log();

    Ok(())
}
