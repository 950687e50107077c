use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use ctwatch_daemon::cli::DaemonCli;
use ctwatch_daemon::logging::init_tracing;
use ctwatch_daemon::orchestrator::{self, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = orchestrator::load_config(&cli.config).await?;
    orchestrator::apply_cli_overrides(
        &mut config,
        cli.log_level,
        cli.log_format,
        cli.log_list_url,
    )?;

    if cli.validate {
        let categories = orchestrator::validate(&config, &cli.rules).await?;
        println!(
            "configuration OK ({} rule categories, log list {})",
            categories, config.monitor.log_list_url
        );
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ctwatch-daemon starting");

    let rules = orchestrator::load_rules(&cli.rules).await?;
    let mut orchestrator = Orchestrator::build_from_config(config, rules).await?;
    orchestrator
        .run(cli.duration_secs.map(Duration::from_secs))
        .await?;

    tracing::info!("ctwatch-daemon shut down");
    Ok(())
}
