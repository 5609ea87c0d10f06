//! # Pagient Reconciler
//!
//! Runs the reconciliation engine as a standalone process: loads layered
//! configuration, optionally migrates the patient database, then polls the
//! practice-management queue until Ctrl-C.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use pagient_core::config::ConfigManager;
use pagient_core::database::migrator::run_migrations;
use pagient_core::logging::init_structured_logging;
use pagient_core::reconciliation::ReconciliationSystem;

#[derive(Parser)]
#[command(name = "pagient-reconciler")]
#[command(about = "Page patients when the practice-management queue reaches them")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Directory holding pagient.toml and pagient.<env>.toml
    #[arg(short, long, env = "PAGIENT_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Environment whose override file is applied (default: PAGIENT_ENV or development)
    #[arg(short, long)]
    environment: Option<String>,

    /// Apply pending patient database migrations before polling
    #[arg(long)]
    migrate: bool,

    /// Validate configuration, print it with credentials masked and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_structured_logging();

    let environment = cli
        .environment
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(Some(cli.config_dir), &environment)
        .context("loading configuration")?;

    if cli.check {
        println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
        return Ok(());
    }

    let system = ReconciliationSystem::bootstrap(manager.config().clone())
        .await
        .context("bootstrapping reconciliation system")?;

    if cli.migrate {
        if let Some(pool) = system.pool() {
            run_migrations(pool).await.context("running migrations")?;
        }
    }

    system.start()?;
    info!(environment = %environment, "Pagient reconciler running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutdown signal received");

    system.shutdown().await?;
    Ok(())
}
