//! vzsync - VCenter → Zabbix inventory synchronization agent
//!
//! Batch tool run by hand or from cron:
//! - Exports VCenter VMs and Zabbix hosts to JSON snapshots
//! - Reports VMs missing from Zabbix and power/status mismatches
//! - Adds VMs to the VCenter host group and fixes host status (with dry-run)

mod cli;
mod commands;
mod config;
mod snapshot;
mod vcenter;
mod zabbix;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::{AgentConfig, LoggingConfig};
use snapshot::SnapshotStore;

/// Console logging always; file logging too when `logging.file` is set
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::io::stderr.and(Mutex::new(file)))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // .env optionnel
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config_path = AgentConfig::resolve_path(cli.config.as_deref());
    let config = AgentConfig::load(&config_path)?;
    init_logging(&config.logging)?;

    info!(
        "vzsync {} starting (config: {}, data dir: {})",
        env!("CARGO_PKG_VERSION"),
        config_path.display(),
        config.sync.data_dir.display()
    );
    let store = SnapshotStore::new(&config.sync.data_dir);

    let result = match cli.command {
        Commands::ExportVcenter => commands::export_vcenter(&config, &store).await,
        Commands::ExportZabbix => commands::export_zabbix(&config, &store).await,
        Commands::Compare => commands::compare(&config, &store),
        Commands::Status => commands::status(&config, &store),
        Commands::AddToGroup { dry_run } => commands::add_to_group(&config, &store, dry_run).await,
        Commands::ApplyStatus { dry_run, input } => commands::apply_status(&config, &store, &input, dry_run).await,
        Commands::Run { dry_run } => commands::run(&config, &store, dry_run).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
