pub mod checkpoint;
pub mod cli;
pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod flatten;
pub mod sink;
pub mod stream;
pub mod table;
pub mod window;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    checkpoint::CheckpointState,
    cli::Cli,
    client::{TempoClient, WorklogSource},
    config::{Config, Endpoint},
    error::ExtractError,
    table::DefaultHeaderNormalizer,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging(debug_mode: bool) {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            let level = if debug_mode {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            };
            builder.filter_module("tempo_extract", level);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config_path())?;
    init_logging(config.debug);
    debug!("Configured endpoint: {:?}", config.endpoint);

    let mut state = CheckpointState::load(&cli.state_in_path())?;

    let window = match &config.sync_options {
        Some(options) => window::resolve(options, &mut state, Utc::now())?,
        None if config.endpoint.requires_sync_options() => {
            return Err(ExtractError::config("Sync Options must be defined.").into());
        }
        None => window::SyncWindow {
            date_from: None,
            date_to: None,
            updated_from: None,
        },
    };
    info!(
        "Resolved sync window: from {:?} to {:?}, changes since {:?}",
        window.date_from, window.date_to, window.updated_from
    );

    let client = TempoClient::new(config.base_url(), &config.api_token)?;
    match config.endpoint {
        Endpoint::Worklogs => extract_worklogs(&client, &config, &window, &cli)?,
    }

    // Persisting the checkpoint is the final step: a failed run leaves the
    // on-disk state untouched and the next run reprocesses the window.
    if !state.is_empty() {
        let out_path = cli.state_out_path();
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Creating state directory {parent:?}"))?;
        }
        state.save(&out_path)?;
        debug!("Checkpoint persisted to {out_path:?}");
    }
    Ok(())
}

fn extract_worklogs(
    source: &dyn WorklogSource,
    config: &Config,
    window: &window::SyncWindow,
    cli: &Cli,
) -> Result<()> {
    let raw_records = source.fetch_worklogs(window)?;
    let flattened = raw_records.map(|record| record.and_then(flatten::flatten_record));
    let worklogs = table::create_table(
        flattened,
        config.endpoint.table_name(),
        config.endpoint.primary_key(),
        None,
        &DefaultHeaderNormalizer,
    )?;
    sink::write_table(
        worklogs,
        &cli.tables_out_dir(),
        config.incremental(),
        config.debug,
    )?;
    Ok(())
}
