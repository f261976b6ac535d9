//! Configuration model and validation.
//!
//! The extractor reads a `config.json` from the data directory. Closed-set
//! values (`endpoint`, `load_type`) are serde enums, so an unrecognized
//! value fails at parse time with a readable message rather than hitting
//! an unexpected branch later.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::Result;
use serde::Deserialize;

use crate::error::ExtractError;

pub const DEFAULT_BASE_URL: &str = "https://api.tempo.io/4";

#[derive(Debug, Deserialize)]
struct ConfigFile {
    parameters: Config,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "#api_token")]
    pub api_token: String,
    #[serde(default)]
    pub debug: bool,
    pub endpoint: Endpoint,
    pub destination: Destination,
    #[serde(default)]
    pub sync_options: Option<SyncOptions>,
    /// Override for the Tempo API base URL, mainly for testing.
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Worklogs,
}

impl Endpoint {
    /// Endpoints whose fetch is windowed and therefore cannot run without
    /// sync options.
    pub fn requires_sync_options(&self) -> bool {
        matches!(self, Endpoint::Worklogs)
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Endpoint::Worklogs => "worklogs",
        }
    }

    pub fn primary_key(&self) -> Vec<String> {
        match self {
            Endpoint::Worklogs => vec!["tempoWorklogId".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Destination {
    pub load_type: LoadType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    FullLoad,
    IncrementalLoad,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncOptions {
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub only_changes_since_last_run: bool,
    /// Honor the legacy `"none"` / `"last run"` sentinel strings in
    /// `date_from` / `date_to` instead of the boolean convention above.
    #[serde(default)]
    pub legacy_sentinels: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| {
            ExtractError::config(format!("Cannot open configuration file {path:?}: {err}"))
        })?;
        let parsed: ConfigFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| ExtractError::config(format!("Invalid configuration: {err}")))?;
        let config = parsed.parameters;
        if config.api_token.is_empty() {
            return Err(ExtractError::config("API token must not be empty").into());
        }
        Ok(config)
    }

    pub fn incremental(&self) -> bool {
        self.destination.load_type == LoadType::IncrementalLoad
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}
