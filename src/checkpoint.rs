//! Checkpoint state persistence.
//!
//! The state is a flat string map stored as JSON in the data directory
//! (`in/state.json` on the way in, `out/state.json` on the way out). A
//! missing input file is an empty state, not an error; the caller only
//! persists the state after the whole run has succeeded.

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// State key holding the instant through which data has been extracted.
/// Kept verbatim from earlier releases so existing state files carry over.
pub const KEY_LAST_RUN: &str = "last_run_downloaded_data_up_to_datetime";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointState(BTreeMap<String, String>);

impl CheckpointState {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = File::open(path).with_context(|| format!("Opening state file {path:?}"))?;
        let state = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing state file {path:?}"))?;
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating state file {path:?}"))?;
        serde_json::to_writer_pretty(file, self)
            .with_context(|| format!("Writing state file {path:?}"))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_state_file_loads_as_empty() {
        let dir = tempdir().expect("temp dir");
        let state = CheckpointState::load(&dir.path().join("state.json")).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn state_round_trips_through_disk() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("state.json");
        let mut state = CheckpointState::default();
        state.insert(KEY_LAST_RUN, "2023-06-01T12:00:00+00:00");
        state.save(&path).unwrap();

        let loaded = CheckpointState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.get(KEY_LAST_RUN), Some("2023-06-01T12:00:00+00:00"));
    }

    #[test]
    fn malformed_state_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(CheckpointState::load(&path).is_err());
    }
}
