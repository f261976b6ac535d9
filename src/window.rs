//! Sync window resolution.
//!
//! Turns the configured sync options plus the persisted checkpoint into
//! the concrete window handed to the fetch, and advances the in-memory
//! checkpoint to the current instant. The caller persists the checkpoint
//! only after the run succeeds, so a failed run reprocesses the same
//! window on the next attempt.
//!
//! Two conventions are supported. The canonical one parses `date_from` /
//! `date_to` as date expressions and, when `only_changes_since_last_run`
//! is set, narrows the change set via `updated_from` taken from the
//! checkpoint. The legacy one (`legacy_sentinels: true`) instead honors
//! the sentinel strings `"none"` (bound omitted) and `"last run"`
//! (`date_from` substituted from the checkpoint).

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};

use crate::{
    checkpoint::{CheckpointState, KEY_LAST_RUN},
    config::SyncOptions,
    dates::parse_date_expr,
    error::ExtractError,
};

const VAL_NONE: &str = "none";
const VAL_LAST_RUN: &str = "last run";

/// The concrete date window for one run. Immutable once resolved and
/// consumed exactly once by the fetch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub updated_from: Option<DateTime<Utc>>,
}

pub fn resolve(
    options: &SyncOptions,
    state: &mut CheckpointState,
    now: DateTime<Utc>,
) -> Result<SyncWindow> {
    let mut date_from_expr = options.date_from.clone();
    let mut date_to_expr = options.date_to.clone();

    if options.legacy_sentinels {
        warn!("Legacy sync option sentinels are enabled; prefer only_changes_since_last_run");
        if date_from_expr.as_deref() == Some(VAL_LAST_RUN) {
            date_from_expr = Some(
                state
                    .get(KEY_LAST_RUN)
                    .unwrap_or(VAL_NONE)
                    .to_string(),
            );
        }
        if date_from_expr.as_deref() == Some(VAL_NONE) {
            date_from_expr = None;
        }
        if date_to_expr.as_deref() == Some(VAL_NONE) {
            date_to_expr = None;
        }
    }

    let date_from = parse_bound(date_from_expr.as_deref(), "Date From", now)?;
    let date_to = parse_bound(date_to_expr.as_deref(), "Date To", now)?;

    let updated_from = if !options.legacy_sentinels && options.only_changes_since_last_run {
        match state.get(KEY_LAST_RUN) {
            Some(last_run) => Some(parse_date_expr(last_run, now).with_context(|| {
                format!("Stored checkpoint value '{last_run}' is not a valid instant")
            })?),
            None => {
                debug!("No checkpoint found; returning the full change set for the window");
                None
            }
        }
    } else {
        None
    };

    if let (Some(from), Some(to)) = (date_from, date_to) {
        if from > to {
            warn!("Date From ({from}) is after Date To ({to}); the API will return no records");
        }
    }

    // Advance the in-memory checkpoint regardless of what was resolved;
    // persistence is the caller's decision at successful run completion.
    state.insert(KEY_LAST_RUN, now.to_rfc3339_opts(SecondsFormat::Secs, false));

    Ok(SyncWindow {
        date_from,
        date_to,
        updated_from,
    })
}

fn parse_bound(
    expr: Option<&str>,
    field: &str,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    match expr {
        None => Ok(None),
        Some(raw) => match parse_date_expr(raw, now) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(err) => Err(ExtractError::config(format!(
                "{field} parameter could not be parsed: {err}"
            ))
            .into()),
        },
    }
}
