//! Schema inference, header normalization, and table assembly.
//!
//! [`create_table`] turns a single-pass stream of flattened records into a
//! [`Table`] descriptor without materializing it: the first record is
//! inspected through a one-element lookahead to fix the column set, the
//! header normalizer rewrites unsafe names, and the rename is applied
//! lazily over the reattached stream. The record sequence stays pull-based
//! end to end, so a still-paginating upstream is never forced.

use anyhow::{Result, anyhow};
use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::{error::ExtractError, flatten::FlatRecord, stream::Lookahead};

/// Lazy, fallible record sequence carried by a [`Table`].
pub type RecordStream = Box<dyn Iterator<Item = Result<FlatRecord>>>;

/// Destination-side row deletion spec, passed through to the manifest.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteWhere {
    pub column: String,
    pub values: Vec<String>,
    pub operator: String,
}

/// The sole handoff artifact to the sink: a named, schema-described,
/// lazily-evaluated table.
pub struct Table {
    pub name: String,
    /// `None` when the upstream stream was empty and no schema could be
    /// inferred.
    pub columns: Option<Vec<String>>,
    pub primary_key: Vec<String>,
    pub records: RecordStream,
    pub delete_where: Option<DeleteWhere>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("primary_key", &self.primary_key)
            .field("delete_where", &self.delete_where)
            .finish_non_exhaustive()
    }
}

/// Rewrites column names to satisfy destination identifier constraints.
/// Must return the same number of names in the same order; called exactly
/// once per run.
pub trait HeaderNormalizer {
    fn normalize_header(&self, columns: &[String]) -> Vec<String>;
}

/// Replaces characters outside `[A-Za-z0-9_]` with underscores and
/// deduplicates the result with numeric suffixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHeaderNormalizer;

impl HeaderNormalizer for DefaultHeaderNormalizer {
    fn normalize_header(&self, columns: &[String]) -> Vec<String> {
        let mut seen: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            let mut safe = column
                .chars()
                .map(|c| match c {
                    'a'..='z' | 'A'..='Z' | '0'..='9' | '_' => c,
                    _ => '_',
                })
                .collect::<String>();
            if safe.is_empty() {
                safe = "column".to_string();
            }
            if seen.contains(&safe) {
                let mut suffix = 1usize;
                while seen.contains(&format!("{safe}_{suffix}")) {
                    suffix += 1;
                }
                safe = format!("{safe}_{suffix}");
            }
            seen.push(safe);
        }
        seen
    }
}

/// Assemble a [`Table`] from a flattened record stream.
///
/// The stream is consumed at most one element ahead. An empty stream
/// yields a descriptor with no columns and an empty sequence; a primary
/// key absent from the inferred columns fails before any record reaches
/// the sink.
pub fn create_table(
    records: impl Iterator<Item = Result<FlatRecord>> + 'static,
    name: &str,
    primary_key: Vec<String>,
    delete_where: Option<DeleteWhere>,
    normalizer: &dyn HeaderNormalizer,
) -> Result<Table> {
    let mut records = Lookahead::new(records);

    let denormalized: Vec<String> = match records.peek_first() {
        None => {
            warn!("API returned no records for output table '{name}'");
            return Ok(Table {
                name: name.to_string(),
                columns: None,
                primary_key,
                records: Box::new(std::iter::empty()),
                delete_where,
            });
        }
        Some(Err(_)) => {
            // Surface the upstream failure instead of emitting a table.
            return match records.next() {
                Some(Err(err)) => Err(err),
                _ => Err(anyhow!("Lookahead lost its buffered element")),
            };
        }
        Some(Ok(first)) => first.keys().cloned().collect(),
    };

    let columns = normalizer.normalize_header(&denormalized);
    let rename: Vec<(String, String)> = denormalized
        .iter()
        .zip(columns.iter())
        .filter(|(original, normalized)| original != normalized)
        .map(|(original, normalized)| (original.clone(), normalized.clone()))
        .collect();

    let records: RecordStream = if rename.is_empty() {
        Box::new(records)
    } else {
        debug!(
            "Normalized {} column name(s) for table '{name}'",
            rename.len()
        );
        Box::new(records.map(move |record| record.map(|rec| rename_keys(rec, &rename))))
    };

    let missing = primary_key
        .iter()
        .filter(|pk| !columns.contains(*pk))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(ExtractError::config(format!(
            "Invalid primary key. Element(s) {} not found in columns: [{}]",
            missing.iter().map(|pk| format!("'{pk}'")).join(", "),
            columns.iter().join(", ")
        ))
        .into());
    }

    Ok(Table {
        name: name.to_string(),
        columns: Some(columns),
        primary_key,
        records,
        delete_where,
    })
}

fn rename_keys(record: FlatRecord, rename: &[(String, String)]) -> FlatRecord {
    record
        .into_iter()
        .map(|(key, value)| {
            let renamed = rename
                .iter()
                .find(|(original, _)| *original == key)
                .map(|(_, normalized)| normalized.clone())
                .unwrap_or(key);
            (renamed, value)
        })
        .collect()
}
