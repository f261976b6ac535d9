//! CSV and manifest output.
//!
//! Drains a [`Table`] into `out/tables/<name>.csv` plus a JSON manifest
//! describing schema, primary key, and load mode. Following the platform
//! convention the CSV is headerless and the column list lives in the
//! manifest; the debug flag additionally writes the header row into the
//! CSV for easier inspection.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use csv::QuoteStyle;
use log::info;
use serde::Serialize;
use serde_json::Value;

use crate::table::{DeleteWhere, Table};

#[derive(Debug, Serialize)]
struct Manifest {
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<String>>,
    primary_key: Vec<String>,
    incremental: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    delete_where: Option<DeleteWhere>,
}

/// Write the table's CSV and manifest, draining the record stream.
///
/// Every pull on the stream may block on an upstream page fetch; a
/// mid-stream failure propagates and leaves the run failed before the
/// checkpoint is persisted.
pub fn write_table(
    table: Table,
    tables_dir: &Path,
    incremental: bool,
    include_header: bool,
) -> Result<PathBuf> {
    fs::create_dir_all(tables_dir)
        .with_context(|| format!("Creating output directory {tables_dir:?}"))?;
    let csv_path = tables_dir.join(format!("{}.csv", table.name));

    let mut writer = csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_path(&csv_path)
        .with_context(|| format!("Creating output file {csv_path:?}"))?;

    let mut row_count = 0usize;
    if let Some(columns) = &table.columns {
        if include_header {
            writer
                .write_record(columns.iter())
                .context("Writing CSV header")?;
        }
        for record in table.records {
            let record = record.with_context(|| format!("Reading record {}", row_count + 1))?;
            let row = columns
                .iter()
                .map(|column| match record.get(column) {
                    Some(value) => render_value(value),
                    None => Ok(String::new()),
                })
                .collect::<Result<Vec<String>>>()?;
            writer
                .write_record(row.iter())
                .with_context(|| format!("Writing record {}", row_count + 1))?;
            row_count += 1;
        }
    }
    writer.flush().context("Flushing CSV output")?;

    let manifest = Manifest {
        columns: table.columns.clone(),
        primary_key: table.primary_key.clone(),
        incremental,
        delete_where: table.delete_where.clone(),
    };
    let manifest_path = tables_dir.join(format!("{}.csv.manifest", table.name));
    let manifest_file = File::create(&manifest_path)
        .with_context(|| format!("Creating manifest {manifest_path:?}"))?;
    serde_json::to_writer_pretty(manifest_file, &manifest)
        .with_context(|| format!("Writing manifest {manifest_path:?}"))?;

    info!(
        "Wrote {row_count} record(s) to {:?} ({} load)",
        csv_path,
        if incremental { "incremental" } else { "full" }
    );
    Ok(csv_path)
}

/// Render one cell. Scalars print plainly, null is empty, and sequence or
/// mapping values pass through as compact JSON.
fn render_value(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).context("Serializing opaque value")?,
    })
}
