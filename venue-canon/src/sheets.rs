//! CSV sheets for curation and batch exports
//!
//! - Source table: one column per provider, cells are raw venue names
//! - Canonical sheet: `corrected, city, capacity`
//! - Mapping sheet: `raw_name, canonical_name`

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::engine::batch::{BatchOutput, SourceTable};

/// Export file names written by [`write_batch_output`]
pub const ORIGINAL_FILE: &str = "original_venues.csv";
pub const STANDARDIZED_FILE: &str = "standardized_venues.csv";
pub const OVERRIDES_FILE: &str = "venue_overrides.csv";

/// Sheet reading/writing errors
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sheet format error: {0}")]
    Format(String),
}

pub type SheetResult<T> = Result<T, SheetError>;

/// Row of the canonical sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRow {
    #[serde(default)]
    pub corrected: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub capacity: String,
}

/// Row of the mapping (override) sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    #[serde(default)]
    pub raw_name: String,
    #[serde(default)]
    pub canonical_name: String,
}

/// Read a provider-per-column source table
///
/// Empty cells are padding and are dropped. Duplicate or blank headers are
/// rejected.
pub fn read_source_tables(path: &Path) -> SheetResult<Vec<SourceTable>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut seen = HashSet::new();
    let mut tables: Vec<SourceTable> = Vec::with_capacity(headers.len());
    for header in headers.iter() {
        let provider = header.trim();
        if provider.is_empty() {
            return Err(SheetError::Format("blank provider column header".to_string()));
        }
        if !seen.insert(provider.to_string()) {
            return Err(SheetError::Format(format!("duplicate provider column {:?}", provider)));
        }
        tables.push(SourceTable::new(provider, Vec::<String>::new()));
    }

    for record in reader.records() {
        let record = record?;
        for (table, cell) in tables.iter_mut().zip(record.iter()) {
            if !cell.is_empty() {
                table.names.push(cell.to_string());
            }
        }
    }

    Ok(tables)
}

/// Write a provider-per-column table (original or standardized export)
pub fn write_table(path: &Path, providers: &[String], rows: &[Vec<String>]) -> SheetResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(providers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `raw_name, canonical_name` pairs for curators
pub fn write_mapping<'a>(path: &Path, rows: impl IntoIterator<Item = (&'a str, &'a str)>) -> SheetResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (raw_name, canonical_name) in rows {
        writer.serialize(MappingRow {
            raw_name: raw_name.to_string(),
            canonical_name: canonical_name.to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the three batch exports into `out_dir` (created if missing)
pub fn write_batch_output(out_dir: &Path, output: &BatchOutput) -> SheetResult<()> {
    std::fs::create_dir_all(out_dir)?;
    write_table(&out_dir.join(ORIGINAL_FILE), &output.providers, &output.original)?;
    write_table(&out_dir.join(STANDARDIZED_FILE), &output.providers, &output.standardized)?;
    write_mapping(&out_dir.join(OVERRIDES_FILE), output.override_rows())?;
    Ok(())
}

pub fn read_canonical_sheet(path: &Path) -> SheetResult<Vec<CanonicalRow>> {
    read_rows(path)
}

pub fn read_mapping_sheet(path: &Path) -> SheetResult<Vec<MappingRow>> {
    read_rows(path)
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> SheetResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
