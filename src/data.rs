//! Data Loading and Management
//!
//! Dataset and mapping-file I/O with Polars. Every column is read as a
//! string so that columns outside the two target columns pass through the
//! rewrite byte for byte.

use crate::error::{Result as StdResult, StandardizeError, WarningSummary};
use crate::mapping_store::MappingStore;
use crate::types::{CLINIC_NAME_COLUMN, ISOLATED_ORGANISMS_COLUMN};
use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

/// Columns every input dataset must carry
pub const REQUIRED_COLUMNS: [&str; 2] = [CLINIC_NAME_COLUMN, ISOLATED_ORGANISMS_COLUMN];

/// Check both target columns are present
///
/// Reports the first missing column as `ColumnNotFound`.
pub fn validate_schema(df: &DataFrame) -> StdResult<()> {
    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    for &expected in REQUIRED_COLUMNS.iter() {
        if !names.iter().any(|n| n == expected) {
            return Err(StandardizeError::ColumnNotFound(expected.to_string()));
        }
    }
    Ok(())
}

/// Load a CSV dataset with every column typed as string
pub fn load_dataset(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.into()))
        .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
        .finish()
        .with_context(|| format!("Failed to load dataset CSV: {:?}", path))?;

    tracing::info!("Loaded dataset {:?}: {} rows x {} columns", path, df.height(), df.width());
    Ok(df)
}

/// Write a dataset as CSV with header
pub fn write_dataset(df: &DataFrame, path: &Path) -> Result<()> {
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df.clone())
        .with_context(|| format!("Failed to write dataset CSV: {:?}", path))?;

    tracing::info!("Wrote {} rows to {:?}", df.height(), path);
    Ok(())
}

/// Read a mapping file; malformed lines come back as warnings
pub fn read_mapping_file(path: &Path, delimiter: char) -> Result<(MappingStore, WarningSummary)> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read mapping file: {:?}", path))?;
    Ok(MappingStore::load(&bytes, delimiter))
}

pub fn write_mapping_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)
        .with_context(|| format!("Failed to write mapping file: {:?}", path))
}

/// Build a string DataFrame from field-name → value records
///
/// `columns` fixes the column order; a field absent from a record is null.
pub fn frame_from_records(
    columns: &[&str],
    records: &[FxHashMap<String, String>],
) -> StdResult<DataFrame> {
    let series: Vec<Column> = columns
        .iter()
        .map(|&name| {
            let values: Vec<Option<&str>> = records
                .iter()
                .map(|record| record.get(name).map(|v| v.as_str()))
                .collect();
            Column::from(Series::new(name.into(), values))
        })
        .collect();

    Ok(DataFrame::new(series)?)
}
