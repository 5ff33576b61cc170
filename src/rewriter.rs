//! Dataset Rewriter
//!
//! Replaces every token in the target column with its canonical value from
//! the mapping store. Cells are decomposed with the same `CellLayout` used
//! for extraction; other columns and null cells are left untouched.

use crate::config::StandardizerConfig;
use crate::error::{Result, StandardizeError};
use crate::mapping_store::MappingStore;
use crate::resolution::tokens::CellLayout;
use crate::types::TargetColumn;
use crate::utils::{normalize, rejoin};
use polars::prelude::*;

/// Rewrite the target column of `dataset`
///
/// Fails with `UnresolvedToken` if any non-empty token has no mapping; the
/// input frame is never modified.
pub fn apply(
    dataset: &DataFrame,
    store: &MappingStore,
    column: TargetColumn,
    config: &StandardizerConfig,
) -> Result<DataFrame> {
    let name = column.column_name();
    let cells = dataset.column(name)?.cast(&DataType::String)?;
    let cells = cells.str()?;

    let mut rewritten: Vec<Option<String>> = Vec::with_capacity(cells.len());
    let mut changed = 0usize;

    for (row, cell) in cells.into_iter().enumerate() {
        let Some(cell) = cell else {
            rewritten.push(None);
            continue;
        };

        let value = rewrite_cell(cell, row, store, column, config)?;
        if value != cell {
            changed += 1;
        }
        rewritten.push(Some(value));
    }

    let mut out = dataset.clone();
    out.with_column(Series::new(name.into(), rewritten))?;

    tracing::info!("Rewrote '{}': {} of {} cells changed", name, changed, out.height());
    Ok(out)
}

fn rewrite_cell(
    cell: &str,
    row: usize,
    store: &MappingStore,
    column: TargetColumn,
    config: &StandardizerConfig,
) -> Result<String> {
    match CellLayout::of(cell, column, config) {
        CellLayout::Whole(value) => match resolve(store, value, column, row)? {
            Some(canonical) => Ok(canonical.to_string()),
            None => Ok(cell.to_string()),
        },
        CellLayout::WithDepartment { location, department } => {
            let canonical = resolve(store, location, column, row)?.unwrap_or(location);
            let department = config
                .department_abbreviations
                .get(department)
                .map(|s| s.as_str())
                .unwrap_or(department);
            Ok(format!("{} {}", canonical, department))
        }
        CellLayout::Segments(segments) => {
            let mut replacements: Vec<&str> = Vec::with_capacity(segments.len());
            for segment in segments.iter().filter(|s| !s.is_empty()) {
                replacements.push(resolve(store, segment.value, column, row)?.unwrap_or(segment.value));
            }
            Ok(rejoin(&segments, replacements, config.organism_delimiter))
        }
    }
}

/// Canonical value for one token value; `None` when the value is blank
fn resolve<'s>(
    store: &'s MappingStore,
    value: &str,
    column: TargetColumn,
    row: usize,
) -> Result<Option<&'s str>> {
    let key = normalize(value);
    if key.is_empty() {
        return Ok(None);
    }
    match store.lookup(&key) {
        Some(canonical) => Ok(Some(canonical.as_str())),
        None => Err(StandardizeError::UnresolvedToken {
            column: column.column_name().to_string(),
            row,
            key,
        }),
    }
}
