//! Token Extraction
//!
//! Turns target-column cells into tokens. The same cell layout drives the
//! rewriter, so extraction and rewriting always agree on what a token is.

use crate::config::StandardizerConfig;
use crate::error::{Result, Warning, WarningSummary};
use crate::types::{TargetColumn, Token, TokenPosition};
use crate::utils::normalization::Segments;
use crate::utils::{clean_organism_name, collapse_whitespace, normalize, split, split_department};
use polars::prelude::*;
use rustc_hash::FxHashSet;

/// How one cell decomposes into token values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellLayout<'a> {
    /// Clinic name: the whole (trimmed) cell
    Whole(&'a str),
    /// Clinic name with a trailing department kept outside the mapping
    WithDepartment { location: &'a str, department: &'a str },
    /// Organisms: delimiter-separated segments
    Segments(Segments<'a>),
}

impl<'a> CellLayout<'a> {
    pub fn of(cell: &'a str, column: TargetColumn, config: &StandardizerConfig) -> Self {
        match column {
            TargetColumn::IsolatedOrganisms => {
                CellLayout::Segments(split(cell, config.organism_delimiter))
            }
            TargetColumn::ClinicName if config.clinic_department_suffix => {
                match split_department(cell) {
                    Some((location, department)) => CellLayout::WithDepartment { location, department },
                    None => CellLayout::Whole(cell.trim()),
                }
            }
            TargetColumn::ClinicName => CellLayout::Whole(cell.trim()),
        }
    }

    /// (segment index, value) pairs, empty values included
    pub fn values(&self) -> Vec<(usize, &'a str)> {
        match self {
            CellLayout::Whole(value) => vec![(0, *value)],
            CellLayout::WithDepartment { location, .. } => vec![(0, *location)],
            CellLayout::Segments(segments) => {
                segments.iter().map(|s| (s.index, s.value)).collect()
            }
        }
    }
}

/// Display form offered when a value is kept as is
pub fn display_form(value: &str, column: TargetColumn, config: &StandardizerConfig) -> String {
    match column {
        TargetColumn::IsolatedOrganisms if config.clean_organism_qualifiers => {
            let cleaned = clean_organism_name(value);
            if cleaned.is_empty() {
                collapse_whitespace(value)
            } else {
                cleaned
            }
        }
        _ => collapse_whitespace(value),
    }
}

/// Distinct tokens of one column, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct ColumnTokens {
    pub tokens: Vec<Token>,
    /// Non-empty token occurrences across all rows
    pub occurrences: usize,
    pub warnings: WarningSummary,
}

/// Extract distinct tokens from the target column
///
/// Null cells are skipped silently; values that normalize to nothing are
/// dropped with an `EmptyToken` warning.
pub fn extract_tokens(
    df: &DataFrame,
    column: TargetColumn,
    config: &StandardizerConfig,
) -> Result<ColumnTokens> {
    let name = column.column_name();
    let cells = df.column(name)?.cast(&DataType::String)?;
    let cells = cells.str()?;

    let mut out = ColumnTokens::default();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    for (row, cell) in cells.into_iter().enumerate() {
        let Some(cell) = cell else { continue };

        for (index, value) in CellLayout::of(cell, column, config).values() {
            let key = normalize(value);
            if key.is_empty() {
                out.warnings.push(Warning::EmptyToken {
                    column: name.to_string(),
                    row,
                    index,
                });
                continue;
            }

            out.occurrences += 1;
            if !seen.insert(key.clone()) {
                continue;
            }

            out.tokens.push(Token {
                raw: value.to_string(),
                display: display_form(value, column, config),
                key,
                column,
                position: TokenPosition { row, index },
            });
        }
    }

    tracing::debug!(
        "Extracted {} distinct tokens ({} occurrences) from '{}'",
        out.tokens.len(),
        out.occurrences,
        name
    );

    Ok(out)
}
