//! Error taxonomy for the standardization engine
//!
//! Fatal conditions are `StandardizeError` variants. Recoverable conditions
//! (empty tokens, malformed mapping lines) are `Warning` values collected into
//! a `WarningSummary` so that a load or parse never aborts on them.

use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;

/// Fatal errors surfaced verbatim to the calling collaborator
#[derive(Debug, Error)]
pub enum StandardizeError {
    /// A required column is absent from the input dataset
    #[error("column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Rewrite attempted while a token still has no mapping
    #[error("unresolved token '{key}' in column '{column}' at row {row}")]
    UnresolvedToken {
        column: String,
        row: usize,
        key: String,
    },

    /// Session action invoked in a state that does not accept it
    #[error("cannot {action} while session is {state}")]
    InvalidTransition { action: &'static str, state: String },

    /// Decision rejected (unknown token, bad rank, empty free text)
    #[error("invalid decision: {0}")]
    InvalidDecision(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StandardizeError>;

/// Non-fatal condition recorded during parsing or loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Warning {
    /// Cell segment that normalized to nothing; dropped
    EmptyToken { column: String, row: usize, index: usize },

    /// Mapping file line skipped during load
    MalformedMappingLine { line: usize, reason: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::EmptyToken { column, row, index } => {
                write!(f, "empty token dropped in '{}' (row {}, segment {})", column, row, index)
            }
            Warning::MalformedMappingLine { line, reason } => {
                write!(f, "malformed mapping line {}: {}", line, reason)
            }
        }
    }
}

/// Aggregated warnings for one load or parse step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarningSummary {
    pub warnings: Vec<Warning>,
}

impl WarningSummary {
    pub fn push(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: WarningSummary) {
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn empty_tokens(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, Warning::EmptyToken { .. }))
            .count()
    }

    pub fn malformed_lines(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, Warning::MalformedMappingLine { .. }))
            .count()
    }
}
