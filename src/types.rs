//! Core data model shared by the engine components

use crate::utils::collapse_whitespace;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CLINIC_NAME_COLUMN: &str = "Clinic Name";
pub const ISOLATED_ORGANISMS_COLUMN: &str = "Isolated Organisms";

/// The two columns the engine standardizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetColumn {
    /// Single-valued: the whole cell is one token
    ClinicName,
    /// Multi-valued: delimiter-separated tokens, reviewed in genus batches
    IsolatedOrganisms,
}

impl TargetColumn {
    pub fn column_name(&self) -> &'static str {
        match self {
            TargetColumn::ClinicName => CLINIC_NAME_COLUMN,
            TargetColumn::IsolatedOrganisms => ISOLATED_ORGANISMS_COLUMN,
        }
    }

    /// Parse a column header as shown in the dataset
    pub fn from_column_name(name: &str) -> Option<Self> {
        match name {
            CLINIC_NAME_COLUMN => Some(TargetColumn::ClinicName),
            ISOLATED_ORGANISMS_COLUMN => Some(TargetColumn::IsolatedOrganisms),
            _ => None,
        }
    }

    pub fn is_multi_valued(&self) -> bool {
        matches!(self, TargetColumn::IsolatedOrganisms)
    }
}

impl fmt::Display for TargetColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Where a token was first seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TokenPosition {
    pub row: usize,
    /// Segment index inside a multi-valued cell (always 0 for clinic names)
    pub index: usize,
}

/// Atomic unit extracted from a cell for matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Trimmed text as it appeared in the cell
    pub raw: String,
    /// Lookup key (`normalize(raw)`)
    pub key: String,
    /// Suggested spelling when the user keeps the value as is
    pub display: String,
    pub column: TargetColumn,
    pub position: TokenPosition,
}

/// Standardized spelling representing a cluster of raw tokens
///
/// Whitespace is trimmed and collapsed on construction; never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalValue(String);

impl CanonicalValue {
    pub fn new(text: &str) -> Option<Self> {
        let value = collapse_whitespace(text);
        if value.is_empty() {
            None
        } else {
            Some(CanonicalValue(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scored suggestion for one token (transient, never persisted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchCandidate {
    pub token_key: String,
    pub canonical: CanonicalValue,
    /// Similarity in [0, 100]
    pub score: u8,
}

/// How a decision's canonical value was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResolutionSource {
    /// Picked from the ranked list (0-based rank)
    FromCandidate(usize),
    /// Typed in by the user
    FromFreeText(String),
    /// Already present in the mapping store
    FromReusedMapping,
}

/// Final canonical value for one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionDecision {
    pub key: String,
    pub canonical: CanonicalValue,
    pub source: ResolutionSource,
}

/// Mapping store coverage of a column's unique tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Coverage {
    /// Every token is already mapped; only the apply confirmation remains
    Complete,
    /// `pending` tokens still need a decision
    Partial { pending: usize },
}
