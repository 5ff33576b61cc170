//! Categorical Value Standardizer
//!
//! Standardizes the free-text "Clinic Name" and "Isolated Organisms" columns
//! of a clinical dataset against a reusable key → canonical mapping file.
//!
//! Module layout:
//! - `utils/`: Normalization, cell splitting and organism name cleanup
//! - `matching/`: Fuzzy similarity scoring and candidate ranking
//! - `mapping_store`: Mapping file load, merge and export
//! - `resolution/`: Token extraction, genus batching and the session state machine
//! - `rewriter`: Applies the committed mappings to the dataset
//! - `data`: Dataset and mapping-file I/O with Polars

pub mod config;
pub mod data;
pub mod error;
pub mod mapping_store;
pub mod matching;
pub mod resolution;
pub mod rewriter;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::StandardizerConfig;
pub use error::{Result, StandardizeError, Warning, WarningSummary};
pub use mapping_store::{MappingEntry, MappingStore, Provenance};
pub use resolution::{PendingItem, Session, SessionOutput, SessionState, SessionSummary};
pub use types::{
    CanonicalValue, Coverage, MatchCandidate, ResolutionDecision, ResolutionSource, TargetColumn, Token,
};
