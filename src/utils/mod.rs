//! Utility modules for value standardization
//!
//! Contains shared functionality used across the engine:
//! - Normalization: Key derivation and cell splitting
//! - Organism names: Display cleanup for organism spellings

pub mod normalization;
pub mod organism_names;

// Re-export commonly used functions
pub use normalization::{collapse_whitespace, genus_of, normalize, rejoin, split, split_department, Segment};
pub use organism_names::clean_organism_name;
