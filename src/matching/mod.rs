//! Fuzzy matching: similarity scoring and candidate ranking

pub mod similarity;
pub mod candidates;

// Re-export matching entry points
pub use candidates::{rank, rank_many, CanonicalPool, PoolEntry, PoolOrigin, PoolScope};
pub use similarity::{partial_ratio, ratio, token_set_ratio, token_sort_ratio, weighted_ratio};
