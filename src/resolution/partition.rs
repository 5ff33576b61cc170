//! Token Partitioning
//!
//! Splits distinct tokens into those the mapping store already resolves and
//! those still pending. A token is resolved iff `store.lookup(key)` succeeds.

use crate::mapping_store::MappingStore;
use crate::types::{CanonicalValue, Coverage, ResolutionDecision, ResolutionSource, Token};

#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub resolved: Vec<(Token, CanonicalValue)>,
    pub pending: Vec<Token>,
}

impl Partition {
    pub fn coverage(&self) -> Coverage {
        if self.pending.is_empty() {
            Coverage::Complete
        } else {
            Coverage::Partial { pending: self.pending.len() }
        }
    }

    /// Decisions recording the reused mappings
    pub fn reused_decisions(&self) -> Vec<ResolutionDecision> {
        self.resolved
            .iter()
            .map(|(token, canonical)| ResolutionDecision {
                key: token.key.clone(),
                canonical: canonical.clone(),
                source: ResolutionSource::FromReusedMapping,
            })
            .collect()
    }
}

/// Partition tokens against a store snapshot, keeping input order
pub fn partition<I>(tokens: I, store: &MappingStore) -> Partition
where
    I: IntoIterator<Item = Token>,
{
    let mut out = Partition::default();
    for token in tokens {
        match store.lookup(&token.key) {
            Some(canonical) => {
                let canonical = canonical.clone();
                out.resolved.push((token, canonical));
            }
            None => out.pending.push(token),
        }
    }
    out
}
