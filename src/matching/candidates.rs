//! Candidate Generation
//!
//! Ranks canonical spellings against a pending token.
//!
//! The pool holds the store's canonical values plus the display forms of the
//! column's other distinct tokens (peers). Entries are indexed by genus so a
//! batch only scans the slice of the pool that shares its leading word.

use crate::matching::similarity::weighted_ratio;
use crate::types::{CanonicalValue, MatchCandidate, Token};
use crate::utils::{genus_of, normalize};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Where a pool entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolOrigin {
    /// Canonical value from the mapping store or a decision
    Canonical,
    /// Display form of another token in the same column
    Peer,
}

#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub value: CanonicalValue,
    pub key: String,
    pub origin: PoolOrigin,
}

/// Which slice of the pool to rank against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolScope<'a> {
    Full,
    /// Same-genus entries, falling back to the full pool when none exist
    Genus(&'a str),
}

/// Canonical pool, one entry per normalized key
#[derive(Debug, Default, Clone)]
pub struct CanonicalPool {
    entries: Vec<PoolEntry>,
    by_key: FxHashMap<String, usize>,
    by_genus: FxHashMap<String, Vec<usize>>,
}

impl CanonicalPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from canonical values and peer tokens
    ///
    /// Canonical values are inserted first so they win over a peer spelling
    /// of the same key.
    pub fn build<'a, M, P>(canonical: M, peers: P) -> Self
    where
        M: IntoIterator<Item = &'a CanonicalValue>,
        P: IntoIterator<Item = &'a Token>,
    {
        let mut pool = Self::new();
        for value in canonical {
            pool.insert(value.clone(), PoolOrigin::Canonical);
        }
        for token in peers {
            if let Some(value) = CanonicalValue::new(&token.display) {
                pool.insert(value, PoolOrigin::Peer);
            }
        }
        pool
    }

    /// Insert a value; a canonical value replaces a peer with the same key
    pub fn insert(&mut self, value: CanonicalValue, origin: PoolOrigin) {
        let key = normalize(value.as_str());

        if let Some(&idx) = self.by_key.get(&key) {
            let existing = &mut self.entries[idx];
            if existing.origin == PoolOrigin::Peer && origin == PoolOrigin::Canonical {
                existing.value = value;
                existing.origin = origin;
            }
            return;
        }

        let idx = self.entries.len();
        self.by_genus
            .entry(genus_of(&key).to_string())
            .or_default()
            .push(idx);
        self.by_key.insert(key.clone(), idx);
        self.entries.push(PoolEntry { value, key, origin });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries a token may be matched against
    ///
    /// A token never sees its own peer entry, whether that entry is keyed by
    /// the token's key or by its (possibly cleaned) display form.
    pub fn select(&self, token: &Token, scope: PoolScope<'_>) -> Vec<&PoolEntry> {
        let display_key = normalize(&token.display);
        let not_self = |entry: &&PoolEntry| {
            !(entry.origin == PoolOrigin::Peer && (entry.key == token.key || entry.key == display_key))
        };

        if let PoolScope::Genus(genus) = scope {
            let restricted: Vec<&PoolEntry> = self
                .by_genus
                .get(genus)
                .map(|indices| indices.iter().map(|&i| &self.entries[i]).filter(not_self).collect())
                .unwrap_or_default();
            if !restricted.is_empty() {
                return restricted;
            }
        }

        self.entries.iter().filter(not_self).collect()
    }
}

/// Rank pool entries against one token key
///
/// Descending score, ties broken by canonical text. An empty result means
/// no candidates: the token must be resolved by free text.
pub fn rank(token_key: &str, pool: &[&PoolEntry], top_k: usize, min_score: u8) -> Vec<MatchCandidate> {
    let mut scored: Vec<MatchCandidate> = pool
        .iter()
        .map(|entry| MatchCandidate {
            token_key: token_key.to_string(),
            canonical: entry.value.clone(),
            score: weighted_ratio(token_key, &entry.key),
        })
        .filter(|candidate| candidate.score >= min_score)
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.canonical.cmp(&b.canonical)));
    scored.truncate(top_k);
    scored
}

/// Rank several tokens in parallel
///
/// Scoring has no side effects, so the output equals sequential ranking and
/// keeps the input token order.
pub fn rank_many(
    tokens: &[Token],
    pool: &CanonicalPool,
    restrict_to_genus: bool,
    top_k: usize,
    min_score: u8,
) -> Vec<Vec<MatchCandidate>> {
    tokens
        .par_iter()
        .map(|token| {
            let scope = if restrict_to_genus {
                PoolScope::Genus(genus_of(&token.key))
            } else {
                PoolScope::Full
            };
            let entries = pool.select(token, scope);
            rank(&token.key, &entries, top_k, min_score)
        })
        .collect()
}
