//! Genus Batch Scheduler
//!
//! Groups pending organism tokens by genus (leading word of the key) and
//! orders the batches by ascending genus. Within a genus, tokens keep their
//! first-seen order and are cut into batches of at most `max_batch_size`.
//!
//! Order matters: a batch confirmed earlier can resolve tokens, or add
//! candidates, for a later batch of the same genus.

use crate::types::Token;
use crate::utils::genus_of;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub genus: String,
    /// 0-based position among the batches of this genus
    pub part: usize,
    pub tokens: Vec<Token>,
}

/// Partition pending tokens into ordered genus batches
///
/// Every token lands in exactly one batch.
pub fn schedule(pending: Vec<Token>, max_batch_size: usize) -> Vec<Batch> {
    let max_batch_size = max_batch_size.max(1);

    let mut by_genus: BTreeMap<String, Vec<Token>> = BTreeMap::new();
    for token in pending {
        by_genus
            .entry(genus_of(&token.key).to_string())
            .or_default()
            .push(token);
    }

    let mut batches = Vec::new();
    for (genus, tokens) in by_genus {
        for (part, chunk) in tokens.chunks(max_batch_size).enumerate() {
            batches.push(Batch {
                genus: genus.clone(),
                part,
                tokens: chunk.to_vec(),
            });
        }
    }

    tracing::debug!("Scheduled {} batches", batches.len());
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TargetColumn, TokenPosition};
    use crate::utils::normalize;

    fn tokens(raws: &[&str]) -> Vec<Token> {
        raws.iter()
            .enumerate()
            .map(|(row, raw)| Token {
                raw: raw.to_string(),
                key: normalize(raw),
                display: raw.to_string(),
                column: TargetColumn::IsolatedOrganisms,
                position: TokenPosition { row, index: 0 },
            })
            .collect()
    }

    #[test]
    fn test_batches_ordered_by_genus() {
        let pending = tokens(&[
            "Staphylococcus aureus",
            "Escherichia coli",
            "Klebsiella pneumoniae",
            "Staphylococcus epidermidis",
        ]);
        let batches = schedule(pending, 25);
        let genera: Vec<&str> = batches.iter().map(|b| b.genus.as_str()).collect();

        assert_eq!(genera, vec!["escherichia", "klebsiella", "staphylococcus"]);
        let staph: Vec<&str> = batches[2].tokens.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(staph, vec!["staphylococcus aureus", "staphylococcus epidermidis"]);
    }

    #[test]
    fn test_batches_cover_every_token_once() {
        let pending = tokens(&["e coli", "k pneu", "e faecalis", "k oxy", "mrsa", "e cloacae"]);
        let expected: Vec<String> = pending.iter().map(|t| t.key.clone()).collect();
        let batches = schedule(pending, 2);

        let mut seen: Vec<String> = batches
            .iter()
            .flat_map(|b| b.tokens.iter().map(|t| t.key.clone()))
            .collect();
        assert_eq!(seen.len(), expected.len());
        seen.sort();
        let mut expected = expected;
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_large_genus_split_into_parts() {
        let pending = tokens(&["e coli", "e faecalis", "e cloacae"]);
        let batches = schedule(pending, 2);

        assert_eq!(batches.len(), 2);
        assert_eq!((batches[0].genus.as_str(), batches[0].part), ("e", 0));
        assert_eq!((batches[1].genus.as_str(), batches[1].part), ("e", 1));
        assert_eq!(batches[1].tokens[0].key, "e cloacae");
    }
}
