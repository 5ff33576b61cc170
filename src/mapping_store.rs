//! Mapping Store
//!
//! Persistent dictionary from normalized raw token to canonical value.
//!
//! File format: UTF-8, one `<key><delimiter><canonical>` entry per line, no
//! header. Export is sorted by key so exported files diff cleanly. Load skips
//! malformed lines with a warning instead of failing the whole file.

use crate::error::{Warning, WarningSummary};
use crate::types::{CanonicalValue, ResolutionDecision, ResolutionSource};
use crate::utils::normalize;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeSet;

/// How an entry entered the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provenance {
    ReusedFromFile,
    ConfirmedThisSession,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub canonical: CanonicalValue,
    pub provenance: Provenance,
}

/// Key → canonical dictionary; one canonical value per key
#[derive(Debug, Clone, Default)]
pub struct MappingStore {
    entries: FxHashMap<String, MappingEntry>,
}

/// Equality compares key/canonical content only; provenance is ignored so
/// that a store equals the reload of its own export.
impl PartialEq for MappingStore {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(key, entry)| {
                other
                    .entries
                    .get(key)
                    .map_or(false, |o| o.canonical == entry.canonical)
            })
    }
}

impl Eq for MappingStore {}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a mapping file
    ///
    /// Every line must split into exactly one non-empty key and one
    /// non-empty value. Keys are normalized; a repeated key keeps the last
    /// value. Blank lines are ignored.
    pub fn load(bytes: &[u8], delimiter: char) -> (Self, WarningSummary) {
        let mut store = Self::new();
        let mut warnings = WarningSummary::default();

        for (idx, raw_line) in bytes.split(|&b| b == b'\n').enumerate() {
            let line_no = idx + 1;
            let raw_line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);

            let line = match std::str::from_utf8(raw_line) {
                Ok(line) => line,
                Err(_) => {
                    warnings.push(Warning::MalformedMappingLine {
                        line: line_no,
                        reason: "not valid UTF-8".into(),
                    });
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match parse_line(line, delimiter) {
                Ok((key, canonical)) => {
                    if let Some(previous) = store.entries.get(&key) {
                        tracing::debug!(
                            "Mapping line {} overrides '{}' ({} -> {})",
                            line_no, key, previous.canonical, canonical
                        );
                    }
                    store.entries.insert(
                        key,
                        MappingEntry { canonical, provenance: Provenance::ReusedFromFile },
                    );
                }
                Err(reason) => {
                    warnings.push(Warning::MalformedMappingLine { line: line_no, reason });
                }
            }
        }

        if !warnings.is_empty() {
            tracing::warn!("Skipped {} malformed mapping lines", warnings.malformed_lines());
        }
        tracing::info!("Loaded {} mapping entries", store.len());

        (store, warnings)
    }

    /// Serialize sorted by key, in the format `load` reads
    pub fn export(&self, delimiter: char) -> Vec<u8> {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort_unstable();

        let mut out = String::new();
        for key in keys {
            let entry = &self.entries[key];
            out.push_str(key);
            out.push(delimiter);
            out.push_str(entry.canonical.as_str());
            out.push('\n');
        }
        out.into_bytes()
    }

    pub fn lookup(&self, key: &str) -> Option<&CanonicalValue> {
        self.entries.get(key).map(|entry| &entry.canonical)
    }

    pub fn entry(&self, key: &str) -> Option<&MappingEntry> {
        self.entries.get(key)
    }

    /// Merge confirmed decisions; the confirmation always wins
    ///
    /// Each confirmed canonical value is also recorded under its own
    /// normalized key when that key is unmapped, so a token already spelled
    /// canonically resolves directly later on.
    ///
    /// Returns the keys that were added or whose canonical value changed.
    pub fn merge(&mut self, decisions: &[ResolutionDecision]) -> BTreeSet<String> {
        let mut changed = BTreeSet::new();

        for decision in decisions {
            if decision.source == ResolutionSource::FromReusedMapping
                && self.lookup(&decision.key) == Some(&decision.canonical)
            {
                continue;
            }

            if self.upsert(&decision.key, &decision.canonical) {
                changed.insert(decision.key.clone());
            }
        }

        for decision in decisions {
            let self_key = normalize(decision.canonical.as_str());
            if !self.entries.contains_key(&self_key) {
                self.upsert(&self_key, &decision.canonical);
                changed.insert(self_key);
            }
        }

        if !changed.is_empty() {
            tracing::debug!("Merged {} decisions, {} keys changed", decisions.len(), changed.len());
        }
        changed
    }

    /// Insert or replace; returns true when the canonical value changed
    fn upsert(&mut self, key: &str, canonical: &CanonicalValue) -> bool {
        let entry = MappingEntry {
            canonical: canonical.clone(),
            provenance: Provenance::ConfirmedThisSession,
        };
        match self.entries.insert(key.to_string(), entry) {
            Some(previous) => previous.canonical != *canonical,
            None => true,
        }
    }

    /// Distinct canonical values, sorted
    pub fn canonical_values(&self) -> BTreeSet<&CanonicalValue> {
        self.entries.values().map(|entry| &entry.canonical).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MappingEntry)> {
        self.entries.iter()
    }
}

fn parse_line(line: &str, delimiter: char) -> Result<(String, CanonicalValue), String> {
    let mut fields = line.split(delimiter);
    let (raw_key, raw_value) = match (fields.next(), fields.next(), fields.next()) {
        (Some(key), Some(value), None) => (key, value),
        (_, None, _) => return Err(format!("missing '{}' delimiter", delimiter.escape_default())),
        _ => return Err("more than one delimiter".into()),
    };

    let key = normalize(raw_key);
    if key.is_empty() {
        return Err("empty key".into());
    }
    let canonical = CanonicalValue::new(raw_value).ok_or_else(|| "empty value".to_string())?;

    Ok((key, canonical))
}
