//! Standardizer Configuration
//!
//! Defaults match the clinic export format: organisms separated by `&`,
//! mapping files tab-separated, ten candidates per prompt.
//!
//! Loaded from JSON (all fields optional) and then overridden from the
//! environment by the binary.

use crate::error::{Result as StdResult, StandardizeError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardizerConfig {
    /// Separator between organisms inside one cell
    pub organism_delimiter: char,

    /// Separator between key and canonical value in mapping files
    pub mapping_delimiter: char,

    /// Candidates offered per prompt
    pub top_k: usize,

    /// Upper bound on tokens reviewed together in one organism batch
    pub max_batch_size: usize,

    /// Candidates scoring below this are not offered
    pub min_score: u8,

    /// Treat the last word of a clinic cell as a department kept outside the mapping
    pub clinic_department_suffix: bool,

    /// Department spellings expanded on rewrite (exact match)
    pub department_abbreviations: BTreeMap<String, String>,

    /// Tidy organism display forms (hyphens, qualifiers, genus case)
    pub clean_organism_qualifiers: bool,
}

impl Default for StandardizerConfig {
    fn default() -> Self {
        let mut department_abbreviations = BTreeMap::new();
        department_abbreviations.insert("Onc.".to_string(), "Oncology".to_string());

        Self {
            organism_delimiter: '&',
            mapping_delimiter: '\t',
            top_k: 10,
            max_batch_size: 25,
            min_score: 0,
            clinic_department_suffix: false,
            department_abbreviations,
            clean_organism_qualifiers: true,
        }
    }
}

impl StandardizerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: StandardizerConfig = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `STANDARDIZER_*` environment overrides
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(raw) = std::env::var("STANDARDIZER_TOP_K") {
            self.top_k = raw
                .parse()
                .with_context(|| format!("STANDARDIZER_TOP_K is not a number: {}", raw))?;
        }
        if let Ok(raw) = std::env::var("STANDARDIZER_MAX_BATCH") {
            self.max_batch_size = raw
                .parse()
                .with_context(|| format!("STANDARDIZER_MAX_BATCH is not a number: {}", raw))?;
        }
        if let Ok(raw) = std::env::var("STANDARDIZER_DELIMITER") {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => self.organism_delimiter = c,
                _ => anyhow::bail!("STANDARDIZER_DELIMITER must be a single character, got '{}'", raw),
            }
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> StdResult<()> {
        if self.top_k == 0 {
            return Err(StandardizeError::Config("top_k must be at least 1".into()));
        }
        if self.max_batch_size == 0 {
            return Err(StandardizeError::Config("max_batch_size must be at least 1".into()));
        }
        if self.organism_delimiter.is_whitespace() || self.organism_delimiter.is_alphanumeric() {
            return Err(StandardizeError::Config(format!(
                "organism_delimiter '{}' would split inside organism names",
                self.organism_delimiter
            )));
        }
        // Keys and canonical values are whitespace-collapsed to single spaces,
        // so any other non-line-breaking whitespace never occurs inside them
        let d = self.mapping_delimiter;
        if !d.is_whitespace() || d == ' ' || d == '\n' || d == '\r' {
            return Err(StandardizeError::Config(format!(
                "mapping_delimiter '{}' can occur inside keys or values",
                d.escape_default()
            )));
        }
        Ok(())
    }
}
