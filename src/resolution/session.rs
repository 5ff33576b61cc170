//! Resolution Session
//!
//! Request/response state machine driven by the presentation layer:
//!
//! ```text
//! AwaitingUpload --load--> Partitioning --> AwaitingDecision(item) --decide/confirm--> ...
//!                                       \-> AllResolved --confirm--> (committed) --export--> Exported
//! ```
//!
//! Clinic names are prompted one token at a time and merged on the final
//! confirm. Organisms are prompted in genus batches; each batch confirm merges
//! into the session's working store before the next batch is prepared.
//! The caller's store is only replaced by the value `export` returns, so an
//! abandoned session leaves it untouched.

use crate::config::StandardizerConfig;
use crate::data::validate_schema;
use crate::error::{Result, StandardizeError, WarningSummary};
use crate::mapping_store::MappingStore;
use crate::matching::{rank, rank_many, CanonicalPool, PoolOrigin, PoolScope};
use crate::resolution::batch::{schedule, Batch};
use crate::resolution::partition::partition;
use crate::resolution::tokens::extract_tokens;
use crate::rewriter;
use crate::types::{
    CanonicalValue, Coverage, MatchCandidate, ResolutionDecision, ResolutionSource, TargetColumn, Token,
};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// One token awaiting a decision, with its ranked candidates
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub token: Token,
    pub candidates: Vec<MatchCandidate>,
}

impl Prompt {
    /// No candidates: only free text can resolve this token
    pub fn requires_free_text(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Pick the candidate at `rank` (0-based)
    pub fn choose(&self, rank: usize) -> Result<ResolutionDecision> {
        let candidate = self.candidates.get(rank).ok_or_else(|| {
            StandardizeError::InvalidDecision(format!(
                "'{}' has {} candidates, rank {} requested",
                self.token.key,
                self.candidates.len(),
                rank
            ))
        })?;
        Ok(ResolutionDecision {
            key: self.token.key.clone(),
            canonical: candidate.canonical.clone(),
            source: ResolutionSource::FromCandidate(rank),
        })
    }

    pub fn free_text(&self, text: &str) -> Result<ResolutionDecision> {
        let canonical = CanonicalValue::new(text).ok_or_else(|| {
            StandardizeError::InvalidDecision(format!("empty replacement for '{}'", self.token.key))
        })?;
        Ok(ResolutionDecision {
            key: self.token.key.clone(),
            canonical,
            source: ResolutionSource::FromFreeText(text.to_string()),
        })
    }

    /// Keep the token's own (display) spelling
    pub fn keep_as_is(&self) -> Result<ResolutionDecision> {
        self.free_text(&self.token.display)
    }

    fn check(&self, decision: &ResolutionDecision) -> Result<()> {
        match &decision.source {
            ResolutionSource::FromCandidate(rank) => match self.candidates.get(*rank) {
                Some(candidate) if candidate.canonical == decision.canonical => Ok(()),
                Some(_) => Err(StandardizeError::InvalidDecision(format!(
                    "candidate {} for '{}' is not '{}'",
                    rank, decision.key, decision.canonical
                ))),
                None => Err(StandardizeError::InvalidDecision(format!(
                    "'{}' has no candidate {}",
                    decision.key, rank
                ))),
            },
            ResolutionSource::FromFreeText(_) => Ok(()),
            ResolutionSource::FromReusedMapping => Err(StandardizeError::InvalidDecision(format!(
                "'{}' is pending, it has no reused mapping",
                decision.key
            ))),
        }
    }
}

/// A genus batch awaiting decisions for each of its tokens
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPrompt {
    pub genus: String,
    pub part: usize,
    pub prompts: Vec<Prompt>,
    decisions: Vec<Option<ResolutionDecision>>,
}

impl BatchPrompt {
    fn new(genus: String, part: usize, prompts: Vec<Prompt>) -> Self {
        let decisions = vec![None; prompts.len()];
        Self { genus, part, prompts, decisions }
    }

    pub fn is_complete(&self) -> bool {
        self.decisions.iter().all(Option::is_some)
    }

    /// Prompts still without a decision
    pub fn undecided(&self) -> impl Iterator<Item = &Prompt> {
        self.prompts
            .iter()
            .zip(&self.decisions)
            .filter(|(_, d)| d.is_none())
            .map(|(p, _)| p)
    }

    pub fn decisions(&self) -> impl Iterator<Item = &ResolutionDecision> {
        self.decisions.iter().flatten()
    }

    fn record(&mut self, decision: ResolutionDecision) -> Result<()> {
        let idx = self
            .prompts
            .iter()
            .position(|p| p.token.key == decision.key)
            .ok_or_else(|| {
                StandardizeError::InvalidDecision(format!(
                    "'{}' is not in batch '{}'",
                    decision.key, self.genus
                ))
            })?;
        self.prompts[idx].check(&decision)?;
        self.decisions[idx] = Some(decision);
        Ok(())
    }
}

/// What the presentation layer is asked to resolve next
#[derive(Debug, Clone, PartialEq)]
pub enum PendingItem {
    Token(Prompt),
    Batch(BatchPrompt),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    AwaitingUpload,
    Partitioning,
    AwaitingDecision(PendingItem),
    AllResolved,
    Exported,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::AwaitingUpload => f.write_str("awaiting upload"),
            SessionState::Partitioning => f.write_str("partitioning"),
            SessionState::AwaitingDecision(PendingItem::Token(p)) => {
                write!(f, "awaiting a decision for '{}'", p.token.key)
            }
            SessionState::AwaitingDecision(PendingItem::Batch(b)) => {
                write!(f, "awaiting decisions for batch '{}'", b.genus)
            }
            SessionState::AllResolved => f.write_str("all resolved"),
            SessionState::Exported => f.write_str("exported"),
        }
    }
}

/// Counters reported at the end of a session
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub column: String,
    pub distinct_tokens: usize,
    pub occurrences: usize,
    /// Resolved from the store at load
    pub reused: usize,
    /// Resolved by a mapping confirmed in an earlier batch
    pub resolved_by_earlier_batch: usize,
    pub prompted: usize,
    pub batches: usize,
    pub changed_keys: usize,
    pub warnings: WarningSummary,
}

/// Everything `export` hands back to the caller
#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub dataset: DataFrame,
    pub store: MappingStore,
    /// `store` serialized in mapping file format
    pub mapping_file: Vec<u8>,
    pub summary: SessionSummary,
}

/// One standardization session over one target column
pub struct Session {
    column: TargetColumn,
    config: StandardizerConfig,
    state: SessionState,
    dataset: Option<DataFrame>,
    baseline: MappingStore,
    working: MappingStore,
    pool: CanonicalPool,
    token_queue: VecDeque<Token>,
    batch_queue: VecDeque<Batch>,
    /// Clinic decisions awaiting the final confirm
    staged: Vec<ResolutionDecision>,
    changed: BTreeSet<String>,
    confirmed: bool,
    summary: SessionSummary,
}

impl Session {
    pub fn new(column: TargetColumn, config: StandardizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            column,
            config,
            state: SessionState::AwaitingUpload,
            dataset: None,
            baseline: MappingStore::new(),
            working: MappingStore::new(),
            pool: CanonicalPool::new(),
            token_queue: VecDeque::new(),
            batch_queue: VecDeque::new(),
            staged: Vec::new(),
            changed: BTreeSet::new(),
            confirmed: false,
            summary: SessionSummary {
                column: column.column_name().to_string(),
                ..Default::default()
            },
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn column(&self) -> TargetColumn {
        self.column
    }

    /// Item the presentation layer should render, if any
    pub fn current_item(&self) -> Option<&PendingItem> {
        match &self.state {
            SessionState::AwaitingDecision(item) => Some(item),
            _ => None,
        }
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    fn invalid(&self, action: &'static str) -> StandardizeError {
        StandardizeError::InvalidTransition { action, state: self.state.to_string() }
    }

    /// Load the dataset and an optional reused store, then partition
    ///
    /// Fails with `ColumnNotFound` before any processing when a required
    /// column is missing; the session then stays in `AwaitingUpload`.
    pub fn load(&mut self, dataset: DataFrame, mapping: Option<MappingStore>) -> Result<Coverage> {
        if self.state != SessionState::AwaitingUpload {
            return Err(self.invalid("load"));
        }

        if let Err(e) = validate_schema(&dataset) {
            tracing::warn!("Rejected upload: {}", e);
            return Err(e);
        }

        self.state = SessionState::Partitioning;
        let store = mapping.unwrap_or_default();

        let extracted = match extract_tokens(&dataset, self.column, &self.config) {
            Ok(extracted) => extracted,
            Err(e) => {
                self.state = SessionState::AwaitingUpload;
                return Err(e);
            }
        };

        self.summary.distinct_tokens = extracted.tokens.len();
        self.summary.occurrences = extracted.occurrences;
        self.summary.warnings.extend(extracted.warnings);

        let split = partition(extracted.tokens, &store);
        let coverage = split.coverage();
        self.summary.reused = split.resolved.len();

        tracing::info!(
            "'{}': {} distinct tokens, {} reused, {} pending",
            self.column,
            self.summary.distinct_tokens,
            split.resolved.len(),
            split.pending.len()
        );

        self.pool = CanonicalPool::build(store.canonical_values(), split.pending.iter());
        if self.column.is_multi_valued() {
            self.batch_queue = schedule(split.pending, self.config.max_batch_size).into();
            self.summary.batches = self.batch_queue.len();
        } else {
            self.token_queue = split.pending.into();
        }

        self.baseline = store.clone();
        self.working = store;
        self.dataset = Some(dataset);
        self.advance();

        Ok(coverage)
    }

    /// Load with the mapping given as mapping-file bytes
    ///
    /// Malformed lines are recorded in the session summary and skipped.
    pub fn load_with_mapping_file(&mut self, dataset: DataFrame, bytes: &[u8]) -> Result<Coverage> {
        let (store, warnings) = MappingStore::load(bytes, self.config.mapping_delimiter);
        let coverage = self.load(dataset, Some(store))?;
        self.summary.warnings.extend(warnings);
        Ok(coverage)
    }

    /// Move to the next pending item, or to `AllResolved`
    fn advance(&mut self) {
        self.state = if self.column.is_multi_valued() {
            self.next_batch()
        } else {
            self.next_token()
        };
    }

    fn next_token(&mut self) -> SessionState {
        let Some(token) = self.token_queue.pop_front() else {
            return SessionState::AllResolved;
        };

        let entries = self.pool.select(&token, PoolScope::Full);
        let candidates = rank(&token.key, &entries, self.config.top_k, self.config.min_score);
        self.summary.prompted += 1;
        SessionState::AwaitingDecision(PendingItem::Token(Prompt { token, candidates }))
    }

    fn next_batch(&mut self) -> SessionState {
        while let Some(batch) = self.batch_queue.pop_front() {
            // Earlier batches may have mapped some of these keys
            let split = partition(batch.tokens, &self.working);
            if !split.resolved.is_empty() {
                tracing::debug!(
                    "Batch '{}' part {}: {} tokens resolved by earlier batches",
                    batch.genus,
                    batch.part,
                    split.resolved.len()
                );
                self.summary.resolved_by_earlier_batch += split.resolved.len();
            }
            if split.pending.is_empty() {
                continue;
            }

            let ranked = rank_many(
                &split.pending,
                &self.pool,
                true,
                self.config.top_k,
                self.config.min_score,
            );
            let prompts: Vec<Prompt> = split
                .pending
                .into_iter()
                .zip(ranked)
                .map(|(token, candidates)| Prompt { token, candidates })
                .collect();

            tracing::info!(
                "Batch '{}' part {}: {} tokens to review",
                batch.genus,
                batch.part,
                prompts.len()
            );
            self.summary.prompted += prompts.len();
            return SessionState::AwaitingDecision(PendingItem::Batch(BatchPrompt::new(
                batch.genus,
                batch.part,
                prompts,
            )));
        }
        SessionState::AllResolved
    }

    /// Record one decision for the current prompt
    ///
    /// Clinic names advance to the next token immediately. Batch decisions
    /// may be revised until the batch is confirmed.
    pub fn decide(&mut self, decision: ResolutionDecision) -> Result<()> {
        match &mut self.state {
            SessionState::AwaitingDecision(PendingItem::Token(prompt)) => {
                if prompt.token.key != decision.key {
                    return Err(StandardizeError::InvalidDecision(format!(
                        "expected a decision for '{}', got '{}'",
                        prompt.token.key, decision.key
                    )));
                }
                prompt.check(&decision)?;
                // Later prompts may pick the same canonical spelling
                self.pool.insert(decision.canonical.clone(), PoolOrigin::Canonical);
                self.staged.push(decision);
                self.advance();
                Ok(())
            }
            SessionState::AwaitingDecision(PendingItem::Batch(batch)) => batch.record(decision),
            _ => Err(self.invalid("decide")),
        }
    }

    /// Confirm the current batch, or commit a fully resolved session
    ///
    /// Returns the keys added or changed by this confirmation.
    pub fn confirm(&mut self) -> Result<BTreeSet<String>> {
        match &self.state {
            SessionState::AwaitingDecision(PendingItem::Batch(batch)) => {
                if !batch.is_complete() {
                    return Err(StandardizeError::InvalidDecision(format!(
                        "batch '{}' has {} undecided tokens",
                        batch.genus,
                        batch.undecided().count()
                    )));
                }
                let genus = batch.genus.clone();
                let decisions: Vec<ResolutionDecision> = batch.decisions().cloned().collect();
                let changed = self.merge(&decisions);
                tracing::info!("Confirmed batch '{}' ({} keys changed)", genus, changed.len());
                self.advance();
                Ok(changed)
            }
            SessionState::AllResolved if !self.confirmed => {
                let staged = std::mem::take(&mut self.staged);
                let changed = self.merge(&staged);
                self.confirmed = true;
                tracing::info!("Session confirmed ({} keys changed in total)", self.changed.len());
                Ok(changed)
            }
            _ => Err(self.invalid("confirm")),
        }
    }

    fn merge(&mut self, decisions: &[ResolutionDecision]) -> BTreeSet<String> {
        let changed = self.working.merge(decisions);
        for decision in decisions {
            self.pool.insert(decision.canonical.clone(), PoolOrigin::Canonical);
        }
        self.changed.extend(changed.iter().cloned());
        changed
    }

    /// Decisions made but not yet merged, as (key, canonical) pairs
    pub fn review(&self) -> Vec<(String, CanonicalValue)> {
        let pending_batch: Vec<ResolutionDecision> = match &self.state {
            SessionState::AwaitingDecision(PendingItem::Batch(batch)) => {
                batch.decisions().cloned().collect()
            }
            _ => Vec::new(),
        };
        self.staged
            .iter()
            .chain(pending_batch.iter())
            .map(|d| (d.key.clone(), d.canonical.clone()))
            .collect()
    }

    /// Rewrite the dataset with the committed store and hand both back
    pub fn export(&mut self) -> Result<SessionOutput> {
        if self.state != SessionState::AllResolved || !self.confirmed {
            return Err(self.invalid("export"));
        }
        let dataset = self.dataset.as_ref().ok_or_else(|| self.invalid("export"))?;

        let rewritten = rewriter::apply(dataset, &self.working, self.column, &self.config)?;

        self.summary.changed_keys = self.changed.len();
        self.state = SessionState::Exported;

        Ok(SessionOutput {
            dataset: rewritten,
            mapping_file: self.working.export(self.config.mapping_delimiter),
            store: self.working.clone(),
            summary: self.summary.clone(),
        })
    }

    /// Discard every decision; returns the store exactly as it was loaded
    pub fn abandon(self) -> MappingStore {
        tracing::info!("Session abandoned, {} staged decisions discarded", self.staged.len());
        self.baseline
    }
}
