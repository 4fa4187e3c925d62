use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::text::tokenize;

/// One `(source_index, target_index)` word-alignment link, 0-based.
pub type AlignmentPair = (usize, usize);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub src_phrase: String,
    pub trg_phrase: String,
    pub src_tokens: Vec<String>,
    pub trg_tokens: Vec<String>,
    // Indices are not checked against the token counts here; filters that
    // consume the alignment decide what an out-of-range link means.
    pub alignment: Option<Vec<AlignmentPair>>,
}

impl TranslationUnit {
    /// Builds a TU from already-trimmed phrases, tokenizing both sides with
    /// the run-wide tokenizer.
    pub fn new(src_phrase: &str, trg_phrase: &str, alignment: Option<Vec<AlignmentPair>>) -> Self {
        TranslationUnit {
            src_tokens: tokenize(src_phrase),
            trg_tokens: tokenize(trg_phrase),
            src_phrase: src_phrase.to_string(),
            trg_phrase: trg_phrase.to_string(),
            alignment,
        }
    }

    /// Alignment links, or an empty slice when the run has no alignment file.
    pub fn alignment_pairs(&self) -> &[AlignmentPair] {
        self.alignment.as_deref().unwrap_or(&[])
    }

    pub fn has_empty_side(&self) -> bool {
        self.src_tokens.is_empty() || self.trg_tokens.is_empty()
    }
}

/// A label attached to a TU by a filter or a policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Verdict {
    Accept,
    Reject,
    Other(String),
}

/// Decision-log code for lines that never reached the filters.
pub const SKIPPED_LOG_CODE: i8 = -1;

impl Verdict {
    pub fn from_label(label: &str) -> Self {
        match label {
            "accept" => Verdict::Accept,
            "reject" => Verdict::Reject,
            other => Verdict::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Verdict::Accept => "accept",
            Verdict::Reject => "reject",
            Verdict::Other(label) => label,
        }
    }

    /// Numeric class written to the decision log.
    pub fn log_code(&self) -> i8 {
        match self {
            Verdict::Reject => 0,
            Verdict::Other(_) => 1,
            Verdict::Accept => 2,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One filter's verdict for a TU, in filter load order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub filter_name: String,
    pub verdict: Verdict,
}

impl FilterResult {
    pub fn new(filter_name: impl Into<String>, verdict: Verdict) -> Self {
        FilterResult {
            filter_name: filter_name.into(),
            verdict,
        }
    }
}

/// Which kind of pluggable component an entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Filter,
    Policy,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Filter => f.write_str("filter"),
            ComponentKind::Policy => f.write_str("policy"),
        }
    }
}

/// Run stage at which a component dropped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionStage {
    Load,
    Initialize,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedComponent {
    pub kind: ComponentKind,
    pub name: String,
    pub stage: ExclusionStage,
    pub reason: String,
}

/// Counters for one decision scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionStats {
    pub lines: usize,
    pub skipped: usize,
    /// policy -> verdict label -> number of TUs
    pub verdicts: BTreeMap<String, BTreeMap<String, usize>>,
}

impl DecisionStats {
    pub fn record(&mut self, policy: &str, verdict: &Verdict) {
        *self
            .verdicts
            .entry(policy.to_string())
            .or_default()
            .entry(verdict.label().to_string())
            .or_insert(0) += 1;
    }

    pub fn count(&self, policy: &str, verdict: &str) -> usize {
        self.verdicts
            .get(policy)
            .and_then(|by_verdict| by_verdict.get(verdict))
            .copied()
            .unwrap_or(0)
    }
}

/// Everything a finished (or aborted) run reports back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub input_file: String,
    pub learning_passes: usize,
    pub learning_lines_skipped: usize,
    pub learning_filter_errors: usize,
    pub active_filters: Vec<String>,
    pub active_policies: Vec<String>,
    pub excluded: Vec<ExcludedComponent>,
    pub decision: Option<DecisionStats>,
}

impl RunSummary {
    pub fn write_json(&self, path: &std::path::Path) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Why a run stopped early without a process-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    NoActiveFilters,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NoActiveFilters => f.write_str("there are no active filters"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(RunSummary),
    Aborted {
        reason: AbortReason,
        summary: RunSummary,
    },
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Completed(summary) => summary,
            RunOutcome::Aborted { summary, .. } => summary,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_codes() {
        assert_eq!(Verdict::Reject.log_code(), 0);
        assert_eq!(Verdict::Other("neutral".into()).log_code(), 1);
        assert_eq!(Verdict::Accept.log_code(), 2);
        assert_eq!(SKIPPED_LOG_CODE, -1);
    }

    #[test]
    fn test_verdict_labels() {
        assert_eq!(Verdict::from_label("accept"), Verdict::Accept);
        assert_eq!(Verdict::from_label("reject"), Verdict::Reject);
        let custom = Verdict::from_label("maybe");
        assert_eq!(custom, Verdict::Other("maybe".to_string()));
        assert_eq!(custom.to_string(), "maybe");
    }

    #[test]
    fn test_tu_tokenizes_both_sides() {
        let tu = TranslationUnit::new("Hello, World", "Bonjour le monde", None);
        assert_eq!(tu.src_tokens, vec!["hello", ",", "world"]);
        assert_eq!(tu.trg_tokens, vec!["bonjour", "le", "monde"]);
        assert!(tu.alignment_pairs().is_empty());
        assert!(!tu.has_empty_side());
    }

    #[test]
    fn test_decision_stats_record() {
        let mut stats = DecisionStats::default();
        stats.record("OneNoPolicy", &Verdict::Accept);
        stats.record("OneNoPolicy", &Verdict::Accept);
        stats.record("OneNoPolicy", &Verdict::Reject);
        assert_eq!(stats.count("OneNoPolicy", "accept"), 2);
        assert_eq!(stats.count("OneNoPolicy", "reject"), 1);
        assert_eq!(stats.count("OtherPolicy", "accept"), 0);
    }

    #[test]
    fn test_tu_empty_side() {
        let tu = TranslationUnit::new("", "something", Some(vec![]));
        assert!(tu.has_empty_side());
    }
}
