use std::fmt;

use rayon::prelude::*;
use tracing::{debug, error, info, info_span, warn};

use crate::config::CleanerConfig;
use crate::data_model::{
    AbortReason, ComponentKind, DecisionStats, ExcludedComponent, ExclusionStage, FilterResult,
    RunOutcome, RunSummary, TranslationUnit, Verdict,
};
use crate::error::{PipelineError, Result};
use crate::pipeline::readers::{CorpusReader, CorpusRecord};
use crate::pipeline::registry::{ComponentRegistry, FilterEntry, PolicyEntry};
use crate::pipeline::scheduler::{ScanPlan, ScanScheduler};
use crate::pipeline::writers::OutputRouter;
use crate::utils::common::{create_progress_bar, SCAN_PB_TEMPLATE};
use crate::utils::prometheus_metrics::{
    COMPONENTS_EXCLUDED_TOTAL, CORPUS_LINES_READ_TOTAL, FILTER_ERRORS_TOTAL, LINES_SKIPPED_TOTAL,
    POLICY_VERDICTS_TOTAL, SCAN_DURATION_SECONDS,
};

/// Verdict recorded for a filter whose `decide` call failed.
pub const FILTER_ERROR_VERDICT: &str = "error";
/// Verdict recorded for a policy whose `decide` call failed.
pub const NO_ANSWER_VERDICT: &str = "no_answer";

/// A statistical filter over translation units.
///
/// Filters first observe the corpus during `number_of_scans()` learning
/// passes (`process_tu`, `do_after_full_scan`), are finalized once, and then
/// score every TU in the decision scan. `decide` takes `&self` and may be
/// called from several threads at once.
pub trait TuFilter: Send + Sync {
    fn name(&self) -> &'static str; // For logging/error reporting

    fn initialize(&mut self, source_language: &str, target_language: &str) -> Result<()>;

    /// Learning passes this filter needs. Only read after `initialize`.
    fn number_of_scans(&self) -> usize;

    /// `pass_index` counts this filter's own completed passes, from 0.
    fn process_tu(&mut self, tu: TranslationUnit, pass_index: usize) -> Result<()>;

    fn do_after_full_scan(&mut self, _passes_completed: usize) -> Result<()> {
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }

    fn decide(&self, tu: &TranslationUnit) -> Result<Verdict>;
}

/// Turns the ordered filter verdicts of one TU into a final verdict.
pub trait DecisionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn decide(&self, results: &[FilterResult]) -> Result<Verdict>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Configuring,
    Loading,
    Learning { pass: usize },
    Finalizing,
    Deciding,
    Done,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Configuring => f.write_str("configuring"),
            RunState::Loading => f.write_str("loading"),
            RunState::Learning { pass } => write!(f, "learning (pass {})", pass),
            RunState::Finalizing => f.write_str("finalizing"),
            RunState::Deciding => f.write_str("deciding"),
            RunState::Done => f.write_str("done"),
            RunState::Aborted => f.write_str("aborted"),
        }
    }
}

/// Drives one cleaning run over a single corpus.
pub struct PipelineExecutor {
    config: CleanerConfig,
    registry: ComponentRegistry,
    filters: Vec<FilterEntry>,
    policies: Vec<PolicyEntry>,
    state: RunState,
    summary: RunSummary,
    show_progress: bool,
}

impl PipelineExecutor {
    pub fn new(config: CleanerConfig, registry: ComponentRegistry) -> Self {
        let summary = RunSummary {
            input_file: config.options.input_file.clone(),
            ..RunSummary::default()
        };
        PipelineExecutor {
            config,
            registry,
            filters: Vec::new(),
            policies: Vec::new(),
            state: RunState::Configuring,
            summary,
            show_progress: false,
        }
    }

    /// Shows a spinner per corpus scan. Off by default.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Runs load, learning, finalization and one decision scan.
    ///
    /// Losing every filter is reported as [`RunOutcome::Aborted`]; missing
    /// inputs and I/O failures are errors.
    pub fn run(&mut self) -> Result<RunOutcome> {
        let outcome = self.run_stages();
        if outcome.is_err() {
            self.transition(RunState::Aborted);
        }
        outcome
    }

    fn run_stages(&mut self) -> Result<RunOutcome> {
        if let Some(reason) = self.load() {
            return Ok(self.abort(reason));
        }
        self.learn()?;
        if let Some(reason) = self.finalize_filters() {
            return Ok(self.abort(reason));
        }
        self.decide()?;
        Ok(RunOutcome::Completed(self.summary.clone()))
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "Run state changed");
            self.state = next;
        }
    }

    fn abort(&mut self, reason: AbortReason) -> RunOutcome {
        warn!(%reason, "Stopping the run");
        self.transition(RunState::Aborted);
        RunOutcome::Aborted {
            reason,
            summary: self.summary.clone(),
        }
    }

    fn exclude(&mut self, kind: ComponentKind, name: &str, stage: ExclusionStage, reason: String) {
        COMPONENTS_EXCLUDED_TOTAL.inc();
        self.summary.excluded.push(ExcludedComponent {
            kind,
            name: name.to_string(),
            stage,
            reason,
        });
    }

    fn refresh_active_names(&mut self) {
        self.summary.active_filters = self.filters.iter().map(|e| e.name.clone()).collect();
        self.summary.active_policies = self.policies.iter().map(|e| e.name.clone()).collect();
    }

    /// Loads and initializes filters, then loads policies.
    fn load(&mut self) -> Option<AbortReason> {
        self.transition(RunState::Loading);

        let filters_root = self.config.filters_root();
        let report = self
            .registry
            .load_filters(&self.config.filters, filters_root.as_deref());
        self.summary.excluded.extend(report.failures);

        let source = self.config.options.source_language.clone();
        let target = self.config.options.target_language.clone();
        let mut active = Vec::with_capacity(report.loaded.len());
        for mut entry in report.loaded {
            match entry.initialize(&source, &target) {
                Ok(scans) => {
                    info!(
                        filter = %entry.name,
                        implementation = entry.filter.name(),
                        scans,
                        "Filter initialized"
                    );
                    active.push(entry);
                }
                Err(e) => {
                    error!(filter = %entry.name, error = %e, "Filter failed to initialize; excluding it");
                    self.exclude(
                        ComponentKind::Filter,
                        &entry.name,
                        ExclusionStage::Initialize,
                        e.to_string(),
                    );
                }
            }
        }
        self.filters = active;

        let policies_root = self.config.policies_root();
        let report = self
            .registry
            .load_policies(&self.config.policies, policies_root.as_deref());
        self.summary.excluded.extend(report.failures);
        for entry in &report.loaded {
            info!(policy = %entry.name, implementation = entry.policy.name(), "Policy loaded");
        }
        self.policies = report.loaded;
        self.refresh_active_names();

        if self.filters.is_empty() {
            return Some(AbortReason::NoActiveFilters);
        }
        if self.policies.is_empty() {
            warn!("No active policies; TUs will be logged without verdicts");
        }
        None
    }

    fn open_corpus(&self) -> Result<CorpusReader> {
        let align_path = self.config.align_path();
        CorpusReader::open(&self.config.input_path(), align_path.as_deref())
    }

    fn learn(&mut self) -> Result<()> {
        let scheduler = ScanScheduler::from_entries(&self.filters);
        let total = scheduler.max_scans();
        if total == 0 {
            info!("No filter needs a learning pass");
            return Ok(());
        }
        for plan in scheduler.plans() {
            self.transition(RunState::Learning { pass: plan.pass });
            self.learning_pass(&plan, total)?;
        }
        Ok(())
    }

    fn learning_pass(&mut self, plan: &ScanPlan, total: usize) -> Result<()> {
        let span = info_span!("learning_pass", pass = plan.pass + 1, of = total);
        let _enter = span.enter();
        let timer = SCAN_DURATION_SECONDS
            .with_label_values(&["learning"])
            .start_timer();

        let reader = self.open_corpus()?;
        let pb = create_progress_bar(
            self.show_progress,
            &format!("Learning pass {}/{}", plan.pass + 1, total),
            SCAN_PB_TEMPLATE,
        );
        let mut lines = 0usize;
        let mut skipped = 0usize;
        let mut errors = 0usize;

        for record in reader {
            let record = record?;
            lines += 1;
            pb.inc(1);
            CORPUS_LINES_READ_TOTAL.with_label_values(&["learning"]).inc();

            let tu = match record.tu {
                Ok(tu) => tu,
                Err(e) => {
                    debug!(line = record.line_no, error = %e, "Skipping malformed line");
                    skipped += 1;
                    LINES_SKIPPED_TOTAL.with_label_values(&["learning"]).inc();
                    continue;
                }
            };

            for participant in &plan.participants {
                let entry = &mut self.filters[participant.entry_index];
                if let Err(e) = entry.filter.process_tu(tu.clone(), participant.pass_index) {
                    warn!(filter = %entry.name, line = record.line_no, error = %e, "Filter failed to process TU");
                    errors += 1;
                    FILTER_ERRORS_TOTAL
                        .with_label_values(&[entry.name.as_str(), "learning"])
                        .inc();
                }
            }
        }

        for participant in &plan.participants {
            let entry = &mut self.filters[participant.entry_index];
            if let Err(e) = entry.filter.do_after_full_scan(participant.pass_index + 1) {
                warn!(filter = %entry.name, error = %e, "Filter failed after full scan");
                errors += 1;
                FILTER_ERRORS_TOTAL
                    .with_label_values(&[entry.name.as_str(), "learning"])
                    .inc();
            }
        }

        pb.finish_with_message(format!("Learning pass {}/{} done", plan.pass + 1, total));
        timer.observe_duration();
        self.summary.learning_passes += 1;
        self.summary.learning_lines_skipped += skipped;
        self.summary.learning_filter_errors += errors;
        info!(
            lines,
            skipped,
            errors,
            participants = plan.participants.len(),
            "Learning pass complete"
        );
        Ok(())
    }

    fn finalize_filters(&mut self) -> Option<AbortReason> {
        self.transition(RunState::Finalizing);
        let mut active = Vec::with_capacity(self.filters.len());
        for mut entry in std::mem::take(&mut self.filters) {
            match entry.filter.finalize() {
                Ok(()) => active.push(entry),
                Err(e) => {
                    error!(filter = %entry.name, error = %e, "Filter failed to finalize; excluding it");
                    entry.exclude();
                    self.exclude(
                        ComponentKind::Filter,
                        &entry.name,
                        ExclusionStage::Finalize,
                        e.to_string(),
                    );
                }
            }
        }
        self.filters = active;
        self.refresh_active_names();

        if self.filters.is_empty() {
            Some(AbortReason::NoActiveFilters)
        } else {
            None
        }
    }

    /// Runs the decision scan with the finalized filters.
    ///
    /// May be called again after a completed run; every call rewrites the
    /// output files from scratch and yields the same content.
    pub fn decide(&mut self) -> Result<DecisionStats> {
        match self.state {
            RunState::Finalizing | RunState::Deciding | RunState::Done => {}
            other => {
                return Err(PipelineError::Unexpected(format!(
                    "decision scan needs finalized filters, run is {}",
                    other
                )))
            }
        }
        self.transition(RunState::Deciding);
        match self.decision_scan() {
            Ok(stats) => {
                self.summary.decision = Some(stats.clone());
                self.transition(RunState::Done);
                Ok(stats)
            }
            Err(e) => {
                self.transition(RunState::Aborted);
                Err(e)
            }
        }
    }

    fn decision_scan(&self) -> Result<DecisionStats> {
        let span = info_span!("decision_scan");
        let _enter = span.enter();
        let timer = SCAN_DURATION_SECONDS
            .with_label_values(&["decision"])
            .start_timer();

        // Inputs are checked before any previous output is truncated.
        let mut reader = self.open_corpus()?;
        let output_dir = self.config.prepare_output_dir()?;
        let mut router = OutputRouter::create(&output_dir, &self.config.input_file_name())?;
        let pb = create_progress_bar(self.show_progress, "Decision scan", SCAN_PB_TEMPLATE);
        let batch_size = self.config.options.decision_batch_size;
        let mut stats = DecisionStats::default();

        loop {
            let batch = reader
                .by_ref()
                .take(batch_size)
                .collect::<Result<Vec<CorpusRecord>>>()?;
            if batch.is_empty() {
                break;
            }

            let decisions: Vec<Option<Vec<Verdict>>> = batch
                .par_iter()
                .map(|record| {
                    record
                        .tu
                        .as_ref()
                        .ok()
                        .map(|tu| score(&self.filters, &self.policies, tu, record.line_no))
                })
                .collect();

            for (record, decision) in batch.iter().zip(decisions) {
                stats.lines += 1;
                pb.inc(1);
                CORPUS_LINES_READ_TOTAL.with_label_values(&["decision"]).inc();
                match decision {
                    Some(verdicts) => {
                        for (policy, verdict) in self.policies.iter().zip(&verdicts) {
                            router.write(verdict, &policy.name, &record.raw)?;
                            stats.record(&policy.name, verdict);
                            POLICY_VERDICTS_TOTAL
                                .with_label_values(&[policy.name.as_str(), verdict.label()])
                                .inc();
                        }
                        router.log_decision(&verdicts)?;
                    }
                    None => {
                        if let Err(e) = &record.tu {
                            debug!(line = record.line_no, error = %e, "Skipping malformed line");
                        }
                        stats.skipped += 1;
                        LINES_SKIPPED_TOTAL.with_label_values(&["decision"]).inc();
                        router.write_skipped(&record.raw)?;
                        router.log_skipped()?;
                    }
                }
            }
        }

        router.close()?;
        pb.finish_with_message("Decision scan done");
        timer.observe_duration();
        info!(
            lines = stats.lines,
            skipped = stats.skipped,
            output = %output_dir.display(),
            "Decision scan complete"
        );
        Ok(stats)
    }
}

/// Scores one TU with every filter and decides it with every policy.
/// Returns one verdict per policy, in policy order.
fn score(
    filters: &[FilterEntry],
    policies: &[PolicyEntry],
    tu: &TranslationUnit,
    line_no: usize,
) -> Vec<Verdict> {
    let results: Vec<FilterResult> = filters
        .iter()
        .map(|entry| {
            let verdict = entry.filter.decide(tu).unwrap_or_else(|e| {
                warn!(filter = %entry.name, line = line_no, error = %e, "Filter failed to decide");
                FILTER_ERRORS_TOTAL
                    .with_label_values(&[entry.name.as_str(), "decision"])
                    .inc();
                Verdict::Other(FILTER_ERROR_VERDICT.to_string())
            });
            FilterResult::new(entry.name.clone(), verdict)
        })
        .collect();

    policies
        .iter()
        .map(|entry| {
            entry.policy.decide(&results).unwrap_or_else(|e| {
                warn!(policy = %entry.name, line = line_no, error = %e, "Policy failed to decide");
                Verdict::Other(NO_ANSWER_VERDICT.to_string())
            })
        })
        .collect()
}
