use tracing::info;

use crate::data_model::{TranslationUnit, Verdict};
use crate::error::Result;
use crate::executor::TuFilter;
use crate::pipeline::filters::stats::{LearnedStats, RunningStats};
use crate::utils::safe_ratio;

/// Learns the usual source/target token-count ratio of the corpus and
/// rejects TUs more than two standard deviations away from it.
#[derive(Debug, Default)]
pub struct LengthRatioFilter {
    ratios: RunningStats,
    learned: LearnedStats,
}

impl LengthRatioFilter {
    pub const NAME: &'static str = "LengthRatioFilter";
    const MAX_DEVIATIONS: f64 = 2.0;

    pub fn new() -> Self {
        Self::default()
    }

    fn ratio(tu: &TranslationUnit) -> f64 {
        safe_ratio(tu.src_tokens.len(), tu.trg_tokens.len())
    }

    pub fn learned(&self) -> LearnedStats {
        self.learned
    }
}

impl TuFilter for LengthRatioFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, _source_language: &str, _target_language: &str) -> Result<()> {
        Ok(())
    }

    fn number_of_scans(&self) -> usize {
        1
    }

    fn process_tu(&mut self, tu: TranslationUnit, _pass_index: usize) -> Result<()> {
        if !tu.has_empty_side() {
            self.ratios.push(Self::ratio(&tu));
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.learned = self.ratios.learned();
        info!(
            observed = self.ratios.count,
            mean = self.learned.mean,
            std_dev = self.learned.std_dev,
            "Length ratio learned"
        );
        Ok(())
    }

    fn decide(&self, tu: &TranslationUnit) -> Result<Verdict> {
        if tu.has_empty_side() || self.learned.is_outlier(Self::ratio(tu), Self::MAX_DEVIATIONS) {
            Ok(Verdict::Reject)
        } else {
            Ok(Verdict::Accept)
        }
    }
}
