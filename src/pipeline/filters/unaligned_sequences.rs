use itertools::Itertools;
use tracing::info;

use crate::data_model::{TranslationUnit, Verdict};
use crate::error::Result;
use crate::executor::TuFilter;
use crate::pipeline::filters::stats::{LearnedStats, RunningStats};

/// Number of contiguous aligned runs on one side of a TU, divided by the
/// side's token count.
///
/// Indices are collapsed to a sorted set. The first index opens a run, and so
/// does every index more than one past its predecessor. One extra boundary is
/// counted when the last aligned index sits more than one position before the
/// end of the sequence (an unaligned tail). A side with no tokens has ratio 0.
pub fn fragmentation_ratio<I>(aligned_indices: I, sequence_len: usize) -> f64
where
    I: IntoIterator<Item = usize>,
{
    if sequence_len == 0 {
        return 0.0;
    }
    let mut runs = 0usize;
    let mut last: Option<usize> = None;
    for index in aligned_indices.into_iter().sorted_unstable().dedup() {
        match last {
            None => runs += 1,
            Some(prev) if index - prev > 1 => runs += 1,
            Some(_) => {}
        }
        last = Some(index);
    }
    // `last` of -1 for an empty set makes any non-empty sequence a tail.
    let last = last.map(|l| l as i64).unwrap_or(-1);
    if sequence_len as i64 - last > 1 {
        runs += 1;
    }
    runs as f64 / sequence_len as f64
}

/// Learns how fragmented word alignments usually are and rejects TUs whose
/// source or target fragmentation lies more than two standard deviations
/// from the corpus mean.
#[derive(Debug, Default)]
pub struct UnalignedSequencesFilter {
    source_language: String,
    target_language: String,
    src: RunningStats,
    trg: RunningStats,
    src_learned: LearnedStats,
    trg_learned: LearnedStats,
}

impl UnalignedSequencesFilter {
    pub const NAME: &'static str = "NumberOfUnalignedSequences";
    const MAX_DEVIATIONS: f64 = 2.0;

    pub fn new() -> Self {
        Self::default()
    }

    fn ratios(tu: &TranslationUnit) -> (f64, f64) {
        let pairs = tu.alignment_pairs();
        (
            fragmentation_ratio(pairs.iter().map(|&(s, _)| s), tu.src_tokens.len()),
            fragmentation_ratio(pairs.iter().map(|&(_, t)| t), tu.trg_tokens.len()),
        )
    }

    pub fn learned(&self) -> (LearnedStats, LearnedStats) {
        (self.src_learned, self.trg_learned)
    }
}

impl TuFilter for UnalignedSequencesFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, source_language: &str, target_language: &str) -> Result<()> {
        self.source_language = source_language.to_string();
        self.target_language = target_language.to_string();
        Ok(())
    }

    fn number_of_scans(&self) -> usize {
        1
    }

    fn process_tu(&mut self, tu: TranslationUnit, _pass_index: usize) -> Result<()> {
        if tu.has_empty_side() {
            return Ok(());
        }
        let (src_ratio, trg_ratio) = Self::ratios(&tu);
        self.src.push(src_ratio);
        self.trg.push(trg_ratio);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.src_learned = self.src.learned();
        self.trg_learned = self.trg.learned();
        info!(
            observed = self.src.count,
            src_lang = %self.source_language,
            src_mean = self.src_learned.mean,
            src_std_dev = self.src_learned.std_dev,
            trg_lang = %self.target_language,
            trg_mean = self.trg_learned.mean,
            trg_std_dev = self.trg_learned.std_dev,
            "Number of unaligned sequences learned"
        );
        Ok(())
    }

    fn decide(&self, tu: &TranslationUnit) -> Result<Verdict> {
        if tu.has_empty_side() {
            return Ok(Verdict::Reject);
        }
        let (src_ratio, trg_ratio) = Self::ratios(tu);
        if self.src_learned.is_outlier(src_ratio, Self::MAX_DEVIATIONS)
            || self.trg_learned.is_outlier(trg_ratio, Self::MAX_DEVIATIONS)
        {
            Ok(Verdict::Reject)
        } else {
            Ok(Verdict::Accept)
        }
    }
}
