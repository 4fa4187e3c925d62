// src/pipeline/scheduler.rs

//! Shares corpus scans between filters with different learning-pass needs.
//!
//! The corpus is read `max_scans` times in total. Passes are handed out from
//! the end: a filter that needs `r` passes joins the last `r` of them, so every
//! filter finishes learning on the same final pass and the decision scan can
//! follow immediately.

use crate::pipeline::registry::FilterEntry;

/// One filter's slot in a learning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    /// Position of the filter in the executor's active filter list.
    pub entry_index: usize,
    /// How many of this filter's own passes completed before this one.
    pub pass_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    pub pass: usize,
    pub participants: Vec<Participant>,
}

impl ScanPlan {
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ScanScheduler {
    requirements: Vec<usize>,
    max_scans: usize,
}

impl ScanScheduler {
    /// `requirements[i]` is the learning-pass count of filter `i`.
    pub fn new(requirements: Vec<usize>) -> Self {
        let max_scans = requirements.iter().copied().max().unwrap_or(0);
        ScanScheduler {
            requirements,
            max_scans,
        }
    }

    /// Builds a schedule from loaded entries. Entries without a usable
    /// requirement never join a pass.
    pub fn from_entries(entries: &[FilterEntry]) -> Self {
        Self::new(
            entries
                .iter()
                .map(|entry| entry.scans().unwrap_or(0))
                .collect(),
        )
    }

    pub fn max_scans(&self) -> usize {
        self.max_scans
    }

    /// Filters taking part in global pass `pass`.
    pub fn plan(&self, pass: usize) -> ScanPlan {
        let mut participants = Vec::new();
        if pass < self.max_scans {
            let remaining = self.max_scans - pass;
            for (entry_index, &required) in self.requirements.iter().enumerate() {
                if required >= remaining {
                    participants.push(Participant {
                        entry_index,
                        pass_index: required - remaining,
                    });
                }
            }
        }
        ScanPlan { pass, participants }
    }

    pub fn plans(&self) -> impl Iterator<Item = ScanPlan> + '_ {
        (0..self.max_scans).map(move |pass| self.plan(pass))
    }
}
