// src/pipeline/policies/voting.rs

use crate::data_model::{FilterResult, Verdict};
use crate::error::Result;
use crate::executor::DecisionPolicy;

/// Label used when a policy has no reason to lean either way.
pub const NEUTRAL: &str = "neutral";

/// Rejects a TU as soon as a single filter said `reject`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OneNoPolicy;

impl OneNoPolicy {
    pub const NAME: &'static str = "OneNoPolicy";
}

impl DecisionPolicy for OneNoPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn decide(&self, results: &[FilterResult]) -> Result<Verdict> {
        if results.iter().any(|r| r.verdict == Verdict::Reject) {
            Ok(Verdict::Reject)
        } else {
            Ok(Verdict::Accept)
        }
    }
}

/// Counts accepts against rejects. Custom verdicts abstain.
#[derive(Debug, Default, Clone, Copy)]
pub struct MajorityVotePolicy;

impl MajorityVotePolicy {
    pub const NAME: &'static str = "MajorityVotePolicy";
}

impl DecisionPolicy for MajorityVotePolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn decide(&self, results: &[FilterResult]) -> Result<Verdict> {
        let (accepts, rejects) =
            results
                .iter()
                .fold((0usize, 0usize), |(a, r), result| match result.verdict {
                    Verdict::Accept => (a + 1, r),
                    Verdict::Reject => (a, r + 1),
                    Verdict::Other(_) => (a, r),
                });
        Ok(match accepts.cmp(&rejects) {
            std::cmp::Ordering::Greater => Verdict::Accept,
            std::cmp::Ordering::Less => Verdict::Reject,
            std::cmp::Ordering::Equal => Verdict::Other(NEUTRAL.to_string()),
        })
    }
}

/// Forwards the first filter's verdict unchanged, custom labels included.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughPolicy;

impl PassThroughPolicy {
    pub const NAME: &'static str = "PassThroughPolicy";
}

impl DecisionPolicy for PassThroughPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn decide(&self, results: &[FilterResult]) -> Result<Verdict> {
        Ok(results
            .first()
            .map(|r| r.verdict.clone())
            .unwrap_or_else(|| Verdict::Other(NEUTRAL.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(verdicts: &[&str]) -> Vec<FilterResult> {
        verdicts
            .iter()
            .enumerate()
            .map(|(i, v)| FilterResult::new(format!("filter_{}", i), Verdict::from_label(v)))
            .collect()
    }

    #[test]
    fn test_one_no_policy() {
        let policy = OneNoPolicy;
        assert_eq!(
            policy.decide(&results(&["accept", "reject", "accept"])).unwrap(),
            Verdict::Reject
        );
        assert_eq!(
            policy.decide(&results(&["accept", "maybe"])).unwrap(),
            Verdict::Accept
        );
        assert_eq!(policy.decide(&[]).unwrap(), Verdict::Accept);
    }

    #[test]
    fn test_majority_vote_policy() {
        let policy = MajorityVotePolicy;
        assert_eq!(
            policy.decide(&results(&["accept", "reject", "accept"])).unwrap(),
            Verdict::Accept
        );
        assert_eq!(
            policy.decide(&results(&["reject", "reject", "accept"])).unwrap(),
            Verdict::Reject
        );
        // custom labels abstain, leaving a tie
        assert_eq!(
            policy.decide(&results(&["accept", "error", "reject"])).unwrap(),
            Verdict::Other(NEUTRAL.to_string())
        );
    }

    #[test]
    fn test_pass_through_policy() {
        let policy = PassThroughPolicy;
        assert_eq!(
            policy.decide(&results(&["reject", "accept"])).unwrap(),
            Verdict::Reject
        );
        assert_eq!(
            policy.decide(&results(&["suspicious"])).unwrap(),
            Verdict::Other("suspicious".to_string())
        );
        assert_eq!(
            policy.decide(&[]).unwrap(),
            Verdict::Other(NEUTRAL.to_string())
        );
    }
}
