// src/pipeline/policies/mod.rs

mod voting;

pub use voting::{MajorityVotePolicy, OneNoPolicy, PassThroughPolicy, NEUTRAL};
