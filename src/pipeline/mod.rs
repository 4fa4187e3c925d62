// src/pipeline/mod.rs

pub mod filters;
pub mod policies;
pub mod readers;
pub mod registry;
pub mod scheduler;
pub mod writers;
