// src/pipeline/writers/mod.rs

pub mod output_router;

pub use output_router::{OutputKey, OutputRouter};
