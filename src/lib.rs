#![allow(non_snake_case)]

// Declare the modules that form the library's public API
pub mod cleaner_logic;
pub mod config;
pub mod data_model;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod utils;

pub use data_model::{RunOutcome, TranslationUnit, Verdict};
pub use error::{PipelineError, Result};
pub use executor::{DecisionPolicy, PipelineExecutor, TuFilter};
