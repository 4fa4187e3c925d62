// src/config.rs

pub mod cleaner;
pub mod cli;

pub use cleaner::{load_cleaner_config, CleanerConfig, CleanerOptions, ComponentToggle};
pub use cli::Args;
