// src/bin/cleaner.rs

//! # Cleaner Binary
//!
//! Command-line entry point for cleaning a bilingual translation memory.
//!
//! 1.  **Configuration**: reads the YAML/JSON config named by `--config`, which
//!     lists the corpus, the optional alignment file, the language pair and the
//!     filters and policies to enable. `--validate-config` stops here.
//!
//! 2.  **Learning**: every enabled filter observes the corpus for as many passes
//!     as it asks for.
//!
//! 3.  **Decision**: one more scan in which the filters score each translation
//!     unit and every policy routes it to `<verdict>_<policy>__<corpus>` in the
//!     output folder, with a per-line decision log alongside.
//!
//! Logging goes through `tracing` (`RUST_LOG`, `--log-json`, `--log-dir`);
//! `--summary` and `--metrics-file` dump a JSON run summary and Prometheus
//! metrics once the run is over.

use anyhow::Context;
use clap::Parser;
use tracing::error;
use TmCleaner::cleaner_logic::run_cleaner;
use TmCleaner::config::Args;
use TmCleaner::utils::common::init_tracing;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    // Held until exit so the file writer flushes.
    let _log_guard = init_tracing(args.log_json, args.log_dir.as_deref());

    run_cleaner(&args)
        .inspect_err(|e| error!(error = %e, "Cleaning run failed"))
        .with_context(|| format!("tm-cleaner failed with config '{}'", args.config.display()))?;
    Ok(())
}
