// src/cleaner_logic.rs

use std::time::Instant;

use indicatif::HumanDuration;
use tracing::{info, instrument, warn};

use crate::config::{load_cleaner_config, Args, CleanerConfig, ComponentToggle};
use crate::data_model::RunOutcome;
use crate::error::Result;
use crate::executor::PipelineExecutor;
use crate::pipeline::registry::ComponentRegistry;
use crate::utils::prometheus_metrics::write_metrics_file;

/// Warns about enabled entries that no registered factory can build. These
/// would be skipped at load time; listing them up front makes typos visible.
pub fn unknown_components(config: &CleanerConfig, registry: &ComponentRegistry) -> Vec<String> {
    let filters = registry.filter_names();
    let policies = registry.policy_names();
    let unknown = |toggles: &[ComponentToggle], known: &[&str]| -> Vec<String> {
        toggles
            .iter()
            .filter(|t| t.enabled && !known.contains(&t.name.as_str()))
            .map(|t| t.name.clone())
            .collect()
    };
    let mut names = unknown(&config.filters, &filters);
    names.extend(unknown(&config.policies, &policies));
    names
}

/// Runs the cleaner as configured by the command line.
///
/// Returns `None` when only validating the configuration.
#[instrument(skip(args), fields(config = %args.config.display()))]
pub fn run_cleaner(args: &Args) -> Result<Option<RunOutcome>> {
    let config = load_cleaner_config(&args.config)?;
    let registry = ComponentRegistry::with_builtins();
    info!(
        input = %config.input_path().display(),
        output = %config.output_dir().display(),
        source = %config.options.source_language,
        target = %config.options.target_language,
        "Configuration loaded"
    );
    for name in unknown_components(&config, &registry) {
        warn!(name = %name, "Configured component has no registered implementation");
    }

    if args.validate_config {
        info!("Configuration is valid");
        return Ok(None);
    }

    let started = Instant::now();
    let mut executor = PipelineExecutor::new(config, registry).with_progress(!args.no_progress);
    let outcome = executor.run()?;

    match &outcome {
        RunOutcome::Completed(summary) => {
            if let Some(stats) = &summary.decision {
                info!(
                    lines = stats.lines,
                    skipped = stats.skipped,
                    learning_passes = summary.learning_passes,
                    elapsed = %HumanDuration(started.elapsed()),
                    "Cleaning finished"
                );
                for (policy, verdicts) in &stats.verdicts {
                    info!(policy = %policy, ?verdicts, "Verdict counts");
                }
            }
        }
        RunOutcome::Aborted { reason, summary } => {
            warn!(
                %reason,
                excluded = summary.excluded.len(),
                "Cleaning stopped before the decision scan"
            );
        }
    }

    if let Some(path) = &args.summary {
        outcome.summary().write_json(path)?;
        info!(path = %path.display(), "Run summary written");
    }
    if let Some(path) = &args.metrics_file {
        write_metrics_file(path)?;
        info!(path = %path.display(), "Metrics written");
    }
    Ok(Some(outcome))
}
