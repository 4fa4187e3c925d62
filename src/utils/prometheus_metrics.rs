// src/utils/prometheus_metrics.rs

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};

use crate::error::Result;

pub static CORPUS_LINES_READ_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tm_cleaner_corpus_lines_read_total",
        "Total number of corpus lines read, by scan phase.",
        &["phase"]
    )
    .expect("Failed to register CORPUS_LINES_READ_TOTAL counter vec")
});

pub static LINES_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tm_cleaner_lines_skipped_total",
        "Total number of malformed or undecodable corpus lines, by scan phase.",
        &["phase"]
    )
    .expect("Failed to register LINES_SKIPPED_TOTAL counter vec")
});

pub static FILTER_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tm_cleaner_filter_errors_total",
        "Total number of failed filter calls, by filter and phase.",
        &["filter", "phase"]
    )
    .expect("Failed to register FILTER_ERRORS_TOTAL counter vec")
});

pub static POLICY_VERDICTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tm_cleaner_policy_verdicts_total",
        "Total number of verdicts produced, by policy and verdict.",
        &["policy", "verdict"]
    )
    .expect("Failed to register POLICY_VERDICTS_TOTAL counter vec")
});

pub static COMPONENTS_EXCLUDED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "tm_cleaner_components_excluded_total",
        "Total number of filters or policies excluded during load, initialization or finalization."
    )
    .expect("Failed to register COMPONENTS_EXCLUDED_TOTAL counter")
});

pub static SCAN_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "tm_cleaner_scan_duration_seconds",
        "Wall-clock duration of a full corpus scan, by phase.",
        &["phase"]
    )
    .expect("Failed to register SCAN_DURATION_SECONDS histogram vec")
});

/// Renders every registered metric in the Prometheus text exposition format.
pub fn render_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| {
        crate::error::PipelineError::Unexpected(format!("Prometheus metrics UTF-8 error: {}", e))
    })
}

/// Writes the current metrics snapshot to `path`.
pub fn write_metrics_file(path: &std::path::Path) -> Result<()> {
    let rendered = render_metrics()?;
    std::fs::write(path, rendered)?;
    Ok(())
}
