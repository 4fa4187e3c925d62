// src/utils/common.rs

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

pub const SCAN_PB_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {msg} Lines: {pos} ({per_sec})";

/// Creates a spinner for a corpus scan, or a hidden bar when progress output
/// is disabled (library callers and tests).
pub fn create_progress_bar(enabled: bool, message: &str, template: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// Initializes the global tracing subscriber.
///
/// The level comes from `RUST_LOG` and defaults to `info`. When `log_dir` is
/// given, events go to `<log_dir>/tm-cleaner.log` through a non-blocking
/// writer; the returned guard must stay alive until the run ends so buffered
/// lines are flushed.
pub fn init_tracing(json: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::Subscriber::builder().with_env_filter(filter);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, "tm-cleaner.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = builder.with_writer(writer).with_ansi(false);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
            Some(guard)
        }
        None => {
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
            None
        }
    }
}
