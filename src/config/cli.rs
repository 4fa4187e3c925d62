use std::path::PathBuf;

use clap::Parser;

// Define command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Cleans a bilingual translation memory", long_about = None)]
pub struct Args {
    /// Path to the cleaner configuration file (YAML or JSON).
    #[arg(short = 'c', long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    pub validate_config: bool,

    /// Write a JSON run summary to this path
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Write Prometheus text-format metrics to this path after the run
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Write logs to `<dir>/tm-cleaner.log` instead of stdout
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Disable the per-scan progress spinners
    #[arg(long)]
    pub no_progress: bool,
}
