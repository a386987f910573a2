//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "reptrack",
    version,
    about = "Repetition counter and rep-attempt diagnostics over joint-angle samples"
)]
pub struct Cli {
    /// Path to config TOML (defaults apply when omitted)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Emit JSON (summary on stdout, logs and errors as JSON lines)
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG overrides
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a tracking session over a recorded samples CSV
    Replay(ReplayArgs),
    /// Validate the config and print the effective thresholds
    CheckConfig,
    /// Propose tuned thresholds from a previous session's documents
    Optimize(OptimizeArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Samples CSV: timestamp,angle,confidence,visible_keypoints[,form_score]
    #[arg(long, value_name = "CSV")]
    pub samples: PathBuf,
    /// Directory for the transitions/attempts/summary documents (overrides [output] dir)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
    /// Session identifier used in output file names
    #[arg(long, value_name = "ID")]
    pub session_id: Option<String>,
    /// Replay in real time, sleeping the gap between sample timestamps
    #[arg(long, action = ArgAction::SetTrue)]
    pub pace: bool,
    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    pub max_frames: Option<u64>,
    /// Skip writing the session documents
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_export: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct OptimizeArgs {
    /// Directory holding the session documents (defaults to [output] dir)
    #[arg(long = "in-dir", value_name = "DIR")]
    pub in_dir: Option<PathBuf>,
    /// Session to analyze (defaults to the latest by file name)
    #[arg(long, value_name = "ID")]
    pub session_id: Option<String>,
    /// Where to write the tuned config (defaults to <in-dir>/optimized_config.toml)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
    /// Print the analysis without writing a config
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,
}
