//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "millgen", version, about = "Synthetic paper-machine dataset generator")]
pub struct Cli {
    /// Path to the run config TOML; sheet paths resolve against its directory
    #[arg(long, value_name = "FILE", default_value = "millgen.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG takes precedence
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate one dataset and print its path
    Generate {
        /// Noise seed (overrides `seed` in the config)
        #[arg(long, value_name = "N")]
        seed: Option<u64>,
        /// Output directory (overrides `output.dir` in the config)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
    /// Load and cross-check the config and every sheet without generating
    Check,
    /// Print the row plan: rows per phase, final_row, dyn_row, first_val
    Plan,
}
