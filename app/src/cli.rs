//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

/// Enrich a football roster with market values scraped from the web.
#[derive(Debug, Parser)]
#[command(name = "rostermark", version, about)]
pub struct Cli {
    /// Dataset folder holding the input roster and the result table
    #[arg(default_value = ".")]
    pub folder: PathBuf,

    /// Explicit input roster file (otherwise searched in the folder)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Worker count for the main pass (otherwise prompted)
    #[arg(long)]
    pub workers: Option<usize>,

    /// 1-based row to start from (otherwise prompted)
    #[arg(long)]
    pub start_row: Option<usize>,

    /// Fill every result column without prompting for a selection
    #[arg(long)]
    pub fill_all: bool,

    /// Run the slow backfill checker after the main pass
    #[arg(long)]
    pub backfill: bool,

    /// Accept defaults for everything not given as a flag (no prompts)
    #[arg(long, short = 'y')]
    pub yes: bool,
}
