// trkf_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// trkf_sim: generate muon tracks in a wire-plane LArTPC and fit them with
/// the Kalman filter.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "scenarios/collection_muon.toml")]
    pub scenario: PathBuf,

    /// Run every `*.toml` scenario found under this directory instead.
    #[arg(long)]
    pub scenario_dir: Option<PathBuf>,

    /// Number of events to generate per scenario (overrides the scenario).
    #[arg(short, long)]
    pub events: Option<usize>,

    /// Print the resolved configuration and exit.
    #[arg(long, default_value_t = false)]
    pub dump_config: bool,
}
