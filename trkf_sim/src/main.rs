// trkf_sim/src/main.rs

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use trkf_sim::cli::Cli;
use trkf_sim::prelude::*;
use trkf_sim::simulation::config::discover_scenarios;

fn main() -> ExitCode {
    let args = Cli::parse();

    // RUST_LOG wins over the default filter.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli) -> SimResult<()> {
    let paths = match &args.scenario_dir {
        Some(dir) => discover_scenarios(dir)?,
        None => vec![args.scenario.clone()],
    };

    let mut summaries: Vec<ScenarioSummary> = Vec::with_capacity(paths.len());
    for path in &paths {
        info!("Loading scenario from {:?}", path);
        let config = ScenarioConfig::load(path)?;
        if args.dump_config {
            println!("# {}\n{}", path.display(), config.to_toml()?);
            continue;
        }
        summaries.push(run_scenario(&config, args.events)?);
    }

    for s in &summaries {
        println!(
            "{:<24} fitted {:>3}/{:<3} failed {:>3}  states {:>7.1}  angle {:>7.2} mrad  p {:>6.3} GeV/c",
            s.name,
            s.fitted,
            s.events,
            s.failed,
            s.mean_states,
            s.mean_angle_error * 1e3,
            s.mean_momentum
        );
    }
    Ok(())
}
