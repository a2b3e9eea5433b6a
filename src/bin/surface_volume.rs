//! surface-volume: Bezier patch volume benchmark
//!
//! Integrates the separation between the top and bottom control patches on
//! an N×N grid, K times, on a T-thread pool, and prints the average volume
//! with peak and average throughput.
//!
//! Run: `surface-volume --grid-size 1000 --workers 8 --trials 20`

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use kernel_bench::config::Config;
use kernel_bench::harness::SurfaceBenchmark;
use kernel_bench::logging;

/// surface-volume: Bezier patch volume benchmark
#[derive(Parser, Debug)]
#[command(name = "surface-volume")]
#[command(author = "PAIML Team")]
#[command(version)]
#[command(about = "Weighted-tile volume between two bicubic Bezier patches", long_about = None)]
struct Cli {
    /// Config file path (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grid resolution N (nodes per side)
    #[arg(short = 'n', long)]
    grid_size: Option<usize>,

    /// Worker-pool size T
    #[arg(short, long)]
    workers: Option<usize>,

    /// Number of timed trials K
    #[arg(short, long)]
    trials: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(n) = self.grid_size {
            config.surface.grid_size = n;
        }
        if let Some(workers) = self.workers {
            config.surface.workers = workers;
        }
        if let Some(trials) = self.trials {
            config.surface.trials = trials;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.into_config()?;
    let benchmark = SurfaceBenchmark::from_config(&config.surface)?;

    println!(
        "N = {}, workers = {}, trials = {}",
        config.surface.grid_size,
        benchmark.workers(),
        config.surface.trials
    );
    println!("{}", benchmark.run());
    Ok(())
}
