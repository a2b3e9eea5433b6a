//! autocorrelate: circular autocorrelation benchmark
//!
//! Reads `signal.txt` (length followed by samples), computes every
//! shift-sum serially, on worker pools, with SIMD and through an offload
//! executor, and prints per-strategy timings with spot-check samples.
//!
//! Run: `autocorrelate --signal signal.txt --workers 1 --workers 8`

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use kernel_bench::autocorr::offload::DevicePreference;
use kernel_bench::autocorr::simd::VectorBackend;
use kernel_bench::autocorr::Strategy;
use kernel_bench::config::Config;
use kernel_bench::harness::AutocorrBenchmark;
use kernel_bench::logging;

/// autocorrelate: circular autocorrelation benchmark
#[derive(Parser, Debug)]
#[command(name = "autocorrelate")]
#[command(author = "PAIML Team")]
#[command(version)]
#[command(about = "Serial/parallel/SIMD/offload circular autocorrelation timings", long_about = None)]
struct Cli {
    /// Config file path (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Signal file: length followed by samples
    #[arg(short, long)]
    signal: Option<PathBuf>,

    /// Worker-pool size for the parallel strategy (repeatable)
    #[arg(short, long)]
    workers: Vec<usize>,

    /// Strategy to run (repeatable; default all, in order)
    #[arg(long, value_enum)]
    strategy: Vec<Strategy>,

    /// Inner-product implementation for the SIMD strategy
    #[arg(long, value_enum)]
    simd_backend: Option<VectorBackend>,

    /// Offload executor
    #[arg(long, value_enum)]
    device: Option<DevicePreference>,

    /// Work-group size for the offload strategy
    #[arg(long)]
    local_size: Option<u32>,

    /// Kernel program file (WGSL); built-in kernel when absent.
    /// The host executor only checks its entry point and runs built-in arithmetic.
    #[arg(long)]
    kernel: Option<PathBuf>,

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
        let autocorr = &mut config.autocorrelation;
        if let Some(signal) = self.signal {
            autocorr.signal_path = signal;
        }
        if !self.workers.is_empty() {
            autocorr.worker_counts = self.workers;
        }
        if !self.strategy.is_empty() {
            autocorr.strategies = self.strategy;
        }
        if let Some(backend) = self.simd_backend {
            autocorr.simd_backend = backend;
        }
        if let Some(device) = self.device {
            autocorr.device = device;
        }
        if let Some(local_size) = self.local_size {
            autocorr.local_size = local_size;
        }
        if self.kernel.is_some() {
            autocorr.kernel_path = self.kernel;
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
    let benchmark = AutocorrBenchmark::from_config(&config.autocorrelation)?;
    println!("{}", benchmark.run()?);
    Ok(())
}
