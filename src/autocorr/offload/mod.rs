//! Accelerator-offloaded strategy.
//!
//! The device pipeline (adapter, device, buffers, program build, dispatch,
//! read-back) sits behind the [`OffloadExecutor`] trait. Executors own their
//! device resources through RAII handles, so everything acquired for a run
//! is released on every exit path, including a failed program build.
//!
//! Executors:
//! - [`HostExecutor`]: always available; runs the kernel's work groups on a
//!   rayon pool
//! - `WgpuExecutor`: compiles the WGSL program and runs it on a GPU
//!   (feature `gpu`)

use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::signal::Signal;

pub mod host;
#[cfg(feature = "gpu")]
pub mod wgpu;

pub use host::HostExecutor;
#[cfg(feature = "gpu")]
pub use self::wgpu::WgpuExecutor;

/// WGSL source of the built-in autocorrelation kernel.
pub const BUILTIN_KERNEL: &str = include_str!("../../../kernels/autocorrelate.wgsl");

/// Entry point every autocorrelation program must export.
pub const ENTRY_POINT: &str = "autocorrelate";

/// A kernel program plus its launch geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelProgram {
    source: String,
    entry_point: String,
    local_size: u32,
}

impl KernelProgram {
    /// Creates a program from source text.
    #[must_use]
    pub fn new(source: impl Into<String>, entry_point: impl Into<String>, local_size: u32) -> Self {
        Self { source: source.into(), entry_point: entry_point.into(), local_size: local_size.max(1) }
    }

    /// The built-in kernel with the given work-group size.
    #[must_use]
    pub fn builtin(local_size: u32) -> Self {
        Self::new(BUILTIN_KERNEL, ENTRY_POINT, local_size)
    }

    /// Reads a kernel program from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingResource`] if the file cannot be read.
    pub fn load(path: impl AsRef<Path>, local_size: u32) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|_| Error::MissingResource { path: path.to_path_buf() })?;
        log::debug!("loaded kernel program {} ({} bytes)", path.display(), source.len());
        Ok(Self::new(source, ENTRY_POINT, local_size))
    }

    /// Loads `path` when given, otherwise the built-in kernel.
    pub fn resolve(path: Option<&Path>, local_size: u32) -> Result<Self> {
        match path {
            Some(path) => Self::load(path, local_size),
            None => Ok(Self::builtin(local_size)),
        }
    }

    /// Program source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Entry-point function name.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Work items per work group.
    #[must_use]
    pub const fn local_size(&self) -> u32 {
        self.local_size
    }

    /// Returns true if this is the built-in kernel source.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.source == BUILTIN_KERNEL
    }

    /// Returns true if the source defines a function named after the entry point.
    #[must_use]
    pub fn declares_entry_point(&self) -> bool {
        self.source.split("fn ").skip(1).any(|rest| {
            rest.trim_start()
                .strip_prefix(self.entry_point.as_str())
                .is_some_and(|tail| tail.trim_start().starts_with('('))
        })
    }

    /// Number of work groups covering `work_items`.
    #[must_use]
    pub fn work_groups(&self, work_items: usize) -> usize {
        work_items.div_ceil(self.local_size as usize)
    }
}

/// Output of one offloaded kernel run.
#[derive(Debug, Clone)]
pub struct OffloadRun {
    /// Values read back from the device.
    pub output: Vec<f32>,
    /// Time between dispatch and completion, excluding setup and transfers.
    pub kernel_elapsed: Duration,
}

/// A device that can run a data-parallel autocorrelation program.
///
/// `run` receives the doubled signal (`2 * output_len` floats) and must
/// return `output_len` sums, one work item per output slot.
pub trait OffloadExecutor {
    /// Human-readable device name.
    fn device_name(&self) -> String;

    /// Builds `program`, uploads `input`, dispatches and reads back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Device`] naming the failed pipeline step.
    fn run(&self, program: &KernelProgram, input: &[f32], output_len: usize) -> Result<OffloadRun>;
}

/// Which executor the accelerator strategy uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// GPU when available, host otherwise.
    #[default]
    Auto,
    /// Always the host executor.
    Host,
    /// Always the GPU; fails if none is available.
    Gpu,
}

/// Creates the executor for `preference`.
///
/// `host_workers` sizes the host executor's pool.
///
/// # Errors
///
/// Returns [`Error::MissingCapability`] if the requested device is absent.
pub fn select_executor(
    preference: DevicePreference,
    host_workers: usize,
) -> Result<Box<dyn OffloadExecutor>> {
    match preference {
        DevicePreference::Host => Ok(Box::new(HostExecutor::new(host_workers)?)),
        DevicePreference::Gpu => gpu_executor(),
        DevicePreference::Auto => match gpu_executor() {
            Ok(executor) => Ok(executor),
            Err(e) => {
                log::debug!("no GPU executor ({e}); using host executor");
                Ok(Box::new(HostExecutor::new(host_workers)?))
            }
        },
    }
}

#[cfg(feature = "gpu")]
fn gpu_executor() -> Result<Box<dyn OffloadExecutor>> {
    Ok(Box::new(WgpuExecutor::new()?))
}

#[cfg(not(feature = "gpu"))]
fn gpu_executor() -> Result<Box<dyn OffloadExecutor>> {
    Err(Error::MissingCapability("GPU offload requires the `gpu` feature".to_string()))
}

/// Runs the autocorrelation program on `executor`.
///
/// # Errors
///
/// Propagates executor failures and rejects read-backs of the wrong length.
pub fn autocorrelate(
    signal: &Signal,
    executor: &dyn OffloadExecutor,
    program: &KernelProgram,
) -> Result<OffloadRun> {
    let run = executor.run(program, signal.doubled(), signal.len())?;
    if run.output.len() != signal.len() {
        return Err(Error::LengthMismatch { expected: signal.len(), actual: run.output.len() });
    }
    Ok(run)
}

/// Checks the doubled-input contract shared by all executors.
pub(crate) fn check_input(input: &[f32], output_len: usize) -> Result<()> {
    if output_len == 0 {
        return Err(Error::invalid_input("offload run needs at least one output slot"));
    }
    if input.len() != 2 * output_len {
        return Err(Error::LengthMismatch { expected: 2 * output_len, actual: input.len() });
    }
    Ok(())
}
