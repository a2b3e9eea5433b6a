//! Host-side offload executor.
//!
//! Emulates an accelerator on the CPU: the program is "built" by checking
//! that it exports the autocorrelation entry point, the output is split into
//! work groups of `local_size` work items, and work groups are scheduled on
//! a private rayon pool.
//!
//! Only the entry-point name of a program is inspected; the work items
//! always run the built-in shift-sum arithmetic.

use std::time::Instant;

use rayon::prelude::*;
use rayon::ThreadPool;

use super::{check_input, KernelProgram, OffloadExecutor, OffloadRun};
use crate::error::{DeviceStage, Error, Result};
use crate::harness::worker_pool;

/// Runs autocorrelation programs on a CPU worker pool.
pub struct HostExecutor {
    pool: ThreadPool,
}

impl HostExecutor {
    /// Creates an executor backed by `workers` threads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCapability`] if the pool cannot be created.
    pub fn new(workers: usize) -> Result<Self> {
        Ok(Self { pool: worker_pool(workers)? })
    }
}

impl OffloadExecutor for HostExecutor {
    fn device_name(&self) -> String {
        format!("host ({} workers)", self.pool.current_num_threads())
    }

    fn run(&self, program: &KernelProgram, input: &[f32], output_len: usize) -> Result<OffloadRun> {
        if !program.declares_entry_point() {
            return Err(Error::device(
                DeviceStage::ProgramBuild,
                format!("program does not define entry point '{}'", program.entry_point()),
            ));
        }
        check_input(input, output_len).map_err(|e| Error::device(DeviceStage::Buffer, e.to_string()))?;
        if !program.is_builtin() {
            log::warn!(
                "host executor ignores the body of custom kernel '{}'; running the built-in shift-sum",
                program.entry_point()
            );
        }

        let local_size = program.local_size() as usize;
        let mut output = vec![0.0f32; output_len];

        let start = Instant::now();
        self.pool.install(|| {
            output.par_chunks_mut(local_size).enumerate().for_each(|(group, items)| {
                for (local_id, slot) in items.iter_mut().enumerate() {
                    let shift = group * local_size + local_id;
                    let mut sum = 0.0f32;
                    for i in 0..output_len {
                        sum += input[i] * input[i + shift];
                    }
                    *slot = sum;
                }
            });
        });
        let kernel_elapsed = start.elapsed();

        log::debug!(
            "host kernel: {} work groups of {local_size} in {:?}",
            program.work_groups(output_len),
            kernel_elapsed
        );
        Ok(OffloadRun { output, kernel_elapsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autocorr::offload::{autocorrelate, ENTRY_POINT};
    use crate::autocorr::serial;
    use crate::signal::Signal;

    #[test]
    fn test_three_sample_signal() {
        let executor = HostExecutor::new(2).unwrap();
        let signal = Signal::new(&[1.0, 2.0, 3.0]).unwrap();
        let run = autocorrelate(&signal, &executor, &KernelProgram::builtin(2)).unwrap();
        assert_eq!(run.output, vec![14.0, 11.0, 11.0]);
    }

    #[test]
    fn test_matches_serial_for_uneven_work_groups() {
        let executor = HostExecutor::new(3).unwrap();
        let samples: Vec<f32> = (0..513).map(|i| 0.5 + (i % 9) as f32 * 0.125).collect();
        let signal = Signal::new(&samples).unwrap();
        let expected = serial::autocorrelate(&signal);

        for local_size in [1, 7, 32, 1024] {
            let run = autocorrelate(&signal, &executor, &KernelProgram::builtin(local_size)).unwrap();
            assert_eq!(run.output, expected, "local_size = {local_size}");
        }
    }

    #[test]
    fn test_program_without_entry_point_fails_build() {
        let executor = HostExecutor::new(1).unwrap();
        let program = KernelProgram::new("fn something_else() {}", ENTRY_POINT, 4);
        let err = executor.run(&program, &[1.0, 1.0], 1).unwrap_err();
        assert!(matches!(err, Error::Device { stage: DeviceStage::ProgramBuild, .. }));
    }

    #[test]
    fn test_custom_program_runs_builtin_arithmetic() {
        let executor = HostExecutor::new(2).unwrap();
        let program = KernelProgram::new("fn autocorrelate(gid: vec3<u32>) { return; }", ENTRY_POINT, 2);
        assert!(!program.is_builtin());

        let signal = Signal::new(&[1.0, 2.0, 3.0]).unwrap();
        let run = autocorrelate(&signal, &executor, &program).unwrap();
        assert_eq!(run.output, vec![14.0, 11.0, 11.0]);
    }

    #[test]
    fn test_rejects_undoubled_input() {
        let executor = HostExecutor::new(1).unwrap();
        let err = executor.run(&KernelProgram::builtin(4), &[1.0, 2.0, 3.0], 3).unwrap_err();
        assert!(matches!(err, Error::Device { stage: DeviceStage::Buffer, .. }));
    }
}
