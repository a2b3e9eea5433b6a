//! Thread-parallel strategy.
//!
//! Shifts are split across the pool; every worker writes only the output
//! slots it owns, so the sums vector needs no locking.

use rayon::prelude::*;
use rayon::ThreadPool;

use super::serial::shift_sum;
use crate::signal::Signal;

/// Computes every shift on `pool`.
///
/// Uses the same per-shift summation order as the serial strategy, so the
/// result is identical for any pool size.
#[must_use]
pub fn autocorrelate(signal: &Signal, pool: &ThreadPool) -> Vec<f32> {
    let mut sums = vec![0.0f32; signal.len()];
    pool.install(|| {
        sums.par_iter_mut()
            .enumerate()
            .for_each(|(shift, slot)| *slot = shift_sum(signal, shift));
    });
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autocorr::serial;
    use rayon::ThreadPoolBuilder;

    #[test]
    fn test_matches_serial_for_several_pool_sizes() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin() + 1.5).collect();
        let signal = Signal::new(&samples).unwrap();
        let expected = serial::autocorrelate(&signal);

        for threads in [1, 2, 4, 7] {
            let pool = ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
            assert_eq!(autocorrelate(&signal, &pool), expected, "threads = {threads}");
        }
    }
}
