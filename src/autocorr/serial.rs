//! Reference single-threaded strategy.

use crate::signal::Signal;

/// Dot product of the signal with its shift-by-`shift` window.
///
/// Accumulates into a private scalar and is shared by every CPU strategy
/// that needs the plain summation order.
#[must_use]
#[inline]
#[allow(clippy::needless_range_loop)]
pub fn shift_sum(signal: &Signal, shift: usize) -> f32 {
    let base = signal.samples();
    let window = signal.shifted(shift);
    let mut sum = 0.0f32;
    for i in 0..base.len() {
        sum += base[i] * window[i];
    }
    sum
}

/// Computes every shift on the calling thread.
#[must_use]
pub fn autocorrelate(signal: &Signal) -> Vec<f32> {
    (0..signal.len()).map(|shift| shift_sum(signal, shift)).collect()
}
