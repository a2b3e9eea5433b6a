//! Signal buffers and the `signal.txt` reader.
//!
//! A file holds the sample count followed by that many whitespace-separated
//! floats. The buffer is stored doubled (`x ‖ x`) so every shift in
//! `[0, len)` can be read as one contiguous window.

use std::io;
use std::path::Path;

use crate::error::{Error, Result};

const MAX_PREALLOCATED_SAMPLES: usize = 1 << 20;

/// An immutable, doubled signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    doubled: Vec<f32>,
    len: usize,
}

impl Signal {
    /// Builds a signal from its samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty or non-finite signal.
    pub fn new(samples: &[f32]) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::invalid_input("signal must contain at least one sample"));
        }
        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(Error::invalid_input(format!("sample {pos} is not finite")));
        }
        let len = samples.len();
        let mut doubled = Vec::with_capacity(2 * len);
        doubled.extend_from_slice(samples);
        doubled.extend_from_slice(samples);
        Ok(Self { doubled, len })
    }

    /// Parses the `signal.txt` format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the length header is not a
    /// positive integer, a sample is not numeric, or the number of samples
    /// differs from the header.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();

        let header = tokens.next().ok_or_else(|| Error::invalid_input("empty signal file"))?;
        let declared: usize = header.parse().map_err(|_| {
            Error::invalid_input(format!("length header '{header}' is not a non-negative integer"))
        })?;
        if declared == 0 {
            return Err(Error::invalid_input("signal length must be positive"));
        }

        // The header is untrusted until the samples are counted.
        let mut samples = Vec::with_capacity(declared.min(MAX_PREALLOCATED_SAMPLES));
        for token in tokens.by_ref().take(declared) {
            let value: f32 = token.parse().map_err(|_| {
                Error::invalid_input(format!("sample {} ('{token}') is not a number", samples.len()))
            })?;
            samples.push(value);
        }

        if samples.len() < declared {
            return Err(Error::invalid_input(format!(
                "expected {declared} samples, found {}",
                samples.len()
            )));
        }
        let extra = tokens.count();
        if extra > 0 {
            return Err(Error::invalid_input(format!(
                "expected {declared} samples, found {} extra trailing tokens",
                extra
            )));
        }

        Self::new(&samples)
    }

    /// Reads and parses a signal file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingResource`] if the file cannot be opened,
    /// [`Error::InvalidInput`] if it is not UTF-8 text, or any error from
    /// [`Signal::parse`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => {
                Error::invalid_input(format!("{} is not valid UTF-8 text", path.display()))
            }
            _ => Error::MissingResource { path: path.to_path_buf() },
        })?;
        let signal = Self::parse(&text)?;
        log::debug!("loaded {} samples from {}", signal.len(), path.display());
        Ok(signal)
    }

    /// Number of samples S.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; an empty signal cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The original S samples.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.doubled[..self.len]
    }

    /// The doubled 2S buffer.
    #[must_use]
    pub fn doubled(&self) -> &[f32] {
        &self.doubled
    }

    /// The S-sample window starting at `shift`.
    ///
    /// # Panics
    ///
    /// Panics if `shift > len`.
    #[must_use]
    #[inline]
    pub fn shifted(&self, shift: usize) -> &[f32] {
        &self.doubled[shift..shift + self.len]
    }

    /// Σ x², the zero-shift autocorrelation.
    #[must_use]
    pub fn energy(&self) -> f32 {
        self.samples().iter().map(|x| x * x).sum()
    }
}
