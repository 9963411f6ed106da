//! # Fast Fourier Transform (FFT) Module
//!
//! Frequency-domain autocorrelation for pitch detection. The signal is
//! zero-padded so the circular correlation the FFT computes equals the linear
//! one for every lag the detector asks for.
//!
//! ## Features
//! - High-performance FFT using RustFFT
//! - Plan caching across frames of the same size
//! - Output matches the direct time-domain sum up to rounding

use rustfft::{FftPlanner, num_complex::Complex};

/// Reusable autocorrelation engine.
pub struct FftAutocorrelator {
    planner: FftPlanner<f32>,
    buffer: Vec<Complex<f32>>,
}

impl Default for FftAutocorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FftAutocorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftAutocorrelator").finish_non_exhaustive()
    }
}

impl FftAutocorrelator {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            buffer: Vec::new(),
        }
    }

    /// Computes `r[lag] = Σ x[i]·x[i+lag]` for `lag` in `0..=max_lag`.
    ///
    /// # Arguments
    /// * `signal` - Input frame
    /// * `max_lag` - Largest lag needed; clamped to `signal.len() - 1`
    ///
    /// # Returns
    /// * `Vec<f32>` - Autocorrelation values indexed by lag (empty for an empty signal)
    pub fn autocorrelate(&mut self, signal: &[f32], max_lag: usize) -> Vec<f32> {
        if signal.is_empty() {
            return Vec::new();
        }
        let max_lag = max_lag.min(signal.len() - 1);
        let size = (signal.len() + max_lag + 1).next_power_of_two();

        self.buffer.clear();
        self.buffer
            .extend(signal.iter().map(|&sample| Complex { re: sample, im: 0.0 }));
        self.buffer.resize(size, Complex { re: 0.0, im: 0.0 });

        let forward = self.planner.plan_fft_forward(size);
        forward.process(&mut self.buffer);

        // power spectrum
        for bin in self.buffer.iter_mut() {
            *bin = Complex {
                re: bin.norm_sqr(),
                im: 0.0,
            };
        }

        let inverse = self.planner.plan_fft_inverse(size);
        inverse.process(&mut self.buffer);

        let scale = 1.0 / size as f32;
        self.buffer
            .iter()
            .take(max_lag + 1)
            .map(|c| c.re * scale)
            .collect()
    }
}

/// Time-domain autocorrelation, same contract as [`FftAutocorrelator::autocorrelate`].
pub fn autocorrelate_direct(signal: &[f32], max_lag: usize) -> Vec<f32> {
    if signal.is_empty() {
        return Vec::new();
    }
    let max_lag = max_lag.min(signal.len() - 1);
    (0..=max_lag)
        .map(|lag| {
            signal[..signal.len() - lag]
                .iter()
                .zip(&signal[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}
