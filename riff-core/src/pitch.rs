//! # Pitch Detection Module
//!
//! Fundamental-frequency estimation by autocorrelation peak picking.
//!
//! For every candidate lag between the periods of the highest and lowest
//! frequency of interest, the raw sum `Σ x[i]·x[i+lag]` is computed and the
//! lag with the largest sum wins. There is no windowing, no interpolation and
//! no silence gate: the caller decides what to do with estimates that fall
//! outside the range, and a silent frame simply reports zero confidence.
//!
//! ## Features
//! - Configurable frequency range (60–1400 Hz by default, guitar territory)
//! - Time-domain or FFT-backed autocorrelation with identical results
//! - Normalized confidence score from the zero-lag energy

use crate::fft::{FftAutocorrelator, autocorrelate_direct};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_FREQUENCY: f32 = 60.0;
pub const DEFAULT_MAX_FREQUENCY: f32 = 1400.0;

/// Frequency band the detector searches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchRange {
    pub min_frequency: f32,
    pub max_frequency: f32,
}

impl Default for PitchRange {
    fn default() -> Self {
        Self {
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_frequency: DEFAULT_MAX_FREQUENCY,
        }
    }
}

impl PitchRange {
    pub fn new(min_frequency: f32, max_frequency: f32) -> Self {
        Self {
            min_frequency,
            max_frequency,
        }
    }

    pub fn with_min_frequency(mut self, hz: f32) -> Self {
        self.min_frequency = hz;
        self
    }

    pub fn with_max_frequency(mut self, hz: f32) -> Self {
        self.max_frequency = hz;
        self
    }

    pub fn contains(&self, frequency: f32) -> bool {
        frequency >= self.min_frequency && frequency <= self.max_frequency
    }

    /// Lag search bounds `[min_lag, max_lag)` for a frame of `frame_len` samples.
    ///
    /// Returns `None` when the frame cannot hold the longest period or the
    /// sample rate is too low to resolve the highest frequency.
    pub fn lag_bounds(&self, sample_rate: u32, frame_len: usize) -> Option<(usize, usize)> {
        if sample_rate == 0 || self.min_frequency <= 0.0 || self.max_frequency <= 0.0 {
            return None;
        }
        let sr = sample_rate as f32;
        let min_lag = (sr / self.max_frequency).floor() as usize;
        let max_lag = (sr / self.min_frequency).floor() as usize;
        if min_lag == 0 || max_lag >= frame_len || min_lag >= max_lag {
            return None;
        }
        Some((min_lag, max_lag))
    }
}

/// How the autocorrelation is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchMethod {
    /// Time-domain sums.
    #[default]
    Direct,
    /// Zero-padded power-spectrum autocorrelation via rustfft.
    Fft,
}

/// A single frame's fundamental-frequency estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    pub frequency: f32,
    /// Peak autocorrelation over zero-lag energy, in `0..=1`.
    pub confidence: f32,
    pub lag: usize,
}

/// Autocorrelation pitch detector.
#[derive(Debug, Default)]
pub struct PitchDetector {
    range: PitchRange,
    method: PitchMethod,
    fft: FftAutocorrelator,
}

impl PitchDetector {
    pub fn new(range: PitchRange, method: PitchMethod) -> Self {
        Self {
            range,
            method,
            fft: FftAutocorrelator::new(),
        }
    }

    pub fn range(&self) -> PitchRange {
        self.range
    }

    pub fn method(&self) -> PitchMethod {
        self.method
    }

    /// Estimates the fundamental frequency of `signal`.
    ///
    /// # Arguments
    /// * `signal` - Mono audio frame
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// * `Some(estimate)` - Best lag converted to Hz; may lie outside the range
    /// * `None` - The frame is too short for the range, the rate too low, or
    ///   no lag correlates positively (silence)
    pub fn detect(&mut self, signal: &[f32], sample_rate: u32) -> Option<PitchEstimate> {
        let (min_lag, max_lag) = self.range.lag_bounds(sample_rate, signal.len())?;

        let correlation = match self.method {
            PitchMethod::Direct => autocorrelate_direct(signal, max_lag),
            PitchMethod::Fft => self.fft.autocorrelate(signal, max_lag),
        };

        let mut best_lag = min_lag;
        let mut best_value = f32::NEG_INFINITY;
        for (lag, &value) in correlation.iter().enumerate().take(max_lag).skip(min_lag) {
            if value > best_value {
                best_value = value;
                best_lag = lag;
            }
        }

        if best_value <= 0.0 {
            return None;
        }
        let energy = correlation[0];
        let confidence = if energy > 0.0 {
            (best_value / energy).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Some(PitchEstimate {
            frequency: sample_rate as f32 / best_lag as f32,
            confidence,
            lag: best_lag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn lag_bounds_follow_the_range() {
        let range = PitchRange::default();
        assert_eq!(range.lag_bounds(44_100, 2048), Some((31, 735)));
        assert_eq!(range.lag_bounds(44_100, 735), None);
        assert_eq!(range.lag_bounds(1000, 2048), None);
        assert_eq!(range.lag_bounds(0, 2048), None);
    }

    #[test]
    fn detects_concert_a() {
        let mut detector = PitchDetector::default();
        let estimate = detector.detect(&sine(440.0, 44_100, 2048), 44_100).unwrap();
        assert!((estimate.frequency - 440.0).abs() <= 440.0 * 440.0 / 44_100.0);
        assert!(estimate.confidence > 0.5);
    }

    #[test]
    fn silence_yields_no_estimate() {
        for method in [PitchMethod::Direct, PitchMethod::Fft] {
            let mut detector = PitchDetector::new(PitchRange::default(), method);
            for sample_rate in [44_100, 48_000, 88_200, 176_400] {
                let len = 2048.max(sample_rate as usize / 50);
                assert_eq!(detector.detect(&vec![0.0; len], sample_rate), None);
            }
        }
    }

    #[test]
    fn fft_method_agrees_with_direct() {
        let signal = sine(196.0, 48_000, 2048);
        let direct = PitchDetector::new(PitchRange::default(), PitchMethod::Direct)
            .detect(&signal, 48_000)
            .unwrap();
        let fast = PitchDetector::new(PitchRange::default(), PitchMethod::Fft)
            .detect(&signal, 48_000)
            .unwrap();
        assert_eq!(direct.lag, fast.lag);
    }
}
