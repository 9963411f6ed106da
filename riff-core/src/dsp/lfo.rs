//! Sine LFO for modulated effects (chorus, flanger, phaser, tremolo).
//!
//! Free-running: the phase is never reset by the chain, so toggling an effect
//! back on continues the sweep where it was instead of restarting it.

use std::f32::consts::TAU;

pub struct Lfo {
    phase: f32,
    increment: f32,
    sample_rate: f32,
}

impl Lfo {
    pub fn new(rate_hz: f32, sample_rate: f32) -> Self {
        let mut lfo = Self {
            phase: 0.0,
            increment: 0.0,
            sample_rate,
        };
        lfo.set_rate(rate_hz);
        lfo
    }

    /// Starts the sweep at a phase offset in radians.
    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase.rem_euclid(TAU);
        self
    }

    pub fn set_rate(&mut self, rate_hz: f32) {
        self.increment = TAU * rate_hz.max(0.0) / self.sample_rate;
    }

    /// Bipolar output in -1.0..=1.0.
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        let value = self.phase.sin();
        self.phase += self.increment;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        value
    }

    /// Unipolar output in 0.0..=1.0.
    #[inline]
    pub fn next_unipolar(&mut self) -> f32 {
        (self.next_value() + 1.0) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_one_cycle_per_period() {
        let mut lfo = Lfo::new(1.0, 1000.0);
        let values: Vec<f32> = (0..1000).map(|_| lfo.next_value()).collect();
        let max = values.iter().cloned().fold(f32::MIN, f32::max);
        let min = values.iter().cloned().fold(f32::MAX, f32::min);
        assert!(max > 0.99 && min < -0.99);
        assert!(lfo.next_value().abs() < 0.01);
    }

    #[test]
    fn unipolar_stays_in_range() {
        let mut lfo = Lfo::new(7.0, 48_000.0);
        for _ in 0..10_000 {
            let v = lfo.next_unipolar();
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
