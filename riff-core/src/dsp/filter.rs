use std::f32::consts::{PI, TAU};

/*
| output    | passes          | rejects      |
| --------- | --------------- | ------------ |
| low-pass  | below cutoff    | above cutoff |
| band-pass | around cutoff   | far away     |
| high-pass | above cutoff    | below cutoff |

All three come out of the same topology-preserving state-variable core, so a
three-band equalizer can split the signal with two filters and no phase mess
between bands beyond what the SVF itself introduces.
*/

pub struct FilterOutputs {
    pub lowpass: f32,
    pub bandpass: f32,
    pub highpass: f32,
}

/// Trapezoidal-integrated state-variable filter.
pub struct StateVariableFilter {
    ic1eq: f32,
    ic2eq: f32,
    g: f32,
    k: f32,
}

impl StateVariableFilter {
    pub fn new(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 1.0,
        };
        filter.set(cutoff_hz, q, sample_rate);
        filter
    }

    /// Retunes the filter without clearing its state.
    pub fn set(&mut self, cutoff_hz: f32, q: f32, sample_rate: f32) {
        let nyquist_guard = sample_rate * 0.49;
        let cutoff = cutoff_hz.clamp(10.0, nyquist_guard);
        self.g = (PI * cutoff / sample_rate).tan();
        self.k = 1.0 / q.max(0.05);
    }

    /// Damping factor; `k * bandpass` has unity gain at the cutoff.
    pub fn k(&self) -> f32 {
        self.k
    }

    pub fn next_sample(&mut self, sample: f32) -> FilterOutputs {
        let h = 1.0 / (1.0 + self.g * (self.g + self.k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + self.g * v3);
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            bandpass: v1,
            highpass: sample - self.k * v1 - v2,
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

/// One-pole lowpass, used for tone controls and damping.
pub struct OnePole {
    coeff: f32,
    state: f32,
}

impl OnePole {
    pub fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self { coeff: 0.0, state: 0.0 };
        filter.set_cutoff(cutoff_hz, sample_rate);
        filter
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32, sample_rate: f32) {
        let cutoff = cutoff_hz.clamp(10.0, sample_rate * 0.49);
        self.coeff = 1.0 - (-TAU * cutoff / sample_rate).exp();
    }

    #[inline]
    pub fn next_sample(&mut self, sample: f32) -> f32 {
        self.state += self.coeff * (sample - self.state);
        self.state
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

/// First-order allpass section with a movable break frequency (phaser stage).
pub struct FirstOrderAllpass {
    a: f32,
    x1: f32,
    y1: f32,
}

impl FirstOrderAllpass {
    pub fn new() -> Self {
        Self { a: 0.0, x1: 0.0, y1: 0.0 }
    }

    pub fn set_break(&mut self, freq_hz: f32, sample_rate: f32) {
        let t = (PI * freq_hz.clamp(20.0, sample_rate * 0.45) / sample_rate).tan();
        self.a = (t - 1.0) / (t + 1.0);
    }

    #[inline]
    pub fn next_sample(&mut self, sample: f32) -> f32 {
        let out = self.a * sample + self.x1 - self.a * self.y1;
        self.x1 = sample;
        self.y1 = out;
        out
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}

impl Default for FirstOrderAllpass {
    fn default() -> Self {
        Self::new()
    }
}
