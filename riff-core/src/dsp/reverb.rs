//! Reverb via delay networks
//!
//! Classic Schroeder layout:
//!
//! ```text
//! Input ──┬──→ [Comb 1] ──┐
//!         ├──→ [Comb 2] ──┤
//!         ├──→ [Comb 3] ──┼──→ (+) ──→ [Allpass 1] ──→ [Allpass 2] ──→ Output
//!         └──→ [Comb 4] ──┘
//! ```
//!
//! Comb delays are mutually prime so the echoes do not pile up on one
//! frequency; the allpasses add density without colouring the tone. Room size
//! scales comb feedback, damping sets the one-pole lowpass inside each comb.

const COMB_DELAYS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
const ALLPASS_DELAYS_MS: [f32; 2] = [5.0, 1.7];

fn delay_len(ms: f32, sample_rate: f32) -> usize {
    ((ms * sample_rate / 1000.0) as usize).max(1)
}

pub struct CombFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            feedback: 0.5,
            damp: 0.5,
            filter_state: 0.0,
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];
        self.filter_state = output * (1.0 - self.damp) + self.filter_state * self.damp;
        self.buffer[self.write_pos] = input + self.filter_state * self.feedback;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

pub struct AllpassFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            write_pos: 0,
            feedback: 0.5,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        let output = -self.feedback * input + delayed;
        self.buffer[self.write_pos] = input + self.feedback * output;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

pub struct SchroederReverb {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl SchroederReverb {
    pub fn new(sample_rate: f32) -> Self {
        let combs = COMB_DELAYS_MS
            .iter()
            .map(|&ms| CombFilter::new(delay_len(ms, sample_rate)))
            .collect();
        let allpasses = ALLPASS_DELAYS_MS
            .iter()
            .map(|&ms| AllpassFilter::new(delay_len(ms, sample_rate)))
            .collect();
        Self { combs, allpasses }
    }

    /// Room size 0..1 maps to comb feedback 0.7..0.98.
    pub fn set_room_size(&mut self, size: f32) {
        let feedback = 0.7 + size.clamp(0.0, 1.0) * 0.28;
        for comb in &mut self.combs {
            comb.set_feedback(feedback);
        }
    }

    pub fn set_damping(&mut self, damp: f32) {
        for comb in &mut self.combs {
            comb.set_damp(damp);
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input);
        }
        output /= self.combs.len() as f32;

        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }
        output
    }

    pub fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.reset();
        }
        for allpass in &mut self.allpasses {
            allpass.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comb_filter_echoes_after_its_delay() {
        let mut comb = CombFilter::new(10);
        comb.set_feedback(0.5);
        comb.set_damp(0.0);

        assert!(comb.process(1.0).abs() < 0.01);
        for _ in 0..9 {
            comb.process(0.0);
        }
        assert!(comb.process(0.0).abs() > 0.4);
    }

    #[test]
    fn impulse_leaves_a_tail() {
        let mut reverb = SchroederReverb::new(48_000.0);
        reverb.set_room_size(0.5);
        reverb.set_damping(0.5);
        let _ = reverb.process(1.0);

        let has_tail = (0..5000).any(|_| reverb.process(0.0).abs() > 0.001);
        assert!(has_tail, "reverb should ring after an impulse");
    }

    #[test]
    fn stays_stable_at_maximum_room_size() {
        let mut reverb = SchroederReverb::new(48_000.0);
        reverb.set_room_size(1.0);
        for _ in 0..10_000 {
            let out = reverb.process(0.1);
            assert!(out.is_finite() && out.abs() < 10.0, "unstable output {out}");
        }
    }
}
