//! Test-signal synthesis: a short guitar-ish riff rendered as decaying sines.

use riff_core::tuning::{PitchClass, note_frequency};
use std::f32::consts::PI;

/// One strum: the notes sounding together and how long they ring.
#[derive(Debug, Clone)]
pub struct Step {
    pub notes: Vec<(PitchClass, i32)>,
    pub millis: u32,
}

impl Step {
    fn new(notes: &[(PitchClass, i32)], millis: u32) -> Self {
        Self {
            notes: notes.to_vec(),
            millis,
        }
    }
}

/// A short lick, then an E major and an A minor arpeggio. Nothing sits below
/// G3 so 2048-sample frames resolve each period.
pub fn default_riff() -> Vec<Step> {
    use PitchClass::*;
    vec![
        Step::new(&[(G, 3)], 400),
        Step::new(&[(A, 3)], 400),
        Step::new(&[(D, 4)], 600),
        Step::new(&[(E, 4)], 250),
        Step::new(&[(GSharp, 4)], 250),
        Step::new(&[(B, 4)], 500),
        Step::new(&[(A, 4)], 250),
        Step::new(&[(C, 5)], 250),
        Step::new(&[(E, 5)], 500),
        Step::new(&[], 700),
    ]
}

/// Renders `riff` at `sample_rate`, mono.
pub fn render(riff: &[Step], sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let mut out = Vec::new();
    for step in riff {
        let len = (step.millis as f32 * sr / 1000.0) as usize;
        let frequencies: Vec<f32> = step
            .notes
            .iter()
            .map(|&(class, octave)| note_frequency(class, octave))
            .collect();
        let gain = if frequencies.is_empty() {
            0.0
        } else {
            0.6 / frequencies.len() as f32
        };
        for i in 0..len {
            let t = i as f32 / sr;
            let envelope = (-3.0 * t).exp();
            let sample: f32 = frequencies
                .iter()
                .map(|f| (2.0 * PI * f * t).sin() + 0.3 * (4.0 * PI * f * t).sin())
                .sum();
            out.push(sample * gain * envelope);
        }
    }
    out
}
