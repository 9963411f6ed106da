use super::{Params, ProcessingUnit};
use crate::dsp::delay_line::DelayLine;
use crate::dsp::filter::FirstOrderAllpass;
use crate::dsp::lfo::Lfo;
use crate::dsp::{blend, ms_to_samples};
use crate::effect::EffectKind;

const CHORUS_BASE_DELAY_MS: f32 = 20.0;
const CHORUS_MAX_DELAY_MS: f32 = 40.0;
const FLANGER_BASE_DELAY_MS: f32 = 1.0;
const FLANGER_MAX_DELAY_MS: f32 = 10.0;
const PHASER_STAGES: usize = 4;
const PHASER_MIN_HZ: f32 = 200.0;
const PHASER_SPAN_HZ: f32 = 1800.0;

/// Chorus: dry signal mixed with a copy whose delay wobbles around 20 ms.
pub struct ChorusUnit {
    params: Params,
    sample_rate: f32,
    delay: DelayLine,
    lfo: Lfo,
}

impl ChorusUnit {
    pub(crate) fn new(params: Params, sample_rate: f32) -> Self {
        let lfo = Lfo::new(params.value("rate"), sample_rate);
        Self {
            params,
            sample_rate,
            delay: DelayLine::with_max_time(CHORUS_MAX_DELAY_MS, sample_rate),
            lfo,
        }
    }
}

impl ProcessingUnit for ChorusUnit {
    fn kind(&self) -> EffectKind {
        EffectKind::Chorus
    }

    fn process(&mut self, block: &mut [f32]) {
        let depth_ms = self.params.value("depth");
        let mix = self.params.value("mix");
        for sample in block.iter_mut() {
            let delay_ms = CHORUS_BASE_DELAY_MS + self.lfo.next_value() * depth_ms;
            let wet = self
                .delay
                .read_interpolated(ms_to_samples(delay_ms, self.sample_rate));
            self.delay.write(*sample);
            *sample = blend(*sample, wet, mix);
        }
    }

    fn set_parameter(&mut self, key: &str, value: f32) -> bool {
        if !self.params.set(key, value) {
            return false;
        }
        if key == "rate" {
            self.lfo.set_rate(self.params.value("rate"));
        }
        true
    }

    fn parameter(&self, key: &str) -> Option<f32> {
        self.params.get(key)
    }

    fn reset(&mut self) {
        self.delay.reset();
    }
}

/// Phaser: four allpass stages whose break frequency sweeps with an LFO.
pub struct PhaserUnit {
    params: Params,
    sample_rate: f32,
    stages: [FirstOrderAllpass; PHASER_STAGES],
    lfo: Lfo,
    last_output: f32,
}

impl PhaserUnit {
    pub(crate) fn new(params: Params, sample_rate: f32) -> Self {
        let lfo = Lfo::new(params.value("rate"), sample_rate);
        Self {
            params,
            sample_rate,
            stages: Default::default(),
            lfo,
            last_output: 0.0,
        }
    }
}

impl ProcessingUnit for PhaserUnit {
    fn kind(&self) -> EffectKind {
        EffectKind::Phaser
    }

    fn process(&mut self, block: &mut [f32]) {
        let depth = self.params.value("depth");
        let feedback = self.params.value("feedback");
        let mix = self.params.value("mix");

        for sample in block.iter_mut() {
            let sweep = PHASER_MIN_HZ + self.lfo.next_unipolar() * depth * PHASER_SPAN_HZ;
            let mut wet = *sample + self.last_output * feedback;
            for stage in self.stages.iter_mut() {
                stage.set_break(sweep, self.sample_rate);
                wet = stage.next_sample(wet);
            }
            self.last_output = wet;
            *sample = blend(*sample, wet, mix);
        }
    }

    fn set_parameter(&mut self, key: &str, value: f32) -> bool {
        if !self.params.set(key, value) {
            return false;
        }
        if key == "rate" {
            self.lfo.set_rate(self.params.value("rate"));
        }
        true
    }

    fn parameter(&self, key: &str) -> Option<f32> {
        self.params.get(key)
    }

    fn reset(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.reset();
        }
        self.last_output = 0.0;
    }
}

/// Flanger: very short modulated delay with feedback.
pub struct FlangerUnit {
    params: Params,
    sample_rate: f32,
    delay: DelayLine,
    lfo: Lfo,
}

impl FlangerUnit {
    pub(crate) fn new(params: Params, sample_rate: f32) -> Self {
        let lfo = Lfo::new(params.value("rate"), sample_rate);
        Self {
            params,
            sample_rate,
            delay: DelayLine::with_max_time(FLANGER_MAX_DELAY_MS, sample_rate),
            lfo,
        }
    }
}

impl ProcessingUnit for FlangerUnit {
    fn kind(&self) -> EffectKind {
        EffectKind::Flanger
    }

    fn process(&mut self, block: &mut [f32]) {
        let depth_ms = self.params.value("depth");
        let feedback = self.params.value("feedback");
        let mix = self.params.value("mix");

        for sample in block.iter_mut() {
            let delay_ms = FLANGER_BASE_DELAY_MS + self.lfo.next_unipolar() * depth_ms;
            let wet = self
                .delay
                .read_interpolated(ms_to_samples(delay_ms, self.sample_rate));
            self.delay.write(*sample + wet * feedback);
            *sample = blend(*sample, wet, mix);
        }
    }

    fn set_parameter(&mut self, key: &str, value: f32) -> bool {
        if !self.params.set(key, value) {
            return false;
        }
        if key == "rate" {
            self.lfo.set_rate(self.params.value("rate"));
        }
        true
    }

    fn parameter(&self, key: &str) -> Option<f32> {
        self.params.get(key)
    }

    fn reset(&mut self) {
        self.delay.reset();
    }
}

/// Tremolo: amplitude modulation, gain dips to `1 - depth`.
pub struct TremoloUnit {
    params: Params,
    lfo: Lfo,
}

impl TremoloUnit {
    pub(crate) fn new(params: Params, sample_rate: f32) -> Self {
        let lfo = Lfo::new(params.value("rate"), sample_rate);
        Self { params, lfo }
    }
}

impl ProcessingUnit for TremoloUnit {
    fn kind(&self) -> EffectKind {
        EffectKind::Tremolo
    }

    fn process(&mut self, block: &mut [f32]) {
        let depth = self.params.value("depth");
        for sample in block.iter_mut() {
            *sample *= 1.0 - depth * self.lfo.next_unipolar();
        }
    }

    fn set_parameter(&mut self, key: &str, value: f32) -> bool {
        if !self.params.set(key, value) {
            return false;
        }
        if key == "rate" {
            self.lfo.set_rate(self.params.value("rate"));
        }
        true
    }

    fn parameter(&self, key: &str) -> Option<f32> {
        self.params.get(key)
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectNode;

    #[test]
    fn tremolo_gain_dips_to_one_minus_depth() {
        let node = EffectNode::new(EffectKind::Tremolo)
            .with_parameter("depth", 0.5)
            .with_parameter("rate", 10.0);
        let mut unit = TremoloUnit::new(Params::from_node(&node), 48_000.0);
        let mut block = vec![1.0; 48_000];
        unit.process(&mut block);
        let min = block.iter().cloned().fold(f32::MAX, f32::min);
        let max = block.iter().cloned().fold(f32::MIN, f32::max);
        assert!((min - 0.5).abs() < 0.01, "min {min}");
        assert!((max - 1.0).abs() < 0.01, "max {max}");
    }

    #[test]
    fn flanger_feedback_stays_bounded() {
        let node = EffectNode::new(EffectKind::Flanger).with_parameter("feedback", 0.95);
        let mut unit = FlangerUnit::new(Params::from_node(&node), 48_000.0);
        let mut block: Vec<f32> = (0..48_000).map(|i| ((i as f32) * 0.03).sin() * 0.5).collect();
        unit.process(&mut block);
        assert!(block.iter().all(|s| s.is_finite() && s.abs() < 12.0));
    }

    #[test]
    fn chorus_rate_change_is_applied() {
        let node = EffectNode::new(EffectKind::Chorus);
        let mut unit = ChorusUnit::new(Params::from_node(&node), 48_000.0);
        assert!(unit.set_parameter("rate", 3.0));
        assert_eq!(unit.parameter("rate"), Some(3.0));
    }
}
