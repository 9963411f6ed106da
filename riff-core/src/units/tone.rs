use super::{Params, ProcessingUnit};
use crate::dsp::dynamics::EnvelopeFollower;
use crate::dsp::filter::StateVariableFilter;
use crate::dsp::{db_to_gain, gain_to_db};
use crate::effect::EffectKind;

const LOW_SHELF_HZ: f32 = 250.0;
const HIGH_SHELF_HZ: f32 = 3000.0;
const SHELF_Q: f32 = 0.707;
const MID_Q: f32 = 0.9;

/// Feed-forward peak compressor with hard knee.
pub struct CompressorUnit {
    params: Params,
    sample_rate: f32,
    follower: EnvelopeFollower,
}

impl CompressorUnit {
    pub(crate) fn new(params: Params, sample_rate: f32) -> Self {
        let follower = EnvelopeFollower::new(
            params.value("attack"),
            params.value("release"),
            sample_rate,
        );
        Self { params, sample_rate, follower }
    }

    /// Gain reduction in dB for an envelope level in dB.
    fn gain_reduction_db(&self, level_db: f32) -> f32 {
        let threshold = self.params.value("threshold");
        let ratio = self.params.value("ratio");
        let over = level_db - threshold;
        if over > 0.0 {
            -over * (1.0 - 1.0 / ratio)
        } else {
            0.0
        }
    }
}

impl ProcessingUnit for CompressorUnit {
    fn kind(&self) -> EffectKind {
        EffectKind::Compressor
    }

    fn process(&mut self, block: &mut [f32]) {
        let makeup = self.params.value("makeup");
        for sample in block.iter_mut() {
            let envelope = self.follower.next_sample(*sample);
            let gain_db = self.gain_reduction_db(gain_to_db(envelope)) + makeup;
            *sample *= db_to_gain(gain_db);
        }
    }

    fn set_parameter(&mut self, key: &str, value: f32) -> bool {
        if !self.params.set(key, value) {
            return false;
        }
        if key == "attack" || key == "release" {
            self.follower.set_times(
                self.params.value("attack"),
                self.params.value("release"),
                self.sample_rate,
            );
        }
        true
    }

    fn parameter(&self, key: &str) -> Option<f32> {
        self.params.get(key)
    }

    fn reset(&mut self) {
        self.follower.reset();
    }
}

/// Three-band equalizer: low shelf, peaking mid, high shelf.
///
/// Bands are summed as corrections on top of the dry signal, so 0 dB on every
/// band is an exact passthrough.
pub struct EqualizerUnit {
    params: Params,
    sample_rate: f32,
    low: StateVariableFilter,
    mid: StateVariableFilter,
    high: StateVariableFilter,
}

impl EqualizerUnit {
    pub(crate) fn new(params: Params, sample_rate: f32) -> Self {
        let mid = StateVariableFilter::new(params.value("mid_frequency"), MID_Q, sample_rate);
        Self {
            params,
            sample_rate,
            low: StateVariableFilter::new(LOW_SHELF_HZ, SHELF_Q, sample_rate),
            mid,
            high: StateVariableFilter::new(HIGH_SHELF_HZ, SHELF_Q, sample_rate),
        }
    }
}

impl ProcessingUnit for EqualizerUnit {
    fn kind(&self) -> EffectKind {
        EffectKind::Equalizer
    }

    fn process(&mut self, block: &mut [f32]) {
        let low_gain = db_to_gain(self.params.value("low")) - 1.0;
        let mid_gain = db_to_gain(self.params.value("mid")) - 1.0;
        let high_gain = db_to_gain(self.params.value("high")) - 1.0;
        let mid_k = self.mid.k();

        for sample in block.iter_mut() {
            let x = *sample;
            let low = self.low.next_sample(x).lowpass;
            let mid = self.mid.next_sample(x).bandpass * mid_k;
            let high = self.high.next_sample(x).highpass;
            *sample = x + low_gain * low + mid_gain * mid + high_gain * high;
        }
    }

    fn set_parameter(&mut self, key: &str, value: f32) -> bool {
        if !self.params.set(key, value) {
            return false;
        }
        if key == "mid_frequency" {
            self.mid.set(self.params.value("mid_frequency"), MID_Q, self.sample_rate);
        }
        true
    }

    fn parameter(&self, key: &str) -> Option<f32> {
        self.params.get(key)
    }

    fn reset(&mut self) {
        self.low.reset();
        self.mid.reset();
        self.high.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectNode;
    use std::f32::consts::TAU;

    fn rms(block: &[f32]) -> f32 {
        (block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32).sqrt()
    }

    fn sine(freq: f32, amplitude: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (TAU * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn compressor_reduces_loud_signals_more_than_quiet_ones() {
        let node = EffectNode::new(EffectKind::Compressor)
            .with_parameter("threshold", -30.0)
            .with_parameter("ratio", 10.0)
            .with_parameter("makeup", 0.0);

        let mut loud_unit = CompressorUnit::new(Params::from_node(&node), 48_000.0);
        let mut quiet_unit = CompressorUnit::new(Params::from_node(&node), 48_000.0);

        let mut loud = sine(220.0, 0.9, 48_000.0, 9600);
        let mut quiet = sine(220.0, 0.01, 48_000.0, 9600);
        let loud_in = rms(&loud);
        let quiet_in = rms(&quiet);
        loud_unit.process(&mut loud);
        quiet_unit.process(&mut quiet);

        assert!(rms(&loud[4800..]) < loud_in * 0.3);
        assert!((rms(&quiet[4800..]) - quiet_in).abs() < quiet_in * 0.05);
    }

    #[test]
    fn flat_equalizer_is_transparent() {
        let node = EffectNode::new(EffectKind::Equalizer);
        let mut unit = EqualizerUnit::new(Params::from_node(&node), 48_000.0);
        let original = sine(1000.0, 0.5, 48_000.0, 512);
        let mut block = original.clone();
        unit.process(&mut block);
        for (a, b) in block.iter().zip(&original) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn low_boost_raises_bass() {
        let node = EffectNode::new(EffectKind::Equalizer).with_parameter("low", 12.0);
        let mut unit = EqualizerUnit::new(Params::from_node(&node), 48_000.0);
        let mut block = sine(80.0, 0.25, 48_000.0, 9600);
        let before = rms(&block[4800..]);
        unit.process(&mut block);
        assert!(rms(&block[4800..]) > before * 2.0);
    }
}
