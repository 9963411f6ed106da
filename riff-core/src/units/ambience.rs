use super::{Params, ProcessingUnit};
use crate::dsp::delay_line::DelayLine;
use crate::dsp::reverb::SchroederReverb;
use crate::dsp::{blend, ms_to_samples};
use crate::effect::EffectKind;

/// Upper bound of the `time` parameter plus headroom.
const MAX_DELAY_MS: f32 = 2100.0;

/// Feedback echo.
pub struct DelayUnit {
    params: Params,
    sample_rate: f32,
    line: DelayLine,
}

impl DelayUnit {
    pub(crate) fn new(params: Params, sample_rate: f32) -> Self {
        Self {
            params,
            sample_rate,
            line: DelayLine::with_max_time(MAX_DELAY_MS, sample_rate),
        }
    }
}

impl ProcessingUnit for DelayUnit {
    fn kind(&self) -> EffectKind {
        EffectKind::Delay
    }

    fn process(&mut self, block: &mut [f32]) {
        let delay_samples = ms_to_samples(self.params.value("time"), self.sample_rate) as usize;
        let feedback = self.params.value("feedback");
        let mix = self.params.value("mix");

        for sample in block.iter_mut() {
            let echo = self.line.read(delay_samples);
            self.line.write(*sample + echo * feedback);
            *sample = blend(*sample, echo, mix);
        }
    }

    fn set_parameter(&mut self, key: &str, value: f32) -> bool {
        self.params.set(key, value)
    }

    fn parameter(&self, key: &str) -> Option<f32> {
        self.params.get(key)
    }

    fn reset(&mut self) {
        self.line.reset();
    }
}

pub struct ReverbUnit {
    params: Params,
    reverb: SchroederReverb,
}

impl ReverbUnit {
    pub(crate) fn new(params: Params, sample_rate: f32) -> Self {
        let mut reverb = SchroederReverb::new(sample_rate);
        reverb.set_room_size(params.value("room_size"));
        reverb.set_damping(params.value("damping"));
        Self { params, reverb }
    }
}

impl ProcessingUnit for ReverbUnit {
    fn kind(&self) -> EffectKind {
        EffectKind::Reverb
    }

    fn process(&mut self, block: &mut [f32]) {
        let mix = self.params.value("mix");
        for sample in block.iter_mut() {
            let wet = self.reverb.process(*sample);
            *sample = blend(*sample, wet, mix);
        }
    }

    fn set_parameter(&mut self, key: &str, value: f32) -> bool {
        if !self.params.set(key, value) {
            return false;
        }
        match key {
            "room_size" => self.reverb.set_room_size(self.params.value("room_size")),
            "damping" => self.reverb.set_damping(self.params.value("damping")),
            _ => {}
        }
        true
    }

    fn parameter(&self, key: &str) -> Option<f32> {
        self.params.get(key)
    }

    fn reset(&mut self) {
        self.reverb.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectNode;

    #[test]
    fn echo_arrives_after_configured_time() {
        let node = EffectNode::new(EffectKind::Delay)
            .with_parameter("time", 100.0)
            .with_parameter("mix", 1.0)
            .with_parameter("feedback", 0.0);
        let mut unit = DelayUnit::new(Params::from_node(&node), 48_000.0);

        let mut block = vec![0.0; 9600];
        block[0] = 1.0;
        unit.process(&mut block);

        let echo_at = block.iter().position(|s| s.abs() > 0.5);
        assert_eq!(echo_at, Some(4800));
    }
}
