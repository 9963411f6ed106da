/*
Drive stages
============

Overdrive, distortion and fuzz share one unit and differ only in the
transfer function:

  Overdrive   soft clip, then a tone lowpass (800 Hz .. 8 kHz)
  Distortion  hard clip at `threshold`
  Fuzz        foldback at `threshold`

The wet path is scaled by `level` and blended with the dry input by `mix`.
*/

use super::{Params, ProcessingUnit};
use crate::dsp::blend;
use crate::dsp::filter::OnePole;
use crate::dsp::shaper::{foldback, hard_clip, soft_clip};
use crate::effect::EffectKind;

const TONE_MIN_HZ: f32 = 800.0;
const TONE_SPAN_HZ: f32 = 7200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveVoicing {
    Overdrive,
    Distortion,
    Fuzz,
}

pub struct DriveUnit {
    voicing: DriveVoicing,
    params: Params,
    sample_rate: f32,
    tone: OnePole,
}

impl DriveUnit {
    pub(crate) fn new(voicing: DriveVoicing, params: Params, sample_rate: f32) -> Self {
        let tone = OnePole::new(tone_cutoff(&params), sample_rate);
        Self {
            voicing,
            params,
            sample_rate,
            tone,
        }
    }

    #[inline]
    fn shape(&self, sample: f32, drive: f32, threshold: f32) -> f32 {
        match self.voicing {
            DriveVoicing::Overdrive => soft_clip(sample, drive),
            DriveVoicing::Distortion => hard_clip(sample, drive, threshold),
            DriveVoicing::Fuzz => foldback(sample, drive, threshold),
        }
    }
}

fn tone_cutoff(params: &Params) -> f32 {
    TONE_MIN_HZ + params.get("tone").unwrap_or(1.0) * TONE_SPAN_HZ
}

impl ProcessingUnit for DriveUnit {
    fn kind(&self) -> EffectKind {
        match self.voicing {
            DriveVoicing::Overdrive => EffectKind::Overdrive,
            DriveVoicing::Distortion => EffectKind::Distortion,
            DriveVoicing::Fuzz => EffectKind::Fuzz,
        }
    }

    fn process(&mut self, block: &mut [f32]) {
        let drive = self.params.value("drive");
        let level = self.params.value("level");
        let mix = self.params.value("mix");
        let threshold = self.params.get("threshold").unwrap_or(1.0);

        for sample in block.iter_mut() {
            let dry = *sample;
            let mut wet = self.shape(dry, drive, threshold);
            if self.voicing == DriveVoicing::Overdrive {
                wet = self.tone.next_sample(wet);
            }
            *sample = blend(dry, wet * level, mix);
        }
    }

    fn set_parameter(&mut self, key: &str, value: f32) -> bool {
        if !self.params.set(key, value) {
            return false;
        }
        if key == "tone" {
            self.tone.set_cutoff(tone_cutoff(&self.params), self.sample_rate);
        }
        true
    }

    fn parameter(&self, key: &str) -> Option<f32> {
        self.params.get(key)
    }

    fn reset(&mut self) {
        self.tone.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectNode;

    fn unit(kind: EffectKind, voicing: DriveVoicing, node: EffectNode) -> DriveUnit {
        assert_eq!(node.kind, kind);
        DriveUnit::new(voicing, Params::from_node(&node), 48_000.0)
    }

    #[test]
    fn distortion_never_exceeds_threshold_times_level() {
        let node = EffectNode::new(EffectKind::Distortion)
            .with_parameter("threshold", 0.4)
            .with_parameter("level", 1.0);
        let mut distortion = unit(EffectKind::Distortion, DriveVoicing::Distortion, node);
        let mut block: Vec<f32> = (0..512).map(|i| ((i as f32) * 0.05).sin()).collect();
        distortion.process(&mut block);
        assert!(block.iter().all(|s| s.abs() <= 0.4 + 1e-6));
    }

    #[test]
    fn fuzz_adds_harmonics() {
        let node = EffectNode::new(EffectKind::Fuzz);
        let mut fuzz = unit(EffectKind::Fuzz, DriveVoicing::Fuzz, node);
        let original: Vec<f32> = (0..256).map(|i| 0.5 * ((i as f32) * 0.1).sin()).collect();
        let mut block = original.clone();
        fuzz.process(&mut block);
        assert!(block.iter().zip(&original).any(|(a, b)| (a - b).abs() > 0.05));
    }

    #[test]
    fn kind_follows_voicing() {
        let node = EffectNode::new(EffectKind::Overdrive);
        assert_eq!(unit(EffectKind::Overdrive, DriveVoicing::Overdrive, node).kind(), EffectKind::Overdrive);
    }
}
