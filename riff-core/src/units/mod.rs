//! # Processing Units Module
//!
//! A processing unit is the live, stateful object that transforms audio for one
//! effect node. Units are created once per node by [`create_unit`] and live in
//! the processing graph until their node is removed; bypassing a node never
//! recreates its unit, so delay lines and reverb tails survive a toggle.
//!
//! ## Layout
//! - `tone`: compressor and equalizer
//! - `drive`: overdrive, distortion and fuzz waveshapers
//! - `modulation`: chorus, phaser, flanger and tremolo
//! - `ambience`: delay and reverb

mod ambience;
mod drive;
mod modulation;
mod tone;

use crate::effect::{EffectKind, EffectNode};

pub use ambience::{DelayUnit, ReverbUnit};
pub use drive::{DriveUnit, DriveVoicing};
pub use modulation::{ChorusUnit, FlangerUnit, PhaserUnit, TremoloUnit};
pub use tone::{CompressorUnit, EqualizerUnit};

/// Stateful audio transformer for one effect node.
///
/// `process` runs on mono blocks and must not allocate.
pub trait ProcessingUnit: Send {
    fn kind(&self) -> EffectKind;

    fn process(&mut self, block: &mut [f32]);

    /// Updates one parameter, clamped to its range. Returns `false` for keys the
    /// kind does not understand; those are kept on the node but have no effect.
    fn set_parameter(&mut self, key: &str, value: f32) -> bool;

    fn parameter(&self, key: &str) -> Option<f32>;

    /// Clears internal audio state (delay lines, filter memories).
    fn reset(&mut self);
}

/// Resolved parameter values for one kind, in the kind's table order.
#[derive(Debug, Clone)]
pub(crate) struct Params {
    kind: EffectKind,
    values: Vec<f32>,
}

impl Params {
    pub(crate) fn from_node(node: &EffectNode) -> Self {
        let values = node
            .kind
            .parameters()
            .iter()
            .map(|spec| match node.parameters.get(spec.name) {
                Some(&value) => spec.clamp(value),
                None => spec.default,
            })
            .collect();
        Self { kind: node.kind, values }
    }

    pub(crate) fn get(&self, key: &str) -> Option<f32> {
        self.index_of(key).map(|index| self.values[index])
    }

    /// Value of a parameter known to exist for this kind.
    pub(crate) fn value(&self, key: &str) -> f32 {
        self.get(key)
            .or_else(|| self.kind.default_parameter(key))
            .unwrap_or(0.0)
    }

    pub(crate) fn set(&mut self, key: &str, value: f32) -> bool {
        match self.index_of(key) {
            Some(index) => {
                self.values[index] = self.kind.parameters()[index].clamp(value);
                true
            }
            None => false,
        }
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.kind.parameters().iter().position(|spec| spec.name == key)
    }
}

/// Instantiates the unit for `node` at `sample_rate`, seeded with the node's
/// explicit parameters (kind defaults fill the rest).
pub fn create_unit(node: &EffectNode, sample_rate: f32) -> Box<dyn ProcessingUnit> {
    let params = Params::from_node(node);
    match node.kind {
        EffectKind::Compressor => Box::new(CompressorUnit::new(params, sample_rate)),
        EffectKind::Equalizer => Box::new(EqualizerUnit::new(params, sample_rate)),
        EffectKind::Overdrive => Box::new(DriveUnit::new(DriveVoicing::Overdrive, params, sample_rate)),
        EffectKind::Distortion => {
            Box::new(DriveUnit::new(DriveVoicing::Distortion, params, sample_rate))
        }
        EffectKind::Fuzz => Box::new(DriveUnit::new(DriveVoicing::Fuzz, params, sample_rate)),
        EffectKind::Chorus => Box::new(ChorusUnit::new(params, sample_rate)),
        EffectKind::Phaser => Box::new(PhaserUnit::new(params, sample_rate)),
        EffectKind::Flanger => Box::new(FlangerUnit::new(params, sample_rate)),
        EffectKind::Tremolo => Box::new(TremoloUnit::new(params, sample_rate)),
        EffectKind::Delay => Box::new(DelayUnit::new(params, sample_rate)),
        EffectKind::Reverb => Box::new(ReverbUnit::new(params, sample_rate)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (TAU * freq * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    #[test]
    fn every_kind_produces_finite_output() {
        for kind in EffectKind::ALL {
            let mut unit = create_unit(&EffectNode::new(kind), SAMPLE_RATE);
            assert_eq!(unit.kind(), kind);
            let mut block = sine(196.0, 4096);
            unit.process(&mut block);
            assert!(
                block.iter().all(|s| s.is_finite() && s.abs() < 8.0),
                "{kind} produced unbounded output"
            );
        }
    }

    #[test]
    fn node_parameters_seed_the_unit() {
        let node = EffectNode::new(EffectKind::Delay).with_parameter("time", 120.0);
        let unit = create_unit(&node, SAMPLE_RATE);
        assert_eq!(unit.parameter("time"), Some(120.0));
        assert_eq!(unit.parameter("feedback"), Some(0.35));
    }

    #[test]
    fn set_parameter_clamps_and_rejects_unknown_keys() {
        let mut unit = create_unit(&EffectNode::new(EffectKind::Reverb), SAMPLE_RATE);
        assert!(unit.set_parameter("mix", 4.0));
        assert_eq!(unit.parameter("mix"), Some(1.0));
        assert!(!unit.set_parameter("warp", 1.0));
        assert_eq!(unit.parameter("warp"), None);
    }

    #[test]
    fn dry_mix_passes_signal_through() {
        for kind in [EffectKind::Overdrive, EffectKind::Chorus, EffectKind::Delay, EffectKind::Reverb] {
            let node = EffectNode::new(kind).with_parameter("mix", 0.0);
            let mut unit = create_unit(&node, SAMPLE_RATE);
            let original = sine(330.0, 1024);
            let mut block = original.clone();
            unit.process(&mut block);
            for (a, b) in block.iter().zip(&original) {
                assert!((a - b).abs() < 1e-5, "{kind} altered a fully dry signal");
            }
        }
    }

    #[test]
    fn reset_clears_delay_tail() {
        let mut unit = create_unit(&EffectNode::new(EffectKind::Delay).with_parameter("mix", 1.0), SAMPLE_RATE);
        let mut impulse = vec![0.0; 256];
        impulse[0] = 1.0;
        unit.process(&mut impulse);
        unit.reset();

        let mut silence = vec![0.0; 48_000];
        unit.process(&mut silence);
        assert!(silence.iter().all(|s| *s == 0.0));
    }
}
