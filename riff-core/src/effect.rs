//! # Effect Model Module
//!
//! Describes a single stage of the signal chain: which kind of effect it is,
//! whether it currently alters the signal, and its free-form parameters.
//!
//! ## Features
//! - Closed set of effect kinds with display names
//! - Per-kind parameter tables (name, range, default)
//! - Process-unique node identifiers that survive bypass toggles

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of an effect node, stable for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocates a fresh identifier. Identifiers are never reused within a process.
    pub fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kinds of effect a chain can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Compressor,
    Equalizer,
    Overdrive,
    Distortion,
    Fuzz,
    Chorus,
    Phaser,
    Flanger,
    Tremolo,
    Delay,
    Reverb,
}

/// Range and default of one effect parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamSpec {
    const fn new(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self { name, min, max, default }
    }

    /// Clamps a requested value into this parameter's range.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.default
        }
    }
}

const COMPRESSOR_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("threshold", -60.0, 0.0, -18.0),
    ParamSpec::new("ratio", 1.0, 20.0, 4.0),
    ParamSpec::new("attack", 0.1, 100.0, 5.0),
    ParamSpec::new("release", 10.0, 1000.0, 120.0),
    ParamSpec::new("makeup", 0.0, 24.0, 3.0),
];

const EQUALIZER_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("low", -12.0, 12.0, 0.0),
    ParamSpec::new("mid", -12.0, 12.0, 0.0),
    ParamSpec::new("high", -12.0, 12.0, 0.0),
    ParamSpec::new("mid_frequency", 200.0, 5000.0, 800.0),
];

const OVERDRIVE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("drive", 1.0, 10.0, 3.0),
    ParamSpec::new("tone", 0.0, 1.0, 0.5),
    ParamSpec::new("level", 0.0, 1.5, 0.8),
    ParamSpec::new("mix", 0.0, 1.0, 1.0),
];

const DISTORTION_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("drive", 1.0, 20.0, 6.0),
    ParamSpec::new("threshold", 0.05, 1.0, 0.5),
    ParamSpec::new("level", 0.0, 1.5, 0.7),
    ParamSpec::new("mix", 0.0, 1.0, 1.0),
];

const FUZZ_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("drive", 1.0, 40.0, 12.0),
    ParamSpec::new("threshold", 0.05, 1.0, 0.3),
    ParamSpec::new("level", 0.0, 1.5, 0.6),
    ParamSpec::new("mix", 0.0, 1.0, 1.0),
];

const CHORUS_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("rate", 0.1, 5.0, 0.8),
    ParamSpec::new("depth", 0.5, 10.0, 2.5),
    ParamSpec::new("mix", 0.0, 1.0, 0.4),
];

const PHASER_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("rate", 0.05, 5.0, 0.5),
    ParamSpec::new("depth", 0.0, 1.0, 0.7),
    ParamSpec::new("feedback", 0.0, 0.9, 0.4),
    ParamSpec::new("mix", 0.0, 1.0, 0.5),
];

const FLANGER_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("rate", 0.05, 5.0, 0.25),
    ParamSpec::new("depth", 0.1, 5.0, 2.0),
    ParamSpec::new("feedback", 0.0, 0.95, 0.5),
    ParamSpec::new("mix", 0.0, 1.0, 0.5),
];

const TREMOLO_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("rate", 0.5, 20.0, 5.0),
    ParamSpec::new("depth", 0.0, 1.0, 0.6),
];

const DELAY_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("time", 20.0, 2000.0, 350.0),
    ParamSpec::new("feedback", 0.0, 0.95, 0.35),
    ParamSpec::new("mix", 0.0, 1.0, 0.3),
];

const REVERB_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("room_size", 0.0, 1.0, 0.5),
    ParamSpec::new("damping", 0.0, 1.0, 0.5),
    ParamSpec::new("mix", 0.0, 1.0, 0.25),
];

impl EffectKind {
    /// Every kind, in the order a picker would list them.
    pub const ALL: [EffectKind; 11] = [
        EffectKind::Compressor,
        EffectKind::Equalizer,
        EffectKind::Overdrive,
        EffectKind::Distortion,
        EffectKind::Fuzz,
        EffectKind::Chorus,
        EffectKind::Phaser,
        EffectKind::Flanger,
        EffectKind::Tremolo,
        EffectKind::Delay,
        EffectKind::Reverb,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            EffectKind::Compressor => "Compressor",
            EffectKind::Equalizer => "Equalizer",
            EffectKind::Overdrive => "Overdrive",
            EffectKind::Distortion => "Distortion",
            EffectKind::Fuzz => "Fuzz",
            EffectKind::Chorus => "Chorus",
            EffectKind::Phaser => "Phaser",
            EffectKind::Flanger => "Flanger",
            EffectKind::Tremolo => "Tremolo",
            EffectKind::Delay => "Delay",
            EffectKind::Reverb => "Reverb",
        }
    }

    /// The parameters this kind understands, with their ranges and defaults.
    pub fn parameters(self) -> &'static [ParamSpec] {
        match self {
            EffectKind::Compressor => COMPRESSOR_PARAMS,
            EffectKind::Equalizer => EQUALIZER_PARAMS,
            EffectKind::Overdrive => OVERDRIVE_PARAMS,
            EffectKind::Distortion => DISTORTION_PARAMS,
            EffectKind::Fuzz => FUZZ_PARAMS,
            EffectKind::Chorus => CHORUS_PARAMS,
            EffectKind::Phaser => PHASER_PARAMS,
            EffectKind::Flanger => FLANGER_PARAMS,
            EffectKind::Tremolo => TREMOLO_PARAMS,
            EffectKind::Delay => DELAY_PARAMS,
            EffectKind::Reverb => REVERB_PARAMS,
        }
    }

    pub fn param_spec(self, name: &str) -> Option<&'static ParamSpec> {
        self.parameters().iter().find(|spec| spec.name == name)
    }

    /// Default value of `name` for this kind, or `None` for an unknown key.
    pub fn default_parameter(self, name: &str) -> Option<f32> {
        self.param_spec(name).map(|spec| spec.default)
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One stage in the signal chain.
///
/// `parameters` only holds values the user has explicitly set; everything else
/// falls back to the kind's default when the processing unit reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectNode {
    pub id: NodeId,
    pub kind: EffectKind,
    pub enabled: bool,
    pub parameters: BTreeMap<String, f32>,
}

impl EffectNode {
    /// Creates an enabled node with no explicit parameters.
    pub fn new(kind: EffectKind) -> Self {
        Self {
            id: NodeId::next(),
            kind,
            enabled: true,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_parameter(mut self, key: &str, value: f32) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    /// Resolves a parameter: explicit value first, then the kind default.
    pub fn parameter(&self, key: &str) -> Option<f32> {
        self.parameters
            .get(key)
            .copied()
            .or_else(|| self.kind.default_parameter(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let a = EffectNode::new(EffectKind::Delay);
        let b = EffectNode::new(EffectKind::Delay);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn missing_parameter_falls_back_to_kind_default() {
        let node = EffectNode::new(EffectKind::Delay).with_parameter("mix", 0.8);
        assert_eq!(node.parameter("mix"), Some(0.8));
        assert_eq!(node.parameter("time"), Some(350.0));
        assert_eq!(node.parameter("nonsense"), None);
    }

    #[test]
    fn every_kind_has_a_parameter_table() {
        for kind in EffectKind::ALL {
            assert!(!kind.parameters().is_empty(), "{kind} has no parameters");
            for spec in kind.parameters() {
                assert!(spec.min <= spec.default && spec.default <= spec.max);
            }
        }
    }

    #[test]
    fn clamp_rejects_non_finite_values() {
        let spec = EffectKind::Reverb.param_spec("mix").unwrap();
        assert_eq!(spec.clamp(3.0), 1.0);
        assert_eq!(spec.clamp(f32::NAN), spec.default);
    }
}
