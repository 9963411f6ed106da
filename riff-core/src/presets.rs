//! Factory presets.
//!
//! Each preset builds fresh nodes on demand, so applying one to a chain with a
//! different layout always yields new node ids.

use crate::effect::{EffectKind, EffectNode};

/// A named chain layout with its parameters.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    build: fn() -> Vec<EffectNode>,
}

impl Preset {
    pub fn build(&self) -> Vec<EffectNode> {
        (self.build)()
    }
}

pub const FACTORY: &[Preset] = &[
    Preset { name: "Clean", build: clean },
    Preset { name: "Crunch", build: crunch },
    Preset { name: "Lead", build: lead },
    Preset { name: "Ambient", build: ambient },
];

/// Case-insensitive lookup.
pub fn find(name: &str) -> Option<&'static Preset> {
    FACTORY.iter().find(|preset| preset.name.eq_ignore_ascii_case(name))
}

pub fn names() -> impl Iterator<Item = &'static str> {
    FACTORY.iter().map(|preset| preset.name)
}

// Clean shares the default chain's layout, so applying it to a fresh session
// only re-syncs bypass flags and parameters.
fn clean() -> Vec<EffectNode> {
    vec![
        EffectNode::new(EffectKind::Compressor)
            .with_parameter("threshold", -24.0)
            .with_parameter("ratio", 3.0),
        EffectNode::new(EffectKind::Overdrive).with_enabled(false),
        EffectNode::new(EffectKind::Delay)
            .with_parameter("time", 280.0)
            .with_parameter("mix", 0.2),
        EffectNode::new(EffectKind::Reverb).with_parameter("mix", 0.2),
    ]
}

fn crunch() -> Vec<EffectNode> {
    vec![
        EffectNode::new(EffectKind::Compressor),
        EffectNode::new(EffectKind::Overdrive)
            .with_parameter("drive", 6.0)
            .with_parameter("tone", 0.6),
        EffectNode::new(EffectKind::Delay).with_enabled(false),
        EffectNode::new(EffectKind::Reverb).with_parameter("room_size", 0.3),
    ]
}

fn lead() -> Vec<EffectNode> {
    vec![
        EffectNode::new(EffectKind::Compressor).with_parameter("makeup", 6.0),
        EffectNode::new(EffectKind::Distortion).with_parameter("drive", 10.0),
        EffectNode::new(EffectKind::Equalizer)
            .with_parameter("mid", 4.0)
            .with_parameter("mid_frequency", 1200.0),
        EffectNode::new(EffectKind::Delay)
            .with_parameter("time", 420.0)
            .with_parameter("feedback", 0.45),
        EffectNode::new(EffectKind::Reverb),
    ]
}

fn ambient() -> Vec<EffectNode> {
    vec![
        EffectNode::new(EffectKind::Chorus).with_parameter("mix", 0.5),
        EffectNode::new(EffectKind::Delay)
            .with_parameter("time", 600.0)
            .with_parameter("feedback", 0.6)
            .with_parameter("mix", 0.45),
        EffectNode::new(EffectKind::Reverb)
            .with_parameter("room_size", 0.9)
            .with_parameter("mix", 0.5),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::EffectChain;

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(find("crunch").map(|p| p.name), Some("Crunch"));
        assert!(find("metal").is_none());
    }

    #[test]
    fn clean_matches_default_layout() {
        let default = EffectChain::with_default_nodes();
        let clean = EffectChain::from_nodes(find("Clean").unwrap().build());
        assert_eq!(default.kinds(), clean.kinds());
    }

    #[test]
    fn presets_only_use_known_parameters() {
        for preset in FACTORY {
            for node in preset.build() {
                for key in node.parameters.keys() {
                    assert!(node.kind.param_spec(key).is_some(), "{}: {} has no '{key}'", preset.name, node.kind);
                }
            }
        }
    }
}
