//! # Effect Chain Module
//!
//! The ordered list of effect nodes the signal flows through. The chain is pure
//! data: every mutation reports a [`ChainChange`] telling the caller which
//! reconciliation the processing graph needs, so the chain itself never touches
//! audio.
//!
//! ## Reconciliation strategies
//! - Topology changes (add, remove, move, clear, mismatched presets) need a full rebuild
//! - Enable/disable and parameter edits are applied to the existing unit in place
//! - Presets with the same kind sequence only re-sync bypass flags and parameters

use crate::effect::{EffectKind, EffectNode, NodeId};

/// What a chain mutation requires from the processing graph.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainChange {
    /// Nothing changed (stale index, unknown node, no-op move).
    Unchanged,
    /// The topology changed; the graph must be rewired.
    Rebuild,
    /// A single node's enabled flag changed.
    Bypass { id: NodeId, enabled: bool },
    /// A single node's parameter changed.
    Parameter { id: NodeId, key: String, value: f32 },
    /// Same topology, new enabled flags and parameters for every node.
    Rebypass,
}

/// Ordered collection of effect nodes. Order is signal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectChain {
    nodes: Vec<EffectNode>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// The chain a session starts with.
    pub fn with_default_nodes() -> Self {
        Self::from_nodes(vec![
            EffectNode::new(EffectKind::Compressor),
            EffectNode::new(EffectKind::Overdrive),
            EffectNode::new(EffectKind::Delay),
            EffectNode::new(EffectKind::Reverb),
        ])
    }

    pub fn from_nodes(nodes: Vec<EffectNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[EffectNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&EffectNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    /// Kinds in signal order; two chains with equal kind sequences share a topology.
    pub fn kinds(&self) -> Vec<EffectKind> {
        self.nodes.iter().map(|node| node.kind).collect()
    }

    /// Appends a new enabled node of `kind`. Returns its id alongside the change.
    pub fn add(&mut self, kind: EffectKind) -> (NodeId, ChainChange) {
        let node = EffectNode::new(kind);
        let id = node.id;
        self.nodes.push(node);
        (id, ChainChange::Rebuild)
    }

    /// Deletes the node at `index`. Out-of-bounds indices are ignored.
    pub fn remove(&mut self, index: usize) -> ChainChange {
        if index >= self.nodes.len() {
            return ChainChange::Unchanged;
        }
        self.nodes.remove(index);
        ChainChange::Rebuild
    }

    /// Moves the node at `from` so it ends up at `to`.
    ///
    /// `to` is an insertion index into the sequence *after* the node has been
    /// taken out, so `to` ranges over `0..len`. Anything outside that, or a move
    /// that leaves the order unchanged, is a no-op.
    pub fn move_node(&mut self, from: usize, to: usize) -> ChainChange {
        let len = self.nodes.len();
        if from >= len || to >= len || from == to {
            return ChainChange::Unchanged;
        }
        let node = self.nodes.remove(from);
        self.nodes.insert(to, node);
        ChainChange::Rebuild
    }

    /// Flips a node's enabled flag.
    pub fn toggle(&mut self, id: NodeId) -> ChainChange {
        match self.nodes.iter_mut().find(|node| node.id == id) {
            Some(node) => {
                node.enabled = !node.enabled;
                ChainChange::Bypass { id, enabled: node.enabled }
            }
            None => ChainChange::Unchanged,
        }
    }

    /// Sets a node's enabled flag; setting it to its current value is a no-op.
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> ChainChange {
        match self.nodes.iter_mut().find(|node| node.id == id) {
            Some(node) if node.enabled != enabled => {
                node.enabled = enabled;
                ChainChange::Bypass { id, enabled }
            }
            _ => ChainChange::Unchanged,
        }
    }

    pub fn update_parameter(&mut self, id: NodeId, key: &str, value: f32) -> ChainChange {
        match self.nodes.iter_mut().find(|node| node.id == id) {
            Some(node) => {
                node.parameters.insert(key.to_string(), value);
                ChainChange::Parameter { id, key: key.to_string(), value }
            }
            None => ChainChange::Unchanged,
        }
    }

    /// Empties the chain. The graph falls back to a plain source → sink passthrough.
    pub fn clear(&mut self) -> ChainChange {
        self.nodes.clear();
        ChainChange::Rebuild
    }

    /// Replaces the chain with `preset`.
    ///
    /// When the preset has the same kind sequence as the current chain, the
    /// existing nodes keep their ids (and therefore their live units) and only
    /// adopt the preset's enabled flags and parameters. An empty preset always
    /// counts as a topology change.
    pub fn apply_preset(&mut self, preset: Vec<EffectNode>) -> ChainChange {
        let same_topology = !preset.is_empty()
            && preset.len() == self.nodes.len()
            && preset
                .iter()
                .zip(&self.nodes)
                .all(|(incoming, current)| incoming.kind == current.kind);

        if same_topology {
            for (current, incoming) in self.nodes.iter_mut().zip(preset) {
                current.enabled = incoming.enabled;
                current.parameters = incoming.parameters;
            }
            ChainChange::Rebypass
        } else {
            self.nodes = preset;
            ChainChange::Rebuild
        }
    }
}
