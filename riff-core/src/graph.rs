//! # Processing Graph Module
//!
//! Owns the live signal path: an immutable source endpoint, one processing
//! unit per chain node, and an immutable sink. The graph reconciles itself
//! against an [`EffectChain`] snapshot using one of two strategies:
//!
//! - **In-place bypass**: flip the unit's bypass flag or push a parameter. No
//!   connection changes, no engine interruption.
//! - **Full rebuild**: stop the engine, drop every inter-unit edge, walk the
//!   chain reusing or instantiating units, wire source → units → sink, restart.
//!
//! Every chain node stays wired; disabled nodes are wired but flagged bypassed,
//! so re-enabling one never recreates its unit.
//!
//! Without a usable source format (never attached, zero sample rate or zero
//! channels) every reconciliation is a no-op and the graph waits, marked stale,
//! for a source to appear.

use crate::chain::{ChainChange, EffectChain};
use crate::effect::{EffectKind, EffectNode, NodeId};
use crate::engine::{AudioEngine, EngineError, HeadlessEngine};
use crate::units::{ProcessingUnit, create_unit};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Sample rate and channel count of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self { sample_rate, channels }
    }

    /// A format with no sample rate or no channels means there is no audio source.
    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0 && self.channels > 0
    }
}

/// One end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Source,
    Unit(NodeId),
    Sink,
}

/// What a reconciliation actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing to do.
    Unchanged,
    /// No usable source format; the graph was left untouched.
    NoSource,
    /// Topology torn down and rewired.
    Rebuilt,
    /// A single unit's bypass flag flipped in place.
    Bypassed,
    /// A parameter was pushed to a live unit.
    ParameterPushed,
    /// Bypass flags and parameters re-synced for every unit, no rewiring.
    Resynced,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    /// The topology was rebuilt but the engine did not come back. The graph and
    /// chain are consistent; starting the engine again is safe.
    #[error("graph rebuilt but the engine failed to restart")]
    RestartFailed(#[source] EngineError),
}

struct UnitSlot {
    unit: Box<dyn ProcessingUnit>,
    kind: EffectKind,
    bypassed: bool,
    instance: u64,
}

pub struct ProcessingGraph {
    source_format: Option<StreamFormat>,
    processing_format: Option<StreamFormat>,
    /// Format the current units were instantiated against.
    built_format: Option<StreamFormat>,
    units: HashMap<NodeId, UnitSlot>,
    wiring: Vec<NodeId>,
    edges: Vec<(Endpoint, Endpoint)>,
    engine: Box<dyn AudioEngine>,
    stale: bool,
    rebuilds: usize,
    next_instance: u64,
}

impl Default for ProcessingGraph {
    fn default() -> Self {
        Self::new(Box::new(HeadlessEngine::new()))
    }
}

impl ProcessingGraph {
    pub fn new(engine: Box<dyn AudioEngine>) -> Self {
        Self {
            source_format: None,
            processing_format: None,
            built_format: None,
            units: HashMap::new(),
            wiring: Vec::new(),
            edges: Vec::new(),
            engine,
            stale: true,
            rebuilds: 0,
            next_instance: 1,
        }
    }

    /// Records the format of the audio source. Called lazily on first setup and
    /// again whenever the input device changes.
    pub fn attach_source(&mut self, format: StreamFormat) {
        if !format.is_valid() {
            warn!(
                "No usable audio source ({} Hz, {} ch); waiting for input",
                format.sample_rate, format.channels
            );
        } else {
            info!("Audio source attached: {} Hz, {} ch", format.sample_rate, format.channels);
        }
        if self.source_format != Some(format) {
            self.source_format = Some(format);
            self.stale = true;
        }
    }

    /// Fixes the shared format every unit is instantiated against. An invalid
    /// format is ignored and the source format is used instead.
    pub fn set_processing_format(&mut self, sample_rate: u32, channels: u16) {
        let format = StreamFormat::new(sample_rate, channels);
        if !format.is_valid() {
            warn!("Ignoring invalid processing format {sample_rate} Hz, {channels} ch");
            return;
        }
        if self.processing_format != Some(format) {
            debug!("Processing format set to {sample_rate} Hz, {channels} ch");
            self.processing_format = Some(format);
            self.stale = true;
        }
    }

    /// The format units run at: the explicit processing format, else the source
    /// format. `None` while there is no usable source.
    pub fn processing_format(&self) -> Option<StreamFormat> {
        let source = self.source_format.filter(StreamFormat::is_valid)?;
        Some(self.processing_format.unwrap_or(source))
    }

    /// Applies `change` (already made to `chain`) with the matching strategy.
    pub fn reconcile(
        &mut self,
        chain: &EffectChain,
        change: &ChainChange,
    ) -> Result<Reconciliation, GraphError> {
        match change {
            ChainChange::Unchanged => Ok(Reconciliation::Unchanged),
            ChainChange::Rebuild => self.rebuild(chain),
            ChainChange::Bypass { id, enabled } => self.set_bypass(chain, *id, !*enabled),
            ChainChange::Parameter { id, key, value } => self.push_parameter(chain, *id, key, *value),
            ChainChange::Rebypass => self.sync_bypass(chain),
        }
    }

    /// Full rebuild against `chain`.
    pub fn rebuild(&mut self, chain: &EffectChain) -> Result<Reconciliation, GraphError> {
        let Some(format) = self.processing_format() else {
            self.stale = true;
            debug!("Rebuild skipped: no audio source");
            return Ok(Reconciliation::NoSource);
        };

        let was_running = self.engine.is_running();
        if was_running {
            self.engine.stop();
        }

        self.edges.clear();
        self.wiring.clear();

        if self.built_format != Some(format) {
            if !self.units.is_empty() {
                debug!("Processing format changed, discarding {} units", self.units.len());
            }
            self.units.clear();
            self.built_format = Some(format);
        }

        let live: HashSet<NodeId> = chain.nodes().iter().map(|node| node.id).collect();
        self.units.retain(|id, _| live.contains(id));

        let mut upstream = Endpoint::Source;
        let mut wired = HashSet::new();
        for node in chain.nodes() {
            if !wired.insert(node.id) {
                warn!("Node {} appears twice in the chain; wiring it once", node.id);
                continue;
            }
            if !self.units.contains_key(&node.id) {
                let slot = self.instantiate(node, format);
                self.units.insert(node.id, slot);
            }
            if let Some(slot) = self.units.get_mut(&node.id) {
                slot.bypassed = !node.enabled;
                push_all_parameters(slot.unit.as_mut(), node);
            }
            let endpoint = Endpoint::Unit(node.id);
            self.edges.push((upstream, endpoint));
            self.wiring.push(node.id);
            upstream = endpoint;
        }
        self.edges.push((upstream, Endpoint::Sink));

        self.stale = false;
        self.rebuilds += 1;
        debug!("Graph rebuilt: {} units wired", self.wiring.len());

        if was_running {
            if let Err(err) = self.engine.start() {
                warn!("Engine failed to restart after rebuild: {err}");
                return Err(GraphError::RestartFailed(err));
            }
        }
        Ok(Reconciliation::Rebuilt)
    }

    /// In-place bypass. Falls back to a full rebuild when the node has no live unit.
    pub fn set_bypass(
        &mut self,
        chain: &EffectChain,
        id: NodeId,
        bypassed: bool,
    ) -> Result<Reconciliation, GraphError> {
        if self.processing_format().is_none() {
            self.stale = true;
            return Ok(Reconciliation::NoSource);
        }
        match self.live_slot_mut(id) {
            Some(slot) => {
                // a unit coming back must not replay the tail it held when muted
                if slot.bypassed && !bypassed {
                    slot.unit.reset();
                }
                slot.bypassed = bypassed;
                debug!("Unit {id} bypassed={bypassed}");
                Ok(Reconciliation::Bypassed)
            }
            None => self.rebuild(chain),
        }
    }

    /// Pushes one parameter to a live unit. Falls back to a full rebuild when
    /// the node has no live unit.
    pub fn push_parameter(
        &mut self,
        chain: &EffectChain,
        id: NodeId,
        key: &str,
        value: f32,
    ) -> Result<Reconciliation, GraphError> {
        if self.processing_format().is_none() {
            self.stale = true;
            return Ok(Reconciliation::NoSource);
        }
        match self.live_slot_mut(id) {
            Some(slot) => {
                if !slot.unit.set_parameter(key, value) {
                    debug!("{} ignores parameter '{key}'", slot.kind);
                }
                Ok(Reconciliation::ParameterPushed)
            }
            None => self.rebuild(chain),
        }
    }

    /// Re-syncs bypass flags and parameters for every node without rewiring.
    /// Falls back to a full rebuild if the wiring no longer matches the chain.
    pub fn sync_bypass(&mut self, chain: &EffectChain) -> Result<Reconciliation, GraphError> {
        if self.processing_format().is_none() {
            self.stale = true;
            return Ok(Reconciliation::NoSource);
        }
        let matches = !self.stale
            && self.wiring.len() == chain.len()
            && self
                .wiring
                .iter()
                .zip(chain.nodes())
                .all(|(id, node)| *id == node.id && self.units.contains_key(id));
        if !matches || chain.is_empty() {
            return self.rebuild(chain);
        }

        for node in chain.nodes() {
            if let Some(slot) = self.units.get_mut(&node.id) {
                slot.bypassed = !node.enabled;
                push_all_parameters(slot.unit.as_mut(), node);
            }
        }
        debug!("Bypass state re-synced for {} units", chain.len());
        Ok(Reconciliation::Resynced)
    }

    /// Runs a mono block through every wired, non-bypassed unit in order.
    /// A stale or sourceless graph passes audio straight through.
    pub fn process(&mut self, block: &mut [f32]) {
        if self.stale {
            return;
        }
        for id in &self.wiring {
            if let Some(slot) = self.units.get_mut(id) {
                if !slot.bypassed {
                    slot.unit.process(block);
                }
            }
        }
    }

    pub fn start(&mut self) -> Result<(), EngineError> {
        self.engine.start()
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Realized unit order, source side first.
    pub fn wiring(&self) -> &[NodeId] {
        &self.wiring
    }

    pub fn connections(&self) -> &[(Endpoint, Endpoint)] {
        &self.edges
    }

    /// Wired units that currently alter the signal, in order.
    pub fn live_units(&self) -> Vec<NodeId> {
        self.wiring
            .iter()
            .copied()
            .filter(|id| self.units.get(id).is_some_and(|slot| !slot.bypassed))
            .collect()
    }

    /// Instance number of the unit serving `id`; changes only when the unit is recreated.
    pub fn unit_instance(&self, id: NodeId) -> Option<u64> {
        self.units.get(&id).map(|slot| slot.instance)
    }

    pub fn is_bypassed(&self, id: NodeId) -> Option<bool> {
        self.units.get(&id).map(|slot| slot.bypassed)
    }

    pub fn unit_parameter(&self, id: NodeId, key: &str) -> Option<f32> {
        self.units.get(&id).and_then(|slot| slot.unit.parameter(key))
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// True until the next successful rebuild after a topology or format change.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    fn live_slot_mut(&mut self, id: NodeId) -> Option<&mut UnitSlot> {
        if self.stale {
            return None;
        }
        self.units.get_mut(&id)
    }

    fn instantiate(&mut self, node: &EffectNode, format: StreamFormat) -> UnitSlot {
        let instance = self.next_instance;
        self.next_instance += 1;
        debug!("Creating {} unit for node {}", node.kind, node.id);
        UnitSlot {
            unit: create_unit(node, format.sample_rate as f32),
            kind: node.kind,
            bypassed: !node.enabled,
            instance,
        }
    }
}

/// Pushes every parameter the kind knows, resolving missing keys to defaults.
fn push_all_parameters(unit: &mut dyn ProcessingUnit, node: &EffectNode) {
    for spec in node.kind.parameters() {
        let value = node.parameter(spec.name).unwrap_or(spec.default);
        unit.set_parameter(spec.name, value);
    }
}
