//! # Pedalboard Module
//!
//! The single front door for chain edits. The chain and the processing graph
//! live behind one lock, so every mutation and the reconciliation it triggers
//! run to completion before the next one starts; two rebuilds never interleave.
//!
//! After each mutation a [`ChainEvent`] carrying a fresh snapshot of the nodes
//! is sent to every subscriber, so presentation layers re-render from data
//! instead of reaching into the graph.

use crate::chain::{ChainChange, EffectChain};
use crate::effect::{EffectKind, EffectNode, NodeId};
use crate::engine::{AudioEngine, EngineError, HeadlessEngine};
use crate::graph::{GraphError, ProcessingGraph, Reconciliation, StreamFormat};
use crate::presets;
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// A user-level chain edit.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainCommand {
    Add(EffectKind),
    Remove(usize),
    Move { from: usize, to: usize },
    Toggle(NodeId),
    SetEnabled { id: NodeId, enabled: bool },
    UpdateParameter { id: NodeId, key: String, value: f32 },
    Clear,
    ApplyPreset(Vec<EffectNode>),
}

/// Published after every applied command.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEvent {
    pub change: ChainChange,
    pub reconciliation: Reconciliation,
    /// Node created or touched by the command, if any.
    pub node: Option<NodeId>,
    /// Chain contents after the command.
    pub nodes: Vec<EffectNode>,
    pub engine_running: bool,
}

struct Board {
    chain: EffectChain,
    graph: ProcessingGraph,
}

pub struct Pedalboard {
    board: Mutex<Board>,
    subscribers: Mutex<Vec<Sender<ChainEvent>>>,
}

impl Default for Pedalboard {
    fn default() -> Self {
        Self::new(EffectChain::with_default_nodes(), Box::new(HeadlessEngine::new()))
    }
}

impl Pedalboard {
    pub fn new(chain: EffectChain, engine: Box<dyn AudioEngine>) -> Self {
        Self {
            board: Mutex::new(Board {
                chain,
                graph: ProcessingGraph::new(engine),
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Receives a [`ChainEvent`] for every command applied from now on.
    pub fn subscribe(&self) -> Receiver<ChainEvent> {
        let (tx, rx) = unbounded();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Snapshot of the chain in signal order.
    pub fn nodes(&self) -> Vec<EffectNode> {
        lock(&self.board).chain.nodes().to_vec()
    }

    /// Read access to the chain and graph under the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&EffectChain, &ProcessingGraph) -> R) -> R {
        let board = lock(&self.board);
        f(&board.chain, &board.graph)
    }

    /// Attaches (or re-attaches) the audio source and rebuilds against it.
    pub fn attach_source(&self, format: StreamFormat) -> Result<Reconciliation, GraphError> {
        let mut board = lock(&self.board);
        let Board { chain, graph } = &mut *board;
        graph.attach_source(format);
        graph.rebuild(chain)
    }

    /// Fixes the format units run at and re-realizes the chain against it.
    /// Without a usable source this only records the format.
    pub fn set_processing_format(
        &self,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Reconciliation, GraphError> {
        let mut board = lock(&self.board);
        let Board { chain, graph } = &mut *board;
        graph.set_processing_format(sample_rate, channels);
        if !graph.is_stale() {
            return Ok(Reconciliation::Unchanged);
        }
        graph.rebuild(chain)
    }

    pub fn start(&self) -> Result<(), EngineError> {
        lock(&self.board).graph.start()
    }

    pub fn stop(&self) {
        lock(&self.board).graph.stop();
    }

    pub fn add(&self, kind: EffectKind) -> Result<ChainEvent, GraphError> {
        self.apply(ChainCommand::Add(kind))
    }

    pub fn remove(&self, index: usize) -> Result<ChainEvent, GraphError> {
        self.apply(ChainCommand::Remove(index))
    }

    pub fn move_node(&self, from: usize, to: usize) -> Result<ChainEvent, GraphError> {
        self.apply(ChainCommand::Move { from, to })
    }

    pub fn toggle(&self, id: NodeId) -> Result<ChainEvent, GraphError> {
        self.apply(ChainCommand::Toggle(id))
    }

    pub fn set_enabled(&self, id: NodeId, enabled: bool) -> Result<ChainEvent, GraphError> {
        self.apply(ChainCommand::SetEnabled { id, enabled })
    }

    pub fn update_parameter(&self, id: NodeId, key: &str, value: f32) -> Result<ChainEvent, GraphError> {
        self.apply(ChainCommand::UpdateParameter {
            id,
            key: key.to_string(),
            value,
        })
    }

    pub fn clear(&self) -> Result<ChainEvent, GraphError> {
        self.apply(ChainCommand::Clear)
    }

    pub fn apply_preset(&self, nodes: Vec<EffectNode>) -> Result<ChainEvent, GraphError> {
        self.apply(ChainCommand::ApplyPreset(nodes))
    }

    /// Applies a factory preset by name. Returns `Ok(None)` for an unknown name.
    pub fn apply_named_preset(&self, name: &str) -> Result<Option<ChainEvent>, GraphError> {
        match presets::find(name) {
            Some(preset) => self.apply_preset(preset.build()).map(Some),
            None => {
                warn!("Unknown preset '{name}'");
                Ok(None)
            }
        }
    }

    /// Applies one command and reconciles the graph before releasing the lock.
    ///
    /// # Returns
    /// The published event, or [`GraphError::RestartFailed`] when the engine did
    /// not come back after a rebuild. In the error case the chain and graph are
    /// still consistent and subscribers still receive the event.
    pub fn apply(&self, command: ChainCommand) -> Result<ChainEvent, GraphError> {
        let mut board = lock(&self.board);
        let Board { chain, graph } = &mut *board;

        debug!("Applying {command:?}");
        let (change, node) = match command {
            ChainCommand::Add(kind) => {
                let (id, change) = chain.add(kind);
                (change, Some(id))
            }
            ChainCommand::Remove(index) => (chain.remove(index), None),
            ChainCommand::Move { from, to } => (chain.move_node(from, to), None),
            ChainCommand::Toggle(id) => (chain.toggle(id), Some(id)),
            ChainCommand::SetEnabled { id, enabled } => (chain.set_enabled(id, enabled), Some(id)),
            ChainCommand::UpdateParameter { id, key, value } => {
                (chain.update_parameter(id, &key, value), Some(id))
            }
            ChainCommand::Clear => (chain.clear(), None),
            ChainCommand::ApplyPreset(nodes) => (chain.apply_preset(nodes), None),
        };

        let outcome = graph.reconcile(chain, &change);
        let event = ChainEvent {
            reconciliation: match &outcome {
                Ok(reconciliation) => *reconciliation,
                Err(GraphError::RestartFailed(_)) => Reconciliation::Rebuilt,
            },
            change,
            node,
            nodes: chain.nodes().to_vec(),
            engine_running: graph.is_running(),
        };
        // published under the board lock so subscribers see edits in order
        self.publish(&event);
        drop(board);
        outcome.map(|_| event)
    }

    /// Runs a block through the graph from the audio side.
    ///
    /// Never waits on the lock: while an edit holds it, the block passes
    /// through dry rather than observing a half-rewired graph.
    pub fn process_block(&self, block: &mut [f32]) -> bool {
        let mut board = match self.board.try_lock() {
            Ok(board) => board,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        board.graph.process(block);
        true
    }

    fn publish(&self, event: &ChainEvent) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached() -> Pedalboard {
        let board = Pedalboard::default();
        board.attach_source(StreamFormat::new(48_000, 1)).unwrap();
        board
    }

    #[test]
    fn subscribers_receive_snapshots() {
        let board = attached();
        let events = board.subscribe();
        let event = board.add(EffectKind::Chorus).unwrap();
        let received = events.try_recv().unwrap();
        assert_eq!(received, event);
        assert_eq!(received.nodes.len(), 5);
        assert_eq!(received.nodes[4].kind, EffectKind::Chorus);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let board = attached();
        drop(board.subscribe());
        board.clear().unwrap();
        assert!(lock(&board.subscribers).is_empty());
    }

    #[test]
    fn toggle_does_not_rebuild() {
        let board = attached();
        let id = board.nodes()[1].id;
        let rebuilds = board.inspect(|_, graph| graph.rebuild_count());
        let event = board.toggle(id).unwrap();
        assert_eq!(event.reconciliation, Reconciliation::Bypassed);
        assert_eq!(board.inspect(|_, graph| graph.rebuild_count()), rebuilds);
    }

    #[test]
    fn processing_format_takes_effect_immediately() {
        let board = Pedalboard::new(
            EffectChain::from_nodes(vec![EffectNode::new(EffectKind::Distortion)]),
            Box::new(HeadlessEngine::new()),
        );
        assert_eq!(board.set_processing_format(44_100, 1).unwrap(), Reconciliation::NoSource);
        board.attach_source(StreamFormat::new(48_000, 1)).unwrap();
        assert_eq!(board.set_processing_format(44_100, 1).unwrap(), Reconciliation::Rebuilt);
        assert_eq!(board.set_processing_format(44_100, 1).unwrap(), Reconciliation::Unchanged);
        board.inspect(|_, graph| {
            assert!(!graph.is_stale());
            assert_eq!(graph.processing_format(), Some(StreamFormat::new(44_100, 1)));
        });

        let original: Vec<f32> = (0..256).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let mut block = original.clone();
        assert!(board.process_block(&mut block));
        assert_ne!(block, original);
    }

    #[test]
    fn unknown_preset_name_is_ignored() {
        let board = attached();
        let before = board.nodes();
        assert_eq!(board.apply_named_preset("Nope").unwrap(), None);
        assert_eq!(board.nodes(), before);
    }
}
