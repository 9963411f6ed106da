// riff-core/src/lib.rs

//! The real-time core of a guitar effects rig.
//!
//! Two halves share this crate. The effect side keeps an ordered chain of
//! effect nodes and a processing graph consistent with it while audio flows
//! (`effect`, `chain`, `graph`, `pedalboard`, `units`, `dsp`). The analysis
//! side turns mono frames into a pitch, a note and a chord name (`pitch`,
//! `tuning`, `chord`, `session`, `service`). It is completely headless and
//! contains no UI code.

#[cfg(feature = "capture")]
pub mod audio;
pub mod chain;
pub mod chord;
pub mod dsp;
pub mod effect;
pub mod engine;
pub mod fft;
pub mod graph;
pub mod pedalboard;
pub mod pitch;
pub mod presets;
pub mod service;
pub mod session;
pub mod tuning;
pub mod units;

use chord::ChordLabel;
use tuning::{Note, PitchClass};

/// Samples per analysis frame. Shorter frames are rejected.
pub const MIN_FRAME_SIZE: usize = 2048;

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisResult {
    /// The detected fundamental in Hz, `None` when the frame was rejected.
    pub pitch_hz: Option<f32>,
    /// Confidence of the detection (0.0 to 1.0); 0 for rejected frames.
    pub confidence: f32,
    /// Nearest note with its cent deviation.
    pub note: Option<Note>,
    /// Distinct pitch classes heard within the chord window, C first.
    pub active_notes: Vec<PitchClass>,
    pub chord: ChordLabel,
    /// How many frames the session had analyzed when this result was produced.
    pub frame: u64,
}

pub use chain::{ChainChange, EffectChain};
pub use effect::{EffectKind, EffectNode, NodeId};
pub use graph::{GraphError, ProcessingGraph, Reconciliation, StreamFormat};
pub use pedalboard::{ChainCommand, ChainEvent, Pedalboard};
pub use service::{AnalysisService, FrameFeeder, LatestResult};
pub use session::{AnalysisConfig, AnalysisError, AnalysisSession};
