//! # Engine Module
//!
//! The seam between the processing graph and whatever actually pulls audio
//! through it. A full rebuild stops the engine, rewires, then starts it again;
//! the graph only needs to know whether the engine is running and how to stop
//! and start it.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("audio engine failed to start: {0}")]
    StartFailed(String),
}

/// Something that drives audio through the graph.
pub trait AudioEngine: Send {
    fn is_running(&self) -> bool;

    fn start(&mut self) -> Result<(), EngineError>;

    fn stop(&mut self);
}

/// In-process engine for hosts that pull blocks through the graph themselves.
///
/// It only tracks the running flag; starting always succeeds.
#[derive(Debug, Default)]
pub struct HeadlessEngine {
    running: bool,
    starts: usize,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the engine has been started.
    pub fn start_count(&self) -> usize {
        self.starts
    }
}

impl AudioEngine for HeadlessEngine {
    fn is_running(&self) -> bool {
        self.running
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.running = true;
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }
}
