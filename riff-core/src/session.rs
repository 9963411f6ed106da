//! # Analysis Session Module
//!
//! Runs one frame through the analysis pipeline:
//! pitch detection → range check → note mapping → chord window → result.
//!
//! A frame whose estimate falls outside the configured range is not an error;
//! it is what silence and noise look like. Such a frame reports no pitch and
//! zero confidence, records nothing in the chord window, and only lets
//! observations that have aged out of the window expire.

use crate::chord::{ChordRecognizer, DEFAULT_WINDOW};
use crate::pitch::{PitchDetector, PitchMethod, PitchRange};
use crate::tuning::{A4_REFERENCE_HZ, Note, NoteMapper};
use crate::{AnalysisResult, MIN_FRAME_SIZE};
use log::trace;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often the analysis service looks for a new frame.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Frames the service queues before dropping new ones.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("frame too short: expected at least {expected} samples, got {got}")]
    FrameTooShort { expected: usize, got: usize },
    #[error("sample rate must be non-zero")]
    InvalidSampleRate,
    #[error("analysis service has stopped")]
    ServiceStopped,
}

/// Analysis settings. Everything has a sensible default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub range: PitchRange,
    pub method: PitchMethod,
    /// A4 reference in Hz.
    pub reference_hz: f32,
    /// How long a detected note counts towards the chord.
    pub chord_window: Duration,
    pub poll_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            range: PitchRange::default(),
            method: PitchMethod::default(),
            reference_hz: A4_REFERENCE_HZ,
            chord_window: DEFAULT_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl AnalysisConfig {
    pub fn with_range(mut self, range: PitchRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_method(mut self, method: PitchMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_reference(mut self, reference_hz: f32) -> Self {
        self.reference_hz = reference_hz;
        self
    }

    pub fn with_chord_window(mut self, window: Duration) -> Self {
        self.chord_window = window;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

/// Where the last frame ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No frame processed yet.
    #[default]
    Idle,
    /// The estimate fell outside the range.
    Rejected,
    /// A note was accepted and the chord recomputed.
    ChordUpdated,
}

/// Per-stream analysis state.
#[derive(Debug)]
pub struct AnalysisSession {
    detector: PitchDetector,
    mapper: NoteMapper,
    recognizer: ChordRecognizer,
    state: SessionState,
    frames: u64,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl AnalysisSession {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            detector: PitchDetector::new(config.range, config.method),
            mapper: NoteMapper::new().with_reference(config.reference_hz),
            recognizer: ChordRecognizer::new(config.chord_window),
            state: SessionState::Idle,
            frames: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Analyzes one frame captured at `now`.
    ///
    /// # Arguments
    /// * `samples` - Mono frame of at least [`MIN_FRAME_SIZE`] samples
    /// * `sample_rate` - Sample rate in Hz
    /// * `now` - Capture time, used for the chord window
    ///
    /// # Returns
    /// * `Ok(result)` - Analysis of this frame, rejected or not
    /// * `Err(AnalysisError)` - The frame could not be analyzed at all
    pub fn process_frame(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        now: Instant,
    ) -> Result<AnalysisResult, AnalysisError> {
        if samples.len() < MIN_FRAME_SIZE {
            return Err(AnalysisError::FrameTooShort {
                expected: MIN_FRAME_SIZE,
                got: samples.len(),
            });
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate);
        }
        self.frames += 1;

        let range = self.detector.range();
        let accepted = self
            .detector
            .detect(samples, sample_rate)
            .filter(|estimate| range.contains(estimate.frequency));

        let Some(estimate) = accepted else {
            trace!("Frame {} rejected", self.frames);
            self.state = SessionState::Rejected;
            self.recognizer.expire(now);
            return Ok(self.result(None, 0.0, None));
        };

        let note = self.mapper.map(estimate.frequency);
        match &note {
            Some(note) => self.recognizer.observe(note.class, now),
            None => self.recognizer.expire(now),
        }
        self.state = SessionState::ChordUpdated;
        Ok(self.result(Some(estimate.frequency), estimate.confidence, note))
    }

    /// Forgets every observed note.
    pub fn reset(&mut self) {
        self.recognizer.clear();
        self.state = SessionState::Idle;
    }

    fn result(&self, pitch_hz: Option<f32>, confidence: f32, note: Option<Note>) -> AnalysisResult {
        AnalysisResult {
            pitch_hz,
            confidence,
            note,
            active_notes: self.recognizer.active_notes(),
            chord: self.recognizer.label(),
            frame: self.frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::ChordLabel;
    use crate::tuning::PitchClass;

    fn sine(frequency: f32, sample_rate: u32) -> Vec<f32> {
        (0..MIN_FRAME_SIZE)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn short_frames_are_errors() {
        let mut session = AnalysisSession::default();
        let err = session.process_frame(&[0.0; 100], 48_000, Instant::now()).unwrap_err();
        assert_eq!(err, AnalysisError::FrameTooShort { expected: MIN_FRAME_SIZE, got: 100 });
        assert_eq!(
            session.process_frame(&sine(440.0, 48_000), 0, Instant::now()),
            Err(AnalysisError::InvalidSampleRate)
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn silence_is_rejected_quietly() {
        let mut session = AnalysisSession::default();
        let result = session.process_frame(&vec![0.0; MIN_FRAME_SIZE], 48_000, Instant::now()).unwrap();
        assert_eq!(result.pitch_hz, None);
        assert_eq!(result.confidence, 0.0);
        assert!(result.note.is_none());
        assert_eq!(result.chord, ChordLabel::None);
        assert_eq!(session.state(), SessionState::Rejected);
    }

    #[test]
    fn silence_at_high_rates_never_reaches_the_window() {
        // 88.2 kHz / 63 lags lands exactly on the 1400 Hz upper bound
        let mut session = AnalysisSession::default();
        let result = session.process_frame(&vec![0.0; MIN_FRAME_SIZE], 88_200, Instant::now()).unwrap();
        assert_eq!(result.pitch_hz, None);
        assert!(result.note.is_none());
        assert!(result.active_notes.is_empty());
        assert_eq!(result.chord, ChordLabel::None);
    }

    #[test]
    fn accepted_frame_feeds_the_chord_window() {
        let mut session = AnalysisSession::default();
        let result = session.process_frame(&sine(220.0, 44_100), 44_100, Instant::now()).unwrap();
        let note = result.note.unwrap();
        assert_eq!((note.class, note.octave), (PitchClass::A, 3));
        assert_eq!(result.active_notes, vec![PitchClass::A]);
        assert_eq!(result.chord, ChordLabel::Note(PitchClass::A));
        assert_eq!(result.frame, 1);
    }

    #[test]
    fn config_round_trips_through_serde_defaults() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"reference_hz": 442.0}"#).unwrap();
        assert_eq!(config.reference_hz, 442.0);
        assert_eq!(config.range, PitchRange::default());
    }
}
