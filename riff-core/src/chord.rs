//! # Chord Recognition Module
//!
//! Keeps a trailing time window of observed pitch classes and names the chord
//! they form.
//!
//! A note stays active for the length of the window after its last
//! observation. Matching compares the active set against a fixed table of
//! chord shapes; the entry sharing the most notes with the active set wins,
//! provided it shares at least two. Ties go to the entry listed first, so the
//! table order doubles as the priority order (majors, then minors, sevenths
//! and finally power chords).

use crate::tuning::PitchClass;
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Default trailing window.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(500);

/// Fewest shared notes a table entry needs to be reported.
const MIN_MATCHES: usize = 2;

/// Chord qualities in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordQuality {
    Major,
    Minor,
    Dominant7,
    Major7,
    Minor7,
    Power,
}

impl ChordQuality {
    const ALL: [ChordQuality; 6] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Dominant7,
        ChordQuality::Major7,
        ChordQuality::Minor7,
        ChordQuality::Power,
    ];

    /// Semitone offsets above the root.
    fn intervals(self) -> &'static [i32] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::Power => &[0, 7],
        }
    }

    fn label(self, root: PitchClass) -> String {
        let suffix = match self {
            ChordQuality::Major => " Major",
            ChordQuality::Minor => "m",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::Power => "5",
        };
        format!("{root}{suffix}")
    }
}

/// One entry of the chord table.
#[derive(Debug, Clone)]
pub struct ChordShape {
    pub name: String,
    pub root: PitchClass,
    pub quality: ChordQuality,
    /// Bit `i` set when pitch class `i` belongs to the chord.
    mask: u16,
}

impl ChordShape {
    fn new(root: PitchClass, quality: ChordQuality) -> Self {
        let mask = quality
            .intervals()
            .iter()
            .fold(0u16, |mask, &step| mask | 1 << root.transpose(step).index());
        Self {
            name: quality.label(root),
            root,
            quality,
            mask,
        }
    }

    pub fn notes(&self) -> Vec<PitchClass> {
        PitchClass::ALL
            .into_iter()
            .filter(|class| self.mask & (1 << class.index()) != 0)
            .collect()
    }

    fn shared_with(&self, active: u16) -> usize {
        (self.mask & active).count_ones() as usize
    }
}

/// Every chord shape the recognizer knows, in priority order.
pub static CHORD_TABLE: Lazy<Vec<ChordShape>> = Lazy::new(|| {
    ChordQuality::ALL
        .into_iter()
        .flat_map(|quality| {
            PitchClass::ALL
                .into_iter()
                .map(move |root| ChordShape::new(root, quality))
        })
        .collect()
});

/// What the recognizer reports for the current window.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ChordLabel {
    /// Nothing heard within the window.
    #[default]
    None,
    /// Exactly one note is active and no chord matched.
    Note(PitchClass),
    /// Several notes are active but no chord matched.
    Notes(Vec<PitchClass>),
    /// A table entry matched, e.g. `"E Major"` or `"Am"`.
    Chord(String),
}

impl ChordLabel {
    pub fn is_chord(&self) -> bool {
        matches!(self, ChordLabel::Chord(_))
    }
}

impl fmt::Display for ChordLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordLabel::None => Ok(()),
            ChordLabel::Note(class) => write!(f, "{class}"),
            ChordLabel::Notes(classes) => {
                let names: Vec<&str> = classes.iter().map(|class| class.name()).collect();
                f.write_str(&names.join(", "))
            }
            ChordLabel::Chord(name) => f.write_str(name),
        }
    }
}

/// Windowed chord recognizer.
#[derive(Debug, Clone)]
pub struct ChordRecognizer {
    window: Duration,
    history: VecDeque<(PitchClass, Instant)>,
}

impl Default for ChordRecognizer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ChordRecognizer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            history: VecDeque::new(),
        }
    }

    /// Records a detection and evicts everything older than the window.
    pub fn observe(&mut self, class: PitchClass, now: Instant) {
        self.history.push_back((class, now));
        self.expire(now);
    }

    /// Evicts observations older than `now - window` without recording anything.
    pub fn expire(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.window) else {
            return;
        };
        while let Some(&(_, seen)) = self.history.front() {
            if seen >= cutoff {
                break;
            }
            self.history.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Distinct pitch classes in the window, ordered chromatically from C.
    pub fn active_notes(&self) -> Vec<PitchClass> {
        let mask = self.active_mask();
        PitchClass::ALL
            .into_iter()
            .filter(|class| mask & (1 << class.index()) != 0)
            .collect()
    }

    /// Names the active notes.
    pub fn label(&self) -> ChordLabel {
        let mask = self.active_mask();
        if let Some(shape) = best_match(mask) {
            return ChordLabel::Chord(shape.name.clone());
        }
        let mut notes = self.active_notes();
        match notes.len() {
            0 => ChordLabel::None,
            1 => ChordLabel::Note(notes.remove(0)),
            _ => ChordLabel::Notes(notes),
        }
    }

    fn active_mask(&self) -> u16 {
        self.history
            .iter()
            .fold(0u16, |mask, (class, _)| mask | 1 << class.index())
    }
}

/// Table entry sharing the most notes with `active`; earlier entries win ties.
fn best_match(active: u16) -> Option<&'static ChordShape> {
    let mut best: Option<(&ChordShape, usize)> = None;
    for shape in CHORD_TABLE.iter() {
        let shared = shape.shared_with(active);
        if best.is_none_or(|(_, top)| shared > top) {
            best = Some((shape, shared));
        }
    }
    best.filter(|(_, shared)| *shared >= MIN_MATCHES)
        .map(|(shape, _)| shape)
}

/// Names a set of pitch classes with no time window involved.
pub fn identify(notes: &[PitchClass]) -> Option<&'static str> {
    let mask = notes
        .iter()
        .fold(0u16, |mask, class| mask | 1 << class.index());
    best_match(mask).map(|shape| shape.name.as_str())
}
