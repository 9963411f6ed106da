//! # Musical Tuning Module
//!
//! Maps frequencies onto twelve-tone equal temperament and back.
//!
//! ## Features
//! - Pitch classes with sharp names and flat-tolerant parsing
//! - Nearest-note mapping with octave and cent deviation
//! - Configurable A4 reference (440 Hz by default)
//! - Note frequency synthesis for test tones

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard concert pitch for A4.
pub const A4_REFERENCE_HZ: f32 = 440.0;

/// MIDI number of A4.
const A4_MIDI: f32 = 69.0;

/// Deviation under which a note counts as in tune.
pub const IN_TUNE_CENTS: f32 = 10.0;

/// One of the twelve pitch classes, ordered chromatically from C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wraps any semitone offset into a pitch class.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// The class `semitones` above this one.
    pub fn transpose(self, semitones: i32) -> Self {
        Self::from_index(self.index() as i32 + semitones)
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Parses a note letter with an optional `#` or `b` accidental.
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.trim().chars();
        let base = match chars.next()?.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };
        let offset = match chars.as_str() {
            "" => 0,
            "#" | "♯" => 1,
            "b" | "♭" => -1,
            _ => return None,
        };
        Some(Self::from_index(base + offset))
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The nearest equal-tempered note to a measured frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub class: PitchClass,
    /// Scientific octave; C4 is middle C.
    pub octave: i32,
    /// Signed deviation from the note, in `[-50, 50]`. Positive is sharp.
    pub cents: f32,
}

impl Note {
    /// Note name without the octave, e.g. `"C#"`.
    pub fn name(&self) -> &'static str {
        self.class.name()
    }

    pub fn is_in_tune(&self) -> bool {
        self.cents.abs() < IN_TUNE_CENTS
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} ({:+.1} cents)", self.class, self.octave, self.cents)
    }
}

/// Converts frequencies to notes against a fixed A4 reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteMapper {
    reference_hz: f32,
}

impl Default for NoteMapper {
    fn default() -> Self {
        Self {
            reference_hz: A4_REFERENCE_HZ,
        }
    }
}

impl NoteMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `reference_hz` as A4. Non-positive or non-finite references are ignored.
    pub fn with_reference(mut self, reference_hz: f32) -> Self {
        if reference_hz.is_finite() && reference_hz > 0.0 {
            self.reference_hz = reference_hz;
        }
        self
    }

    pub fn reference_hz(&self) -> f32 {
        self.reference_hz
    }

    /// Finds the nearest note to `frequency`.
    ///
    /// # Arguments
    /// * `frequency` - Measured frequency in Hz
    ///
    /// # Returns
    /// * `Some(note)` - Nearest note with its cent deviation
    /// * `None` - Frequency was zero, negative, or not finite
    pub fn map(&self, frequency: f32) -> Option<Note> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return None;
        }
        let semitones = 12.0 * (frequency / self.reference_hz).log2();
        let midi = A4_MIDI + semitones;
        let nearest = midi.round();
        let nearest_int = nearest as i32;
        let class = PitchClass::from_index(nearest_int);
        let octave = nearest_int.div_euclid(12) - 1;
        Some(Note {
            class,
            octave,
            cents: cents_between(frequency, self.frequency_of(class, octave)),
        })
    }

    /// Frequency of `class` in `octave` under this mapper's reference.
    pub fn frequency_of(&self, class: PitchClass, octave: i32) -> f32 {
        let midi = (octave + 1) * 12 + class.index() as i32;
        self.reference_hz * 2.0_f32.powf((midi as f32 - A4_MIDI) / 12.0)
    }
}

/// Equal-tempered frequency of a note with A4 at 440 Hz.
pub fn note_frequency(class: PitchClass, octave: i32) -> f32 {
    NoteMapper::default().frequency_of(class, octave)
}

/// Deviation of `frequency` from `target` in cents.
pub fn cents_between(frequency: f32, target: f32) -> f32 {
    1200.0 * (frequency / target).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concert_a_maps_exactly() {
        let note = NoteMapper::new().map(440.0).unwrap();
        assert_eq!(note.class, PitchClass::A);
        assert_eq!(note.octave, 4);
        assert!(note.cents.abs() < 1e-3);
        assert!(note.is_in_tune());
    }

    #[test]
    fn octave_rolls_over_at_c() {
        let mapper = NoteMapper::new();
        let b3 = mapper.map(note_frequency(PitchClass::B, 3)).unwrap();
        let c4 = mapper.map(note_frequency(PitchClass::C, 4)).unwrap();
        assert_eq!((b3.class, b3.octave), (PitchClass::B, 3));
        assert_eq!((c4.class, c4.octave), (PitchClass::C, 4));
    }

    #[test]
    fn invalid_frequencies_map_to_nothing() {
        let mapper = NoteMapper::new();
        assert!(mapper.map(0.0).is_none());
        assert!(mapper.map(-10.0).is_none());
        assert!(mapper.map(f32::NAN).is_none());
        assert!(mapper.map(f32::INFINITY).is_none());
    }

    #[test]
    fn cents_sign_follows_detuning() {
        let mapper = NoteMapper::new();
        let sharp = mapper.map(440.0 * 2.0_f32.powf(20.0 / 1200.0)).unwrap();
        assert_eq!(sharp.class, PitchClass::A);
        assert!((sharp.cents - 20.0).abs() < 0.05);
        assert!(!sharp.is_in_tune());
        assert!((cents_between(440.0, 880.0) + 1200.0).abs() < 1e-3);
    }

    #[test]
    fn reference_shifts_the_grid() {
        let mapper = NoteMapper::new().with_reference(432.0);
        let note = mapper.map(432.0).unwrap();
        assert_eq!((note.class, note.octave), (PitchClass::A, 4));
        assert_eq!(NoteMapper::new().with_reference(-1.0).reference_hz(), 440.0);
    }

    #[test]
    fn names_parse_with_accidentals() {
        assert_eq!(PitchClass::from_name("F#"), Some(PitchClass::FSharp));
        assert_eq!(PitchClass::from_name("Bb"), Some(PitchClass::ASharp));
        assert_eq!(PitchClass::from_name("Cb"), Some(PitchClass::B));
        assert_eq!(PitchClass::from_name("H"), None);
        assert_eq!(PitchClass::E.transpose(7), PitchClass::B);
    }
}
