use riff_core::chord::{ChordLabel, ChordRecognizer};
use riff_core::pitch::{PitchDetector, PitchMethod, PitchRange};
use riff_core::tuning::{NoteMapper, PitchClass, note_frequency};
use riff_core::{AnalysisConfig, AnalysisError, AnalysisService, AnalysisSession, MIN_FRAME_SIZE};
use std::f32::consts::PI;
use std::time::{Duration, Instant};

fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

fn assert_round_trip(frequencies: &[f32], frame_len: usize) {
    for method in [PitchMethod::Direct, PitchMethod::Fft] {
        let mut detector = PitchDetector::new(PitchRange::default(), method);
        for sample_rate in [44_100, 48_000] {
            for &frequency in frequencies {
                let estimate = detector
                    .detect(&sine(frequency, sample_rate, frame_len), sample_rate)
                    .unwrap();
                let tolerance = frequency * frequency / sample_rate as f32;
                assert!(
                    (estimate.frequency - frequency).abs() <= tolerance,
                    "{method:?} @ {sample_rate} Hz, {frame_len} samples: {frequency} Hz estimated as {}",
                    estimate.frequency
                );
            }
        }
    }
}

#[test]
fn pitch_round_trip_within_one_lag() {
    assert_round_trip(&[246.94, 329.63, 440.0, 659.25, 987.77, 1318.5], MIN_FRAME_SIZE);
}

#[test]
fn low_strings_round_trip_with_longer_frames() {
    // raw sums favor short lags, so long periods need frames well beyond the minimum
    assert_round_trip(&[65.41, 82.41, 110.0, 146.83, 196.0], 65_536);
}

#[test]
fn frame_too_short_for_range_yields_no_estimate() {
    let mut detector = PitchDetector::default();
    // 48 kHz / 60 Hz = 800 lags, more than the frame holds
    assert!(detector.detect(&sine(220.0, 48_000, 700), 48_000).is_none());
}

#[test]
fn note_mapping_is_exact_on_the_grid() {
    let mapper = NoteMapper::new();
    let a4 = mapper.map(440.0).unwrap();
    assert_eq!((a4.name(), a4.octave), ("A", 4));
    assert!(a4.cents.abs() < 1e-3);

    let a3 = mapper.map(220.0).unwrap();
    assert_eq!((a3.name(), a3.octave), ("A", 3));
    assert!(a3.cents.abs() < 1e-3);

    // one semitone up is a new note, not a very sharp A
    let a_sharp = mapper.map(440.0 * 2.0_f32.powf(1.0 / 12.0)).unwrap();
    assert_eq!((a_sharp.name(), a_sharp.octave), ("A#", 4));
    assert!(a_sharp.cents.abs() < 0.01);

    for octave in 1..=6 {
        for class in PitchClass::ALL {
            let note = mapper.map(note_frequency(class, octave)).unwrap();
            assert_eq!((note.class, note.octave), (class, octave));
            assert!(note.cents.abs() < 0.01);
        }
    }
}

#[test]
fn chords_are_recognized_from_the_window() {
    let start = Instant::now();
    let mut recognizer = ChordRecognizer::default();
    for (i, class) in [PitchClass::E, PitchClass::GSharp, PitchClass::B].into_iter().enumerate() {
        recognizer.observe(class, start + Duration::from_millis(50 * i as u64));
    }
    assert_eq!(recognizer.label().to_string(), "E Major");

    let mut recognizer = ChordRecognizer::default();
    for class in [PitchClass::A, PitchClass::C, PitchClass::E, PitchClass::A] {
        recognizer.observe(class, start);
    }
    assert_eq!(recognizer.active_notes(), vec![PitchClass::C, PitchClass::E, PitchClass::A]);
    assert_eq!(recognizer.label().to_string(), "Am");

    let mut recognizer = ChordRecognizer::default();
    recognizer.observe(PitchClass::G, start);
    assert_eq!(recognizer.label(), ChordLabel::Note(PitchClass::G));
    assert_eq!(recognizer.label().to_string(), "G");
}

#[test]
fn stale_notes_leave_the_window_without_new_detections() {
    let start = Instant::now();
    let mut session = AnalysisSession::default();
    let e = session
        .process_frame(&sine(329.63, 48_000, MIN_FRAME_SIZE), 48_000, start)
        .unwrap();
    assert_eq!(e.active_notes, vec![PitchClass::E]);

    // silence after the window has elapsed
    let later = start + Duration::from_millis(600);
    let quiet = session
        .process_frame(&vec![0.0; MIN_FRAME_SIZE], 48_000, later)
        .unwrap();
    assert_eq!(quiet.pitch_hz, None);
    assert_eq!(quiet.confidence, 0.0);
    assert!(quiet.active_notes.is_empty());
    assert_eq!(quiet.chord, ChordLabel::None);
}

#[test]
fn out_of_range_pitch_is_rejected_without_touching_the_window() {
    let start = Instant::now();
    let config = AnalysisConfig::default().with_range(PitchRange::new(200.0, 1400.0));
    let mut session = AnalysisSession::new(&config);

    session
        .process_frame(&sine(440.0, 48_000, MIN_FRAME_SIZE), 48_000, start)
        .unwrap();
    let low = session
        .process_frame(&sine(110.0, 48_000, MIN_FRAME_SIZE), 48_000, start + Duration::from_millis(50))
        .unwrap();
    assert_eq!(low.pitch_hz, None);
    assert!(low.note.is_none());
    assert_eq!(low.active_notes, vec![PitchClass::A]);
}

#[test]
fn session_builds_a_chord_from_successive_frames() {
    let start = Instant::now();
    let mut session = AnalysisSession::default();
    let mut last = None;
    for (i, (class, octave)) in [(PitchClass::A, 3), (PitchClass::C, 4), (PitchClass::E, 4)]
        .into_iter()
        .enumerate()
    {
        let frame = sine(note_frequency(class, octave), 44_100, MIN_FRAME_SIZE);
        last = Some(
            session
                .process_frame(&frame, 44_100, start + Duration::from_millis(100 * i as u64))
                .unwrap(),
        );
    }
    let result = last.unwrap();
    assert_eq!(result.chord, ChordLabel::Chord("Am".into()));
    assert!(result.note.unwrap().is_in_tune());
}

#[test]
fn service_publishes_and_stops_on_request() {
    let config = AnalysisConfig::default().with_poll_interval(Duration::from_millis(5));
    let service = AnalysisService::spawn(config);
    let feeder = service.feeder();
    let latest = service.latest();
    assert!(latest.get().is_none());

    assert_eq!(feeder.feed(sine(440.0, 48_000, MIN_FRAME_SIZE), 48_000), Ok(true));

    let deadline = Instant::now() + Duration::from_secs(5);
    let result = loop {
        if let Some(result) = latest.get() {
            break result;
        }
        assert!(Instant::now() < deadline, "no result published");
        std::thread::sleep(Duration::from_millis(5));
    };
    let note = result.note.unwrap();
    assert_eq!((note.name(), note.octave), ("A", 4));
    assert!(service.is_running());

    service.join();
    let err = feeder.feed(sine(440.0, 48_000, MIN_FRAME_SIZE), 48_000);
    assert_eq!(err, Err(AnalysisError::ServiceStopped));
    // readers keep the last value after the service is gone
    assert!(latest.get().is_some());
}

#[test]
fn service_analyzes_only_the_newest_of_a_burst() {
    // long poll interval so the whole burst is queued before the first wake-up
    let config = AnalysisConfig::default()
        .with_poll_interval(Duration::from_millis(200))
        .with_queue_capacity(4);
    let service = AnalysisService::spawn(config);
    let feeder = service.feeder();

    let tones = [110.0, 220.0, 330.0, 440.0];
    for tone in tones {
        feeder.feed(sine(tone, 48_000, MIN_FRAME_SIZE), 48_000).unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while service.stats().analyzed() == 0 {
        assert!(Instant::now() < deadline, "burst never analyzed");
        std::thread::sleep(Duration::from_millis(10));
    }
    let result = service.latest().get().unwrap();
    assert_eq!(result.note.unwrap().name(), "A");
    assert_eq!(result.frame, 1);
    assert_eq!(service.stats().analyzed(), 1);
    assert_eq!(service.stats().skipped_stale(), 3);
}

#[test]
fn full_queue_makes_room_for_the_latest_frame() {
    let config = AnalysisConfig::default()
        .with_poll_interval(Duration::from_millis(200))
        .with_queue_capacity(1);
    let service = AnalysisService::spawn(config);
    let feeder = service.feeder();

    // E4 is queued first, then displaced by A4
    assert_eq!(feeder.feed(sine(329.63, 48_000, MIN_FRAME_SIZE), 48_000), Ok(true));
    assert_eq!(feeder.feed(sine(440.0, 48_000, MIN_FRAME_SIZE), 48_000), Ok(true));

    let deadline = Instant::now() + Duration::from_secs(5);
    while service.stats().analyzed() == 0 {
        assert!(Instant::now() < deadline, "queued frame never analyzed");
        std::thread::sleep(Duration::from_millis(10));
    }
    let note = service.latest().get().unwrap().note.unwrap();
    assert_eq!((note.name(), note.octave), ("A", 4));
    assert_eq!(service.stats().rejected_full(), 1);
    assert_eq!(service.stats().skipped_stale(), 0);
}
