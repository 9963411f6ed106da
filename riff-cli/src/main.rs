// riff-cli/src/main.rs

//! Command-line host for the effects core.
//!
//! By default it plays a synthesized riff through the pedalboard while the
//! analysis service listens to the dry signal, logging the detected notes and
//! chords along with every chain edit. With the `capture` feature it can
//! listen to the default input device instead.

mod synth;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use riff_core::pitch::{PitchMethod, PitchRange};
use riff_core::{
    AnalysisConfig, AnalysisResult, AnalysisService, ChainEvent, EffectKind, MIN_FRAME_SIZE,
    Pedalboard, StreamFormat, presets,
};
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "riff")]
#[command(about = "Guitar effect chain and pitch/chord analysis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// A4 reference in Hz
    #[arg(long, global = true, default_value = "440")]
    reference: f32,

    /// Autocorrelation method
    #[arg(long, global = true, value_enum, default_value = "direct")]
    method: Method,

    /// Lowest frequency to detect, in Hz
    #[arg(long, global = true, default_value = "60")]
    min_freq: f32,

    /// Highest frequency to detect, in Hz
    #[arg(long, global = true, default_value = "1400")]
    max_freq: f32,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a synthesized riff through the chain and analyze it
    Demo {
        #[arg(long, default_value = "48000")]
        sample_rate: u32,

        /// Factory preset to load before playing
        #[arg(long)]
        preset: Option<String>,

        /// Playback speed; 0 renders as fast as possible
        #[arg(long, default_value = "1.0")]
        speed: f32,
    },

    /// List factory presets
    Presets,

    /// Analyze the default input device until interrupted
    #[cfg(feature = "capture")]
    Listen {
        /// Seconds to listen for; 0 runs forever
        #[arg(long, default_value = "0")]
        seconds: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Direct,
    Fft,
}

impl From<Method> for PitchMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Direct => PitchMethod::Direct,
            Method::Fft => PitchMethod::Fft,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AnalysisConfig::default()
        .with_range(PitchRange::new(cli.min_freq, cli.max_freq))
        .with_method(cli.method.into())
        .with_reference(cli.reference);

    match cli.command {
        None => run_demo(config, 48_000, None, 1.0),
        Some(Commands::Demo {
            sample_rate,
            preset,
            speed,
        }) => run_demo(config, sample_rate, preset.as_deref(), speed),
        Some(Commands::Presets) => {
            for preset in presets::FACTORY {
                let kinds: Vec<String> = preset
                    .build()
                    .iter()
                    .map(|node| {
                        if node.enabled {
                            node.kind.to_string()
                        } else {
                            format!("({})", node.kind)
                        }
                    })
                    .collect();
                println!("{:<8} {}", preset.name, kinds.join(" → "));
            }
            Ok(())
        }
        #[cfg(feature = "capture")]
        Some(Commands::Listen { seconds }) => run_listen(config, seconds),
    }
}

fn run_demo(config: AnalysisConfig, sample_rate: u32, preset: Option<&str>, speed: f32) -> Result<()> {
    let board = Pedalboard::default();
    let events = board.subscribe();
    let event_logger = thread::spawn(move || {
        for event in events {
            log_event(&event);
        }
    });

    board.attach_source(StreamFormat::new(sample_rate, 1))?;
    board.start().context("starting the engine")?;
    if let Some(name) = preset {
        if board.apply_named_preset(name)?.is_none() {
            let known: Vec<&str> = presets::names().collect();
            anyhow::bail!("unknown preset '{name}' (known: {})", known.join(", "));
        }
    }

    let service = AnalysisService::spawn(config);
    let feeder = service.feeder();
    let latest = service.latest();

    let audio = synth::render(&synth::default_riff(), sample_rate);
    let frame_time = Duration::from_secs_f32(MIN_FRAME_SIZE as f32 / sample_rate as f32);
    let frame_count = audio.len() / MIN_FRAME_SIZE;
    info!("Playing {frame_count} frames at {sample_rate} Hz");

    let mut last_label = String::new();
    let mut wet_peak = 0.0f32;
    for (index, dry) in audio.chunks_exact(MIN_FRAME_SIZE).enumerate() {
        // exercise the chain while audio is flowing
        if index == frame_count / 3 {
            board.add(EffectKind::Chorus)?;
        }
        if index == frame_count / 2 {
            if let Some(id) = board.nodes().first().map(|node| node.id) {
                board.toggle(id)?;
            }
        }
        if index == 2 * frame_count / 3 {
            let last = board.nodes().len().saturating_sub(1);
            board.move_node(last, 0)?;
        }

        let mut wet = dry.to_vec();
        board.process_block(&mut wet);
        wet_peak = wet.iter().fold(wet_peak, |peak, s| peak.max(s.abs()));

        feeder.feed(dry.to_vec(), sample_rate)?;
        if speed > 0.0 {
            thread::sleep(frame_time.div_f32(speed));
        } else {
            thread::sleep(config.poll_interval);
        }

        if let Some(result) = latest.get() {
            let label = describe(&result);
            if label != last_label {
                info!("{label}");
                last_label = label;
            }
        }
    }

    info!(
        "Done: {} frames analyzed, {} stale, {} dropped, wet peak {wet_peak:.2}",
        service.stats().analyzed(),
        service.stats().skipped_stale(),
        service.stats().rejected_full()
    );
    service.join();
    board.stop();
    drop(board);
    if event_logger.join().is_err() {
        warn!("Event logger thread panicked");
    }
    Ok(())
}

#[cfg(feature = "capture")]
fn run_listen(config: AnalysisConfig, seconds: u64) -> Result<()> {
    use std::time::Instant;

    let service = AnalysisService::spawn(config);
    let feeder = service.feeder();
    let latest = service.latest();

    let (stream, format) = riff_core::audio::start_input_capture(move |frame, sample_rate| {
        // the audio thread never blocks; a full queue evicts its oldest frame
        let _ = feeder.feed(frame, sample_rate);
    })?;
    info!("Listening at {} Hz", format.sample_rate);

    let started = Instant::now();
    let mut last_label = String::new();
    loop {
        if seconds > 0 && started.elapsed() >= Duration::from_secs(seconds) {
            break;
        }
        thread::sleep(Duration::from_millis(50));
        if let Some(result) = latest.get() {
            let label = describe(&result);
            if label != last_label {
                info!("{label}");
                last_label = label;
            }
        }
    }

    drop(stream);
    service.join();
    Ok(())
}

fn describe(result: &AnalysisResult) -> String {
    let heard = if result.chord.is_chord() { "chord" } else { "notes" };
    match (&result.note, result.pitch_hz) {
        (Some(note), Some(hz)) => format!(
            "{hz:7.1} Hz  {note}  conf {:.2}  {}  {heard}: {}",
            result.confidence,
            if note.is_in_tune() { "in tune" } else { "" },
            result.chord
        ),
        _ => format!("no pitch  {heard}: {}", result.chord),
    }
}

fn log_event(event: &ChainEvent) {
    let chain: Vec<String> = event
        .nodes
        .iter()
        .map(|node| {
            if node.enabled {
                node.kind.to_string()
            } else {
                format!("({})", node.kind)
            }
        })
        .collect();
    info!(
        "Chain {:?}: {} [engine {}]",
        event.reconciliation,
        chain.join(" → "),
        if event.engine_running { "running" } else { "stopped" }
    );
}
