//! # Audio Capture Module
//!
//! Live guitar input through CPAL (Cross-Platform Audio Library). Only built
//! with the `capture` feature.
//!
//! ## Features
//! - Default input device selection
//! - 32-bit float input at the device's preferred rate
//! - Downmix of multi-channel input to mono
//! - Fixed-size frames handed to a caller-supplied sink

use crate::MIN_FRAME_SIZE;
use crate::graph::StreamFormat;
use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};

/// Preferred capture rate when the device supports it.
pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// Starts capture from the default input device.
///
/// # Arguments
/// * `on_frame` - Called on the audio thread with each mono frame of
///   [`MIN_FRAME_SIZE`] samples and the capture rate. Must not block.
///
/// # Returns
/// * `Ok((stream, format))` - Running stream and the device's format
/// * `Err(e)` - No device, no float format, or the stream failed to start
pub fn start_input_capture<F>(mut on_frame: F) -> Result<(cpal::Stream, StreamFormat)>
where
    F: FnMut(Vec<f32>, u32) + Send + 'static,
{
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(supported.min_sample_rate().0, supported.max_sample_rate().0);
    let config: cpal::StreamConfig = supported.with_sample_rate(cpal::SampleRate(rate)).into();
    let format = StreamFormat::new(config.sample_rate.0, config.channels);
    let channels = usize::from(config.channels.max(1));
    let sample_rate = format.sample_rate;

    info!("Capturing {} Hz, {} ch", format.sample_rate, format.channels);

    let mut pending = Vec::with_capacity(MIN_FRAME_SIZE * 2);
    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend(
                data.chunks(channels)
                    .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32),
            );
            while pending.len() >= MIN_FRAME_SIZE {
                let frame: Vec<f32> = pending.drain(..MIN_FRAME_SIZE).collect();
                on_frame(frame, sample_rate);
            }
        },
        |err| warn!("Audio input stream error: {err}"),
        None,
    )?;

    stream.play()?;
    Ok((stream, format))
}

/// Picks the f32 configuration whose rate range lies closest to `target_rate`,
/// preferring fewer channels.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate_distance = if (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate) {
                0
            } else {
                let min_diff = c.min_sample_rate().0.abs_diff(target_rate);
                let max_diff = c.max_sample_rate().0.abs_diff(target_rate);
                min_diff.min(max_diff)
            };
            (rate_distance, c.channels())
        })
}
