//! # Analysis Service Module
//!
//! Runs an [`AnalysisSession`] on a dedicated thread.
//!
//! Frames enter through a [`FrameFeeder`] backed by a bounded channel; when the
//! queue is full the oldest queued frame makes room for the new one, so the
//! audio side never blocks and the worker always sees the latest audio.
//! The worker wakes every poll interval (or immediately on shutdown), drains
//! the queue keeping only the newest frame, analyzes it and publishes the
//! result to a [`LatestResult`] that any number of readers can poll.

use crate::session::{AnalysisConfig, AnalysisError, AnalysisSession};
use crate::{AnalysisResult, MIN_FRAME_SIZE};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// One mono frame on its way to the analysis thread.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub captured_at: Instant,
}

/// Shared, read-mostly handle on the newest analysis result.
#[derive(Debug, Clone, Default)]
pub struct LatestResult(Arc<RwLock<Option<AnalysisResult>>>);

impl LatestResult {
    /// A copy of the newest result, or `None` before the first frame.
    pub fn get(&self) -> Option<AnalysisResult> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, result: AnalysisResult) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(result);
    }
}

/// Frame counters, updated by both the feeder and the worker.
#[derive(Debug, Default)]
pub struct ServiceStats {
    queued: AtomicU64,
    rejected_full: AtomicU64,
    skipped_stale: AtomicU64,
    analyzed: AtomicU64,
}

impl ServiceStats {
    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    /// Queued frames evicted to make room for a newer one.
    pub fn rejected_full(&self) -> u64 {
        self.rejected_full.load(Ordering::Relaxed)
    }

    /// Frames superseded by a newer one before the worker got to them.
    pub fn skipped_stale(&self) -> u64 {
        self.skipped_stale.load(Ordering::Relaxed)
    }

    pub fn analyzed(&self) -> u64 {
        self.analyzed.load(Ordering::Relaxed)
    }
}

/// Ingress for frames. Cheap to clone; hand one to the audio callback.
#[derive(Debug, Clone)]
pub struct FrameFeeder {
    tx: Sender<AudioFrame>,
    // lets the producer evict the oldest frame when the queue is full
    evict: Receiver<AudioFrame>,
    stopped: Arc<AtomicBool>,
    stats: Arc<ServiceStats>,
}

impl FrameFeeder {
    /// Queues a frame without blocking.
    ///
    /// # Returns
    /// * `Ok(true)` - Frame queued, possibly after evicting the oldest one
    /// * `Ok(false)` - Queue still full after eviction (another producer won)
    /// * `Err(AnalysisError)` - Frame unusable, or the service has stopped
    pub fn feed(&self, samples: Vec<f32>, sample_rate: u32) -> Result<bool, AnalysisError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(AnalysisError::ServiceStopped);
        }
        if samples.len() < MIN_FRAME_SIZE {
            return Err(AnalysisError::FrameTooShort {
                expected: MIN_FRAME_SIZE,
                got: samples.len(),
            });
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate);
        }
        let frame = AudioFrame {
            samples,
            sample_rate,
            captured_at: Instant::now(),
        };
        let frame = match self.tx.try_send(frame) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
                return Ok(true);
            }
            Err(TrySendError::Full(frame)) => frame,
            Err(TrySendError::Disconnected(_)) => return Err(AnalysisError::ServiceStopped),
        };

        if self.evict.try_recv().is_ok() {
            self.stats.rejected_full.fetch_add(1, Ordering::Relaxed);
        }
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(TrySendError::Full(_)) => {
                self.stats.rejected_full.fetch_add(1, Ordering::Relaxed);
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(AnalysisError::ServiceStopped),
        }
    }
}

/// Background analysis loop with cooperative cancellation.
pub struct AnalysisService {
    feeder: FrameFeeder,
    latest: LatestResult,
    stats: Arc<ServiceStats>,
    shutdown_tx: Sender<()>,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AnalysisService {
    /// Starts the worker thread.
    pub fn spawn(config: AnalysisConfig) -> Self {
        let (frame_tx, frame_rx) = bounded::<AudioFrame>(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let stats = Arc::new(ServiceStats::default());
        let latest = LatestResult::default();
        let stopped = Arc::new(AtomicBool::new(false));

        let feeder = FrameFeeder {
            tx: frame_tx,
            evict: frame_rx.clone(),
            stopped: Arc::clone(&stopped),
            stats: Arc::clone(&stats),
        };
        let worker_latest = latest.clone();
        let worker_stats = Arc::clone(&stats);
        let worker_stopped = Arc::clone(&stopped);
        let handle = thread::spawn(move || {
            run_worker(config, frame_rx, shutdown_rx, worker_latest, worker_stats);
            worker_stopped.store(true, Ordering::Release);
        });

        Self {
            feeder,
            latest,
            stats,
            shutdown_tx,
            stopped,
            handle: Some(handle),
        }
    }

    pub fn feeder(&self) -> FrameFeeder {
        self.feeder.clone()
    }

    pub fn latest(&self) -> LatestResult {
        self.latest.clone()
    }

    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Asks the worker to stop. Takes effect at its next wake-up.
    pub fn shutdown(&self) {
        // a full channel means a stop request is already pending
        let _ = self.shutdown_tx.try_send(());
    }

    /// Stops the worker and waits for it to exit.
    pub fn join(mut self) {
        self.stop_and_wait();
    }

    fn stop_and_wait(&mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Analysis thread panicked");
            }
        }
        self.stopped.store(true, Ordering::Release);
    }
}

impl Drop for AnalysisService {
    fn drop(&mut self) {
        self.stop_and_wait();
    }
}

fn run_worker(
    config: AnalysisConfig,
    frames: Receiver<AudioFrame>,
    shutdown: Receiver<()>,
    latest: LatestResult,
    stats: Arc<ServiceStats>,
) {
    info!("Analysis thread started");
    let mut session = AnalysisSession::new(&config);

    loop {
        select! {
            recv(shutdown) -> _ => {
                info!("Analysis thread received shutdown signal");
                break;
            },
            default(config.poll_interval) => {},
        }

        let Some((frame, skipped)) = newest_frame(&frames) else {
            continue;
        };
        if skipped > 0 {
            debug!("Skipped {skipped} stale frames");
            stats.skipped_stale.fetch_add(skipped, Ordering::Relaxed);
        }

        match session.process_frame(&frame.samples, frame.sample_rate, frame.captured_at) {
            Ok(result) => {
                latest.publish(result);
                stats.analyzed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => warn!("Dropping frame: {err}"),
        }
    }
    info!("Analysis thread finished");
}

/// Drains everything queued and returns the newest frame with the number of
/// older frames discarded on the way.
fn newest_frame(frames: &Receiver<AudioFrame>) -> Option<(AudioFrame, u64)> {
    let mut newest = frames.try_recv().ok()?;
    let mut skipped = 0;
    while let Ok(frame) = frames.try_recv() {
        newest = frame;
        skipped += 1;
    }
    Some((newest, skipped))
}
