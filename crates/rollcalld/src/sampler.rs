//! Frame sampler: the periodic detect → match → notify loop.
//!
//! Waits for the video source to report positive dimensions, then ticks on
//! a fixed period. Each tick runs as its own task so a slow detection never
//! delays the next tick; at most `max_inflight` ticks run at once and a
//! tick that finds no free slot is skipped.

use crate::sink::PresentationSink;
use chrono::Utc;
use rollcall_core::{FaceAnalyzer, MatchResult, Matcher, ReferenceSet, SourceError, VideoSource};
use rollcall_notify::Notifier;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(#[source] SourceError),
    #[error("video reported invalid dimensions {width}x{height}")]
    NotReady { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub interval: Duration,
    pub max_inflight: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_inflight: 4,
        }
    }
}

/// Everything a tick needs. Shared read-only between tick tasks.
pub struct Sampler {
    source: Arc<dyn VideoSource>,
    analyzer: Arc<dyn FaceAnalyzer>,
    matcher: Arc<dyn Matcher + Send + Sync>,
    references: Arc<ReferenceSet>,
    notifier: Notifier,
    sink: Arc<dyn PresentationSink>,
}

/// Handle to a running sampler. Dropping it stops future ticks.
#[derive(Debug)]
pub struct SamplerHandle {
    stop_tx: watch::Sender<bool>,
    ticks: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
    join: JoinHandle<()>,
}

impl SamplerHandle {
    /// Stop scheduling ticks. Ticks already in flight run to completion.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Wait for the tick loop to exit after [`stop`](Self::stop).
    pub async fn join(self) {
        self.stop();
        let _ = self.join.await;
    }

    /// Ticks scheduled so far, including skipped ones.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Ticks that ran to completion.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }
}

impl Sampler {
    pub fn new(
        source: Arc<dyn VideoSource>,
        analyzer: Arc<dyn FaceAnalyzer>,
        matcher: Arc<dyn Matcher + Send + Sync>,
        references: Arc<ReferenceSet>,
        notifier: Notifier,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        Self {
            source,
            analyzer,
            matcher,
            references,
            notifier,
            sink,
        }
    }

    /// Wait for the video source, then start ticking.
    ///
    /// Camera failures are reported to the sink and returned; nothing is
    /// retried. A source that reports ready with a zero dimension breaks the
    /// [`VideoSource::wait_ready`] contract and fails with
    /// [`SamplerError::NotReady`].
    pub async fn start(self, config: SamplerConfig) -> Result<SamplerHandle, SamplerError> {
        let (width, height) = match self.source.wait_ready().await {
            Ok(dims) => dims,
            Err(err) => {
                let err = SamplerError::CameraUnavailable(err);
                self.sink.on_error(&err);
                return Err(err);
            }
        };
        if width == 0 || height == 0 {
            let err = SamplerError::NotReady { width, height };
            self.sink.on_error(&err);
            return Err(err);
        }

        tracing::info!(
            width,
            height,
            interval_ms = config.interval.as_millis() as u64,
            references = self.references.len(),
            "sampler started"
        );

        let shared = Arc::new(self);
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let ticks = Arc::new(AtomicU64::new(0));
        let completed = Arc::new(AtomicU64::new(0));
        let slots = Arc::new(Semaphore::new(config.max_inflight.max(1)));

        let loop_ticks = Arc::clone(&ticks);
        let loop_completed = Arc::clone(&completed);
        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // Err means every handle is gone: treat as stop.
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = interval.tick() => {}
                }

                let seq = loop_ticks.fetch_add(1, Ordering::Relaxed) + 1;
                let Ok(slot) = Arc::clone(&slots).try_acquire_owned() else {
                    tracing::debug!(tick = seq, "all tick slots busy; skipping tick");
                    continue;
                };

                let sampler = Arc::clone(&shared);
                let completed = Arc::clone(&loop_completed);
                tokio::spawn(async move {
                    sampler.run_tick(seq).await;
                    completed.fetch_add(1, Ordering::Relaxed);
                    drop(slot);
                });
            }
            tracing::info!("sampler stopped");
        });

        Ok(SamplerHandle {
            stop_tx,
            ticks,
            completed,
            join,
        })
    }

    /// One tick: capture, detect, match, present, notify.
    ///
    /// Every failure degrades to an empty tick.
    pub async fn run_tick(&self, seq: u64) -> Vec<MatchResult> {
        let frame = match self.source.capture().await {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(tick = seq, error = %err, "frame capture failed");
                return Vec::new();
            }
        };

        if !frame.has_valid_dimensions() {
            tracing::debug!(tick = seq, width = frame.width, height = frame.height, "frame has no dimensions yet");
            return Vec::new();
        }

        let detections = match self.analyzer.detect_all(&frame).await {
            Ok(detections) => detections,
            Err(err) => {
                tracing::warn!(tick = seq, error = %err, "detection failed; treating tick as empty");
                Vec::new()
            }
        };

        let results: Vec<MatchResult> = detections
            .iter()
            .map(|d| self.matcher.find_best_match(d, &self.references))
            .collect();

        tracing::trace!(tick = seq, faces = results.len(), "tick matched");
        self.sink.on_results(&frame, &results);

        let now = Utc::now();
        for result in &results {
            self.notifier.notify(result, now);
        }

        results
    }
}
