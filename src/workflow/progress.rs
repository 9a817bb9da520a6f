//! Presentational progress replay
//!
//! The generate call is atomic: by the time it returns every document
//! exists. The replay counts `current` from 0 up to the generated total so the
//! operator still sees the batch advance. It reports nothing about the
//! backend's real progress and it cannot fail.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default delay between replay steps.
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationProgress {
    pub current: usize,
    pub total: usize,
}

impl GenerationProgress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    /// Whole-number percentage; 0 when there is nothing to generate.
    pub fn percentage(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        ((self.current as f64 / self.total as f64) * 100.0).round() as u64
    }
}

/// Paces the replay. Swapped for [`InstantTicker`] in tests.
#[async_trait]
pub trait Ticker: Send + Sync {
    async fn tick(&self);
}

/// Sleeps a fixed interval per tick.
pub struct IntervalTicker {
    interval: Duration,
}

impl IntervalTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for IntervalTicker {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Yields to the scheduler without waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantTicker;

#[async_trait]
impl Ticker for InstantTicker {
    async fn tick(&self) {
        tokio::task::yield_now().await;
    }
}

/// Receives generation progress for display.
pub trait ProgressSink: Send + Sync {
    /// Called once when the generate request is dispatched.
    fn started(&self, _total: usize) {}

    /// Called for every replay step.
    fn update(&self, progress: GenerationProgress);

    /// Called once the replay has finished.
    fn finished(&self, _progress: GenerationProgress) {}
}

/// Sink that discards everything.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&self, _progress: GenerationProgress) {}
}

/// Stops a running replay early.
#[derive(Debug, Clone, Default)]
pub struct ReplayHandle {
    stopped: Arc<AtomicBool>,
}

impl ReplayHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }
}

/// Ticks `current` from 0 to a generated total, one step per tick.
pub struct ProgressReplay {
    ticker: Arc<dyn Ticker>,
    handle: ReplayHandle,
}

impl ProgressReplay {
    pub fn new(ticker: Arc<dyn Ticker>) -> Self {
        Self {
            ticker,
            handle: ReplayHandle::default(),
        }
    }

    pub fn handle(&self) -> ReplayHandle {
        self.handle.clone()
    }

    /// Emit `0..=generated` to `sink`, waiting one tick before each step.
    ///
    /// A stopped replay skips the remaining ticks and emits `generated` once,
    /// so the last value seen is always the final count.
    pub async fn run(
        &self,
        generated: usize,
        total: usize,
        sink: &dyn ProgressSink,
    ) -> GenerationProgress {
        let mut last = None;
        for current in 0..=generated {
            if self.handle.is_stopped() {
                break;
            }
            self.ticker.tick().await;
            let progress = GenerationProgress::new(current, total);
            sink.update(progress);
            last = Some(current);
        }

        let done = GenerationProgress::new(generated, total);
        if last != Some(generated) {
            sink.update(done);
        }
        sink.finished(done);
        self.handle.reset();
        done
    }
}
