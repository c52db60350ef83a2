//! Cosmetic progress while a beautify call is in flight.
//!
//! The server gives no progress information, so the client advances a bar by
//! random steps until the call returns. The ticker only produces steps; the
//! caller decides what to do with them and whether to keep going.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ClientConfig;

/// Shared flag that tells a background task to stop.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only ends on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Ticker timing and step size.
#[derive(Debug, Clone, Copy)]
pub struct TickerSettings {
    pub interval: Duration,
    /// Steps are drawn from `[0, step_max)`
    pub step_max: f32,
    pub ceiling: f32,
}

impl From<&ClientConfig> for TickerSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.progress_interval_ms),
            step_max: config.progress_step_max,
            ceiling: config.progress_ceiling,
        }
    }
}

/// A running progress task.
pub struct ProgressTicker {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    /// Start calling `on_step` every `settings.interval` with a random step.
    ///
    /// The task ends when cancelled or when `on_step` returns `false`.
    pub fn spawn<F>(settings: TickerSettings, mut on_step: F) -> Self
    where
        F: FnMut(f32) -> bool + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();
        let step_max = settings.step_max.max(f32::EPSILON);

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(settings.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            timer.tick().await;

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = timer.tick() => {
                        let step = rand::thread_rng().gen_range(0.0..step_max);
                        if !on_step(step) {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Cancel the task and wait for it to finish.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
