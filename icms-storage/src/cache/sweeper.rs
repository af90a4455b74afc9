//! Background sweep lifecycle.
//!
//! The sweep task holds only a weak reference to the cache, so dropping the
//! last `Arc` ends it even if `stop()` was never called.

use std::sync::{Arc, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::ttl::TtlCache;

/// Running sweep task and its shutdown signal.
pub(crate) struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Start the periodic sweep on the current tokio runtime.
    ///
    /// Returns false if a sweep is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let every = self.config().sweep_interval;
        let task = tokio::spawn(sweep_task(Arc::downgrade(self), every, shutdown_rx));

        *slot = Some(SweeperHandle { shutdown_tx, task });
        true
    }

    /// Signal the sweep to stop and wait for it to finish.
    ///
    /// Returns false if no sweep was running.
    pub async fn stop(&self) -> bool {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(handle) = handle else {
            return false;
        };

        let _ = handle.shutdown_tx.send(true);
        if let Err(e) = handle.task.await {
            tracing::warn!(error = %e, "Cache sweep task ended abnormally");
        }
        true
    }

    /// Whether a sweep task is currently registered.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

async fn sweep_task<V: Clone + Send + Sync + 'static>(
    cache: Weak<TtlCache<V>>,
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; skip it so the first sweep runs
    // one full interval after start.
    ticker.tick().await;

    tracing::info!(interval_secs = every.as_secs(), "Cache sweep task started");

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }

            _ = ticker.tick() => {
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, remaining = cache.len(), "Swept expired cache entries");
                }
            }
        }
    }

    tracing::info!("Cache sweep task stopped");
}
