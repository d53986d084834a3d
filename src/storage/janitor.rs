//! Background Janitor
//!
//! Reads treat expired entries as absent but leave them in place. If an
//! expired key is never written or deleted again it would stay in memory
//! forever, so the janitor periodically sweeps every shard and physically
//! removes what has expired.
//!
//! ## Lifecycle
//!
//! ```text
//!   Idle ──(positive cleanup interval)──> Running ──(stop / last handle dropped)──> Stopped
//! ```
//!
//! - The task owns an `Arc` of the shard table, never the outward
//!   [`Cache`](crate::Cache) handle, so dropping the last handle drops the
//!   [`Janitor`] and signals the task to exit.
//! - Ticks that fire while a sweep is still running are skipped, never queued.
//! - A sweep in progress runs to completion; stopping only prevents future
//!   sweeps.
//! - The task always runs on its own `cache-janitor` thread driving a
//!   current-thread runtime, so it outlives any runtime the cache was built
//!   in and never competes with the caller's tasks.
//! - Periods longer than [`MAX_SWEEP_PERIOD`] are clamped to it.

use crate::storage::shard::ShardTable;
use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::runtime;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// Longest period between two sweeps (one year).
///
/// Longer cleanup intervals are clamped so the first deadline always fits in
/// an `Instant`.
pub const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Observable state of a cache's janitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JanitorState {
    /// No janitor was requested (cleanup interval of zero)
    Idle,
    /// Sweeping on a fixed interval
    Running,
    /// Stopped for good; a new cache is needed to sweep again
    Stopped,
}

/// A handle to the running janitor task.
///
/// When this handle is dropped, the task will be stopped.
#[derive(Debug)]
pub(crate) struct Janitor {
    interval: Duration,
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl Janitor {
    /// Starts sweeping `table` every `interval`.
    ///
    /// `interval` must be non-zero.
    pub(crate) fn start<V>(table: Arc<ShardTable<V>>, interval: Duration) -> Self
    where
        V: Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let period = interval.min(MAX_SWEEP_PERIOD);
        if period < interval {
            warn!(
                requested_ms = interval.as_millis() as u64,
                period_ms = period.as_millis() as u64,
                "Cleanup interval clamped"
            );
        }

        spawn_janitor_thread(janitor_loop(table, period, shutdown_rx));

        info!(
            interval_ms = interval.as_millis() as u64,
            "Cache janitor started"
        );

        Self {
            interval,
            shutdown_tx,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Signals the task to exit. Calling this more than once is a no-op.
    pub(crate) fn stop(&self) {
        if !self.shutdown_tx.send_replace(true) {
            info!("Cache janitor stopped");
        }
    }

    pub(crate) fn state(&self) -> JanitorState {
        // The receiver is dropped once the task has exited for any reason
        if *self.shutdown_tx.borrow() || self.shutdown_tx.is_closed() {
            JanitorState::Stopped
        } else {
            JanitorState::Running
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_janitor_thread<F>(task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name("cache-janitor".to_string())
        .spawn(move || {
            match runtime::Builder::new_current_thread().enable_time().build() {
                Ok(rt) => rt.block_on(task),
                Err(err) => {
                    error!(error = %err, "Failed to build cache janitor runtime");
                }
            }
        });

    if let Err(err) = spawned {
        error!(error = %err, "Failed to spawn cache janitor thread");
    }
}

/// The main janitor loop.
async fn janitor_loop<V>(
    table: Arc<ShardTable<V>>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let start = time::Instant::now()
        .checked_add(period)
        .unwrap_or_else(time::Instant::now);
    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Cache janitor received shutdown signal");
                    return;
                }
                continue;
            }
        }

        let started = std::time::Instant::now();
        let removed = table.delete_expired();

        if removed > 0 {
            debug!(
                removed = removed,
                remaining = table.item_count(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "Expired entries swept"
            );
        } else {
            trace!("Sweep found no expired entries");
        }
    }
}
