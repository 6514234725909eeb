use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::store::{RateLimitStore, SweepStats};
use crate::config::MAX_RATE_DURATION;

/// Periodically purges stale client windows from a [`RateLimitStore`].
///
/// The admission check prunes a client's window only when that client sends
/// another request, so clients that go quiet would otherwise stay in the
/// store forever.
pub struct Reclaimer {
    store: Arc<RateLimitStore>,
    period: Duration,
}

impl Reclaimer {
    /// `period` is capped at [`MAX_RATE_DURATION`] so scheduling the next
    /// pass can never overflow the clock.
    pub fn new(store: Arc<RateLimitStore>, period: Duration) -> Self {
        if period > MAX_RATE_DURATION {
            warn!(
                requested_secs = period.as_secs(),
                capped_secs = MAX_RATE_DURATION.as_secs(),
                "Rate limiter cleanup period capped"
            );
        }
        Self {
            store,
            period: period.min(MAX_RATE_DURATION),
        }
    }

    /// Runs a single cleanup pass.
    ///
    /// Returns `None` if the pass panicked; the panic is logged and contained.
    pub fn reclaim_once(&self) -> Option<SweepStats> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.store.sweep())) {
            Ok(stats) => {
                debug!(
                    retained = stats.retained,
                    removed = stats.removed,
                    "Rate limiter cleanup completed"
                );
                Some(stats)
            }
            Err(cause) => {
                let reason = cause
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| cause.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(reason = %reason, "Rate limiter cleanup pass panicked");
                None
            }
        }
    }

    /// Spawns the cleanup loop. The first pass runs one full period after
    /// start; the loop ends once `shutdown` flips to `true` or its sender is
    /// dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(period_secs = self.period.as_secs(), "Rate limiter cleanup task started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.reclaim_once();
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Rate limiter cleanup task stopped");
        })
    }
}
