use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

use super::clock::{Clock, SystemClock};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Summary of one cleanup pass over the store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub retained: usize,
    pub removed: usize,
}

/// Admitted request timestamps for one client, oldest first.
#[derive(Debug, Default, Clone)]
pub struct ClientWindow {
    timestamps: VecDeque<Instant>,
}

impl ClientWindow {
    fn starting_at(now: Instant) -> Self {
        Self {
            timestamps: VecDeque::from([now]),
        }
    }

    /// Drops every timestamp older than `window` relative to `now`.
    ///
    /// A timestamp later than `now` counts as zero elapsed time and is kept.
    fn prune(&mut self, now: Instant, window: Duration) {
        self.timestamps
            .retain(|ts| now.saturating_duration_since(*ts) <= window);
    }

    fn record(&mut self, now: Instant) {
        self.timestamps.push_back(now);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Sliding-window request log for every client seen by the server.
///
/// All reads and writes go through one mutex, shared by the admission check
/// and the background reclaimer.
pub struct RateLimitStore {
    clients: Mutex<HashMap<String, ClientWindow>>,
    max_requests: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimitStore {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            max_requests: config.max_requests,
            window: config.window,
            clock,
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decides whether `client_id` may make another request right now and
    /// records it when allowed.
    pub fn evaluate(&self, client_id: &str) -> Decision {
        let mut clients = self.lock();
        let now = self.clock.now();
        Self::admit(&mut clients, client_id, now, self.max_requests, self.window)
    }

    /// Same as [`evaluate`](Self::evaluate) with an explicit reading of the clock.
    #[cfg(test)]
    pub fn evaluate_at(&self, client_id: &str, now: Instant) -> Decision {
        let mut clients = self.lock();
        Self::admit(&mut clients, client_id, now, self.max_requests, self.window)
    }

    fn admit(
        clients: &mut HashMap<String, ClientWindow>,
        client_id: &str,
        now: Instant,
        max_requests: usize,
        window: Duration,
    ) -> Decision {
        let Some(entry) = clients.get_mut(client_id) else {
            clients.insert(client_id.to_owned(), ClientWindow::starting_at(now));
            return Decision::Allow;
        };

        entry.prune(now, window);
        if entry.len() >= max_requests {
            return Decision::Deny;
        }

        entry.record(now);
        Decision::Allow
    }

    /// Prunes every client window and removes clients with nothing left.
    pub fn sweep(&self) -> SweepStats {
        let mut clients = self.lock();
        let now = self.clock.now();
        Self::reclaim(&mut clients, now, self.window)
    }

    fn reclaim(
        clients: &mut HashMap<String, ClientWindow>,
        now: Instant,
        window: Duration,
    ) -> SweepStats {
        let before = clients.len();
        clients.retain(|_, entry| {
            entry.prune(now, window);
            !entry.is_empty()
        });

        SweepStats {
            retained: clients.len(),
            removed: before - clients.len(),
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Timestamps held for `client_id`, as of the last prune.
    #[cfg(test)]
    pub fn recorded_requests(&self, client_id: &str) -> Option<usize> {
        self.lock().get(client_id).map(ClientWindow::len)
    }

    // A panicking cleanup pass poisons the mutex, but every mutation above
    // leaves the map in a valid state, so the data is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientWindow>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
