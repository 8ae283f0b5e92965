//! Single-flight refresh coordination
//!
//! The first request to hit an expired token becomes the refresh leader.
//! Every request that fails authorization while the leader's refresh is in
//! flight gets a waiter instead of starting a refresh of its own. When the
//! leader settles, the in-progress flag is cleared and every waiter receives
//! the same outcome, exactly once.
//!
//! The flag check and set happen under one lock acquisition, so there is no
//! window in which two callers can both become leader, on either a
//! current-thread or a multi-threaded runtime. The lock is never held across
//! an await.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::RefreshFailure;

/// New access token, or the reason there is none.
pub type RefreshOutcome = std::result::Result<String, RefreshFailure>;

#[derive(Default)]
struct State {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Shared refresh-in-progress flag plus the queue of pending entries.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<State>,
}

/// Role handed out by `RefreshCoordinator::begin`.
pub enum Ticket<'a> {
    /// Run the refresh, then `settle`.
    Leader(LeaderGuard<'a>),
    /// A refresh is already running; wait for its outcome.
    Waiter(Waiter),
}

/// Held by the refresh leader.
///
/// Dropping it without calling `settle` (the leader's future was cancelled)
/// still clears the flag and rejects every waiter with
/// `RefreshFailure::Abandoned`, so the flag can never stay set.
pub struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeaderGuard<'_> {
    /// Clear the flag and deliver `outcome` to every queued waiter.
    ///
    /// Returns how many waiters were released.
    pub fn settle(mut self, outcome: &RefreshOutcome) -> usize {
        self.settled = true;
        self.coordinator.release(outcome)
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let released = self.coordinator.release(&Err(RefreshFailure::Abandoned));
            warn!(released, "refresh leader dropped before settling");
        }
    }
}

/// A pending entry waiting on someone else's refresh.
pub struct Waiter(oneshot::Receiver<RefreshOutcome>);

impl Waiter {
    pub async fn wait(self) -> RefreshOutcome {
        self.0.await.unwrap_or(Err(RefreshFailure::Abandoned))
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Become the leader if no refresh is running, otherwise enqueue.
    pub fn begin(&self) -> Ticket<'_> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            debug!(queued = state.waiters.len(), "refresh in progress, request queued");
            Ticket::Waiter(Waiter(rx))
        } else {
            state.refreshing = true;
            Ticket::Leader(LeaderGuard {
                coordinator: self,
                settled: false,
            })
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of queued pending entries.
    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    fn release(&self, outcome: &RefreshOutcome) -> usize {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        let count = waiters.len();
        for waiter in waiters {
            // A waiter whose request was dropped has nobody left to tell
            let _ = waiter.send(outcome.clone());
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
