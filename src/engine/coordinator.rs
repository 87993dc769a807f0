use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{FetchOrder, TemplateGateway};
use crate::cache::{BatchCache, Window};
use crate::models::{Scope, TemplateRecord};

/// Capacity of the fetch outcome channel. Far more than the handful of
/// windows that can be in flight for one scope.
const OUTCOME_CHANNEL_SIZE: usize = 32;

/// Terminal state of one background window fetch.
#[derive(Debug)]
pub enum WindowFetchStatus {
    Fetched(Vec<TemplateRecord>),
    Failed,
    Cancelled,
}

/// Message sent back from a spawned fetch task.
#[derive(Debug)]
pub struct WindowOutcome {
    pub window: Window,
    pub epoch: u64,
    pub status: WindowFetchStatus,
}

/// What `ensure_window_for` decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureAction {
    /// The window is already fully resolved in the cache.
    CacheHit,
    /// Another task is already fetching this window.
    AlreadyInFlight,
    /// A new background fetch was spawned.
    Dispatched,
    /// No scope is active, nothing to fetch against.
    NoScope,
}

/// Dispatches window fetches, deduplicates concurrent requests for the
/// same window, and merges results into the batch cache.
///
/// Fetches run on spawned tasks and report back over a channel; callers
/// drain completions with `poll_completions` or `next_completion`.
/// Stale outcomes from a previous scope are recognized by epoch and
/// discarded.
pub struct FetchCoordinator {
    gateway: Arc<dyn TemplateGateway>,
    cache: BatchCache,
    window_size: u32,
    in_flight: HashSet<String>,
    epoch: u64,
    cancel: CancellationToken,
    scope: Option<Scope>,
    outcome_tx: mpsc::Sender<WindowOutcome>,
    outcome_rx: mpsc::Receiver<WindowOutcome>,
}

impl FetchCoordinator {
    pub fn new(gateway: Arc<dyn TemplateGateway>, window_size: u32) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_CHANNEL_SIZE);
        Self {
            gateway,
            cache: BatchCache::default(),
            window_size: window_size.max(1),
            in_flight: HashSet::new(),
            epoch: 0,
            cancel: CancellationToken::new(),
            scope: None,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn cache(&self) -> &BatchCache {
        &self.cache
    }

    pub fn gateway(&self) -> &Arc<dyn TemplateGateway> {
        &self.gateway
    }

    pub fn window_of(&self, serial: u32) -> Window {
        Window::containing(serial, self.window_size)
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Switch to a new scope. Outstanding fetches for the old scope are
    /// cancelled, their eventual outcomes will carry a stale epoch, and
    /// the cache starts over empty.
    pub fn activate_scope(&mut self, scope: Scope) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch += 1;
        self.in_flight.clear();
        self.cache.reset();
        debug!(epoch = self.epoch, category = %scope.category, "scope activated");
        self.scope = Some(scope);
    }

    /// Make sure the window containing `serial` is resolved or being
    /// fetched. At most one fetch per window key runs at a time.
    pub fn ensure_window_for(&mut self, serial: u32) -> EnsureAction {
        let Some(scope) = self.scope.clone() else {
            return EnsureAction::NoScope;
        };

        let window = self.window_of(serial);
        if self.cache.is_window_complete(&window) {
            return EnsureAction::CacheHit;
        }

        let key = window.key();
        if self.in_flight.contains(&key) {
            return EnsureAction::AlreadyInFlight;
        }
        self.in_flight.insert(key);

        let gateway = Arc::clone(&self.gateway);
        let tx = self.outcome_tx.clone();
        let epoch = self.epoch;
        let cancel = self.cancel.clone();
        let limit = window.size();
        debug!(window = %window, "dispatching window fetch");

        tokio::spawn(async move {
            let result = gateway
                .fetch_batch(&scope, window.start, limit, FetchOrder::Ascending)
                .await;

            let status = if cancel.is_cancelled() {
                WindowFetchStatus::Cancelled
            } else {
                match result {
                    Ok(records) => WindowFetchStatus::Fetched(records),
                    Err(err) => {
                        warn!(window = %window, error = %err, "window fetch failed");
                        WindowFetchStatus::Failed
                    }
                }
            };

            let _ = tx
                .send(WindowOutcome {
                    window,
                    epoch,
                    status,
                })
                .await;
        });

        EnsureAction::Dispatched
    }

    /// Merge one fetch outcome. For a current-epoch outcome the in-flight
    /// key is released whatever the status was, so a failed window can be
    /// retried. A stale outcome must not touch the set: its own key was
    /// already cleared by `activate_scope`, and the same window may be in
    /// flight again for the new scope. Returns true when the cache
    /// changed.
    fn apply_outcome(&mut self, outcome: WindowOutcome) -> bool {
        if outcome.epoch != self.epoch {
            debug!(window = %outcome.window, "discarding stale outcome");
            return false;
        }

        self.in_flight.remove(&outcome.window.key());

        match outcome.status {
            WindowFetchStatus::Fetched(records) => {
                let merged = self.cache.merge_window(outcome.window, &records);
                merged.records_added > 0 || merged.end_marks_added > 0
            }
            WindowFetchStatus::Failed | WindowFetchStatus::Cancelled => false,
        }
    }

    /// Drain every completed fetch without blocking. Returns how many
    /// outcomes changed the cache.
    pub fn poll_completions(&mut self) -> usize {
        let mut changed = 0;
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            if self.apply_outcome(outcome) {
                changed += 1;
            }
        }
        changed
    }

    /// Wait for the next fetch to finish and merge it. Returns the
    /// window it covered, or None if the channel closed.
    pub async fn next_completion(&mut self) -> Option<Window> {
        let outcome = self.outcome_rx.recv().await?;
        let window = outcome.window;
        self.apply_outcome(outcome);
        Some(window)
    }

    /// Initial load for a fresh scope: fetch the window containing
    /// `serial`, retrying with exponential backoff when every endpoint
    /// fails. Returns true once the window is resolved in the cache.
    pub async fn load_initial(&mut self, serial: u32, max_attempts: u32) -> bool {
        let target = self.window_of(serial);

        for attempt in 0..max_attempts.max(1) {
            if attempt > 0 {
                let delay = Duration::from_secs(1u64 << attempt);
                debug!(window = %target, attempt, ?delay, "retrying initial load");
                tokio::time::sleep(delay).await;
            }

            match self.ensure_window_for(serial) {
                EnsureAction::CacheHit => return true,
                EnsureAction::NoScope => return false,
                EnsureAction::Dispatched | EnsureAction::AlreadyInFlight => {}
            }

            while let Some(window) = self.next_completion().await {
                if window == target {
                    break;
                }
            }

            if self.cache.is_window_complete(&target) {
                return true;
            }
        }

        warn!(window = %target, "initial load exhausted retries");
        false
    }
}
