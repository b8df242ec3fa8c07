//! Refresh coordinator for a single tracked repository
//!
//! Owns the cached [`CoordinatorState`] and funnels every refresh trigger
//! (schedule tick, manual request, bootstrap) through one single-flight gate,
//! so overlapping triggers share one outstanding fetch.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::release::error::FetchError;
use crate::release::fetcher::Fetcher;
use crate::release::types::{RefreshOutcome, ReleaseRecord, RepositoryId};
use crate::tracker::error::TrackerError;
use crate::tracker::state::CoordinatorState;

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Error recorded when a refresh task ends without producing an outcome
fn aborted_error() -> FetchError {
    FetchError::Transport("refresh aborted before completion".to_string())
}

struct Inner {
    repository: RepositoryId,
    fetcher: Arc<dyn Fetcher>,
    state: watch::Sender<CoordinatorState>,
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl Inner {
    fn lock_in_flight(&self) -> MutexGuard<'_, Option<SharedRefresh>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_refresh(&self) -> RefreshOutcome {
        let guard = InFlightGuard {
            inner: self,
            armed: true,
        };

        debug!("Refreshing latest release for {}", self.repository);
        let outcome = self.fetcher.fetch(&self.repository).await;

        guard.complete(&outcome);
        outcome
    }

    /// Commits the outcome and clears the in-flight slot in one publish
    fn finish(&self, outcome: &RefreshOutcome) {
        let mut slot = self.lock_in_flight();
        slot.take();
        self.state.send_modify(|state| {
            state.commit(outcome);
            state.refresh_in_flight = false;
        });
    }
}

/// Clears the in-flight slot even if the fetch panics or the task is dropped
struct InFlightGuard<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn complete(mut self, outcome: &RefreshOutcome) {
        self.armed = false;
        self.inner.finish(outcome);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(
                "Refresh for {} ended without an outcome",
                self.inner.repository
            );
            self.inner.finish(&Err(aborted_error()));
        }
    }
}

/// Polling and caching coordinator for one repository.
///
/// Cloning is cheap; clones share the same state and gate.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("repository", &self.inner.repository)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl Coordinator {
    pub fn new(repository: RepositoryId, fetcher: Arc<dyn Fetcher>) -> Self {
        let (state, _) = watch::channel(CoordinatorState::default());
        Self {
            inner: Arc::new(Inner {
                repository,
                fetcher,
                state,
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn repository(&self) -> &RepositoryId {
        &self.inner.repository
    }

    /// Refreshes the cached release.
    ///
    /// If a refresh is already running, waits for it and returns its outcome
    /// instead of starting another fetch. The fetch runs on its own task, so
    /// dropping this future does not cancel it for other waiters.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.join_or_start().await
    }

    fn join_or_start(&self) -> SharedRefresh {
        let mut slot = self.inner.lock_in_flight();

        if let Some(refresh) = slot.as_ref() {
            debug!("Joining in-flight refresh for {}", self.inner.repository);
            return refresh.clone();
        }

        self.inner
            .state
            .send_modify(|state| state.refresh_in_flight = true);

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.run_refresh().await });

        let repository = self.inner.repository.clone();
        let refresh = async move {
            task.await.unwrap_or_else(|e| {
                error!("Refresh task for {} failed: {}", repository, e);
                Err(aborted_error())
            })
        }
        .boxed()
        .shared();

        *slot = Some(refresh.clone());
        refresh
    }

    /// Bootstrap refresh. A failure here means the tracker has nothing to
    /// show and is reported as [`TrackerError::NotReady`].
    pub async fn first_refresh(&self) -> Result<ReleaseRecord, TrackerError> {
        self.refresh().await.map_err(|source| {
            error!(
                "Failed to fetch initial data for {}: {}",
                self.inner.repository, source
            );
            TrackerError::NotReady {
                repository: self.inner.repository.clone(),
                source,
            }
        })
    }

    /// Returns the last committed state without waiting on any refresh
    pub fn snapshot(&self) -> CoordinatorState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    /// Timer entry point. The outcome is logged and swallowed.
    pub async fn schedule_tick(&self) {
        match self.refresh().await {
            Ok(record) => info!(
                "Refreshed {}: latest version {}",
                self.inner.repository,
                record.version.as_deref().unwrap_or("unknown")
            ),
            Err(e) => warn!(
                "Scheduled refresh for {} failed ({} consecutive failures): {}",
                self.inner.repository,
                self.snapshot().consecutive_failure_count,
                e
            ),
        }
    }

    /// Spawns the periodic schedule. The first tick fires one `period` from
    /// now; ticks missed while a refresh runs are delayed, not bursted.
    pub fn spawn_schedule(&self, period: Duration) -> JoinHandle<()> {
        let coordinator = self.clone();
        let period = period.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                coordinator.schedule_tick().await;
            }
        })
    }
}
