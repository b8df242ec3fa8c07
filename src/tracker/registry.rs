//! Lifecycle owner for tracked repositories

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::release::fetcher::Fetcher;
use crate::release::types::{RefreshOutcome, RepositoryId};
use crate::tracker::coordinator::Coordinator;
use crate::tracker::error::TrackerError;
use crate::tracker::sensor::ReleaseSensor;

struct TrackedRepository {
    coordinator: Coordinator,
    schedule: JoinHandle<()>,
}

impl Drop for TrackedRepository {
    fn drop(&mut self) {
        self.schedule.abort();
    }
}

/// Map of trackers keyed by repository.
///
/// Every tracker shares the same fetcher but owns its own state and schedule.
pub struct TrackerRegistry {
    fetcher: Arc<dyn Fetcher>,
    poll_interval: Duration,
    trackers: HashMap<RepositoryId, TrackedRepository>,
}

impl TrackerRegistry {
    pub fn new(fetcher: Arc<dyn Fetcher>, poll_interval: Duration) -> Self {
        Self {
            fetcher,
            poll_interval,
            trackers: HashMap::new(),
        }
    }

    /// Creates a tracker, runs its first refresh and starts its schedule.
    ///
    /// Nothing is registered when the first refresh fails, so the caller can
    /// retry `add` later.
    pub async fn add(&mut self, repository: RepositoryId) -> Result<Coordinator, TrackerError> {
        if self.trackers.contains_key(&repository) {
            return Err(TrackerError::AlreadyTracked(repository));
        }

        info!("Setting up tracker for {}", repository);
        let coordinator = Coordinator::new(repository.clone(), Arc::clone(&self.fetcher));
        coordinator.first_refresh().await?;

        let schedule = coordinator.spawn_schedule(self.poll_interval);
        self.trackers.insert(
            repository.clone(),
            TrackedRepository {
                coordinator: coordinator.clone(),
                schedule,
            },
        );
        info!("Tracking {} every {:?}", repository, self.poll_interval);

        Ok(coordinator)
    }

    /// Stops the schedule and drops the tracker's state
    pub fn remove(&mut self, repository: &RepositoryId) -> bool {
        let removed = self.trackers.remove(repository).is_some();
        if removed {
            info!("Stopped tracking {}", repository);
        }
        removed
    }

    pub fn get(&self, repository: &RepositoryId) -> Option<&Coordinator> {
        self.trackers
            .get(repository)
            .map(|tracked| &tracked.coordinator)
    }

    pub fn contains(&self, repository: &RepositoryId) -> bool {
        self.trackers.contains_key(repository)
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Tracked repositories, sorted
    pub fn repositories(&self) -> Vec<RepositoryId> {
        let mut repositories: Vec<_> = self.trackers.keys().cloned().collect();
        repositories.sort();
        repositories
    }

    /// Manual refresh of one tracker
    pub async fn request_refresh(
        &self,
        repository: &RepositoryId,
    ) -> Result<RefreshOutcome, TrackerError> {
        let coordinator = self
            .get(repository)
            .ok_or_else(|| TrackerError::NotTracked(repository.clone()))?;

        Ok(coordinator.refresh().await)
    }

    /// Sensors for every tracker, sorted by repository
    pub fn sensors(&self) -> Vec<ReleaseSensor> {
        self.repositories()
            .iter()
            .filter_map(|repository| self.get(repository))
            .map(|coordinator| ReleaseSensor::new(coordinator.clone()))
            .collect()
    }

    /// Removes every tracker
    pub fn shutdown(&mut self) {
        for repository in self.repositories() {
            self.remove(&repository);
        }
    }
}
