//! Fetcher test utilities

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use release_tracker::release::error::FetchError;
use release_tracker::release::fetcher::Fetcher;
use release_tracker::release::types::{ReleaseRecord, RepositoryId};

pub fn repo(s: &str) -> RepositoryId {
    s.parse().unwrap()
}

/// Fetcher that replays a script of outcomes, repeating the last one
pub struct ScriptedFetcher {
    outcomes: Mutex<VecDeque<Result<ReleaseRecord, FetchError>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(outcomes: Vec<Result<ReleaseRecord, FetchError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Result<ReleaseRecord, FetchError> {
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.len() > 1 {
            outcomes.pop_front().unwrap()
        } else {
            outcomes
                .front()
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Upstream(404)))
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, _repo: &RepositoryId) -> Result<ReleaseRecord, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.next_outcome()
    }
}
