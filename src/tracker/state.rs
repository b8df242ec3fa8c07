//! Cached state of a tracked repository

use chrono::{DateTime, Utc};

use crate::release::error::FetchError;
use crate::release::types::ReleaseRecord;

/// Lifecycle phase of a tracker, derived from its state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    /// No refresh has completed yet
    Uninitialized,
    /// Every refresh so far failed; nothing to display
    SetupFailed,
    /// The last refresh succeeded
    Available,
    /// The last refresh failed; the previous record is still served
    Degraded,
}

impl TrackerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerPhase::Uninitialized => "uninitialized",
            TrackerPhase::SetupFailed => "setup_failed",
            TrackerPhase::Available => "available",
            TrackerPhase::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorState {
    /// Most recent successful fetch. Never cleared by a failure.
    pub last_record: Option<ReleaseRecord>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Most recent failure, cleared on success
    pub last_error: Option<FetchError>,
    pub consecutive_failure_count: u32,
    pub refresh_in_flight: bool,
}

impl CoordinatorState {
    /// Applies a finished refresh
    pub(crate) fn commit(&mut self, outcome: &Result<ReleaseRecord, FetchError>) {
        let now = Utc::now();
        self.last_attempt_at = Some(now);

        match outcome {
            Ok(record) => {
                self.last_record = Some(record.clone());
                self.last_success_at = Some(now);
                self.last_error = None;
                self.consecutive_failure_count = 0;
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                self.consecutive_failure_count = self.consecutive_failure_count.saturating_add(1);
            }
        }
    }

    pub fn phase(&self) -> TrackerPhase {
        match (&self.last_record, self.consecutive_failure_count) {
            (None, 0) => TrackerPhase::Uninitialized,
            (None, _) => TrackerPhase::SetupFailed,
            (Some(_), 0) => TrackerPhase::Available,
            (Some(_), _) => TrackerPhase::Degraded,
        }
    }

    /// True when the last refresh attempt succeeded.
    ///
    /// A degraded tracker reports `false` even though it still holds a record.
    pub fn is_available(&self) -> bool {
        self.phase() == TrackerPhase::Available
    }
}
