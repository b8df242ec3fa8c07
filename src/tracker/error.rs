use thiserror::Error;

use crate::release::error::FetchError;
use crate::release::types::RepositoryId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// The first refresh failed, so there is nothing to display yet
    #[error("Tracker for {repository} is not ready: {source}")]
    NotReady {
        repository: RepositoryId,
        #[source]
        source: FetchError,
    },

    #[error("Repository {0} is already tracked")]
    AlreadyTracked(RepositoryId),

    #[error("Repository {0} is not tracked")]
    NotTracked(RepositoryId),
}
