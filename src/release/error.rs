use thiserror::Error;

/// Failure of a single release fetch.
///
/// Details are kept as strings so one outcome can be cloned to every caller
/// waiting on the same refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream returned status {0}")]
    Upstream(u16),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Failure class of a [`FetchError`], without its detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Transport,
    Upstream,
    Malformed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Upstream => "upstream",
            FailureKind::Malformed => "malformed",
        }
    }
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) => FailureKind::Transport,
            FetchError::Upstream(_) => FailureKind::Upstream,
            FetchError::Malformed(_) => FailureKind::Malformed,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryIdError {
    #[error("Repository owner must not be empty")]
    EmptyOwner,

    #[error("Repository name must not be empty")]
    EmptyName,

    #[error("Invalid character in repository part: {0:?}")]
    InvalidPart(String),

    #[error("Expected `owner/name` or a GitHub URL, got {0:?}")]
    InvalidFormat(String),
}
