//! Common types for release tracking

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::release::error::{FetchError, RepositoryIdError};

/// Outcome of one refresh: the fetched record or the typed failure
pub type RefreshOutcome = Result<ReleaseRecord, FetchError>;

/// Matches `github.com/owner/name` with optional scheme, `www.`, `.git` and trailing slash
static GITHUB_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?github\.com/([^/\s]+)/([^/\s]+?)(?:\.git)?/?$")
        .expect("valid regex")
});

/// Repository identifier (`owner/name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryId {
    owner: String,
    name: String,
}

impl RepositoryId {
    pub fn new(owner: &str, name: &str) -> Result<Self, RepositoryIdError> {
        if owner.is_empty() {
            return Err(RepositoryIdError::EmptyOwner);
        }
        if name.is_empty() {
            return Err(RepositoryIdError::EmptyName);
        }
        for part in [owner, name] {
            if part.contains('/') || part.chars().any(char::is_whitespace) {
                return Err(RepositoryIdError::InvalidPart(part.to_string()));
            }
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryId {
    type Err = RepositoryIdError;

    /// Accepts `owner/name` or a GitHub repository URL
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(caps) = GITHUB_URL_RE.captures(s) {
            return Self::new(&caps[1], &caps[2]);
        }

        if s.contains("github.com") {
            return Err(RepositoryIdError::InvalidFormat(s.to_string()));
        }

        match s.split_once('/') {
            Some((owner, name)) => Self::new(owner, name),
            None => Err(RepositoryIdError::InvalidFormat(s.to_string())),
        }
    }
}

/// Normalized snapshot of the latest release of a repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseRecord {
    /// Tag name with the leading `v` removed
    pub version: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub is_prerelease: bool,
    /// Download URL of the first release asset
    pub download_url: Option<String>,
}

/// Strips the leading `v` prefix from a tag name.
///
/// A run of leading `v`s counts as one prefix, so the function is idempotent.
pub fn normalize_version(tag: &str) -> &str {
    tag.trim_start_matches('v')
}
