//! Release metadata layer
//!
//! This module fetches the latest release of a repository and normalizes it
//! into a [`types::ReleaseRecord`]. It holds no state and never retries.
//!
//! # Modules
//!
//! - [`error`]: Fetch failure taxonomy and repository id errors
//! - [`fetcher`]: Fetcher trait and the GitHub Releases implementation
//! - [`types`]: Repository id, release record and version normalization

pub mod error;
pub mod fetcher;
pub mod types;
