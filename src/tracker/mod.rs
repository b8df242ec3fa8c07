//! Polling and caching layer
//!
//! This module keeps the latest release of each tracked repository in memory,
//! refreshes it on a fixed interval and renders it for consumers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│ Coordinator │────▶│   Fetcher   │
//! │ (lifecycle) │     │ (state+gate)│     │  (network)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │   Sensor    │
//!                     │  (render)   │
//!                     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`coordinator`]: Single-flight refresh, cached state and schedule
//! - [`error`]: Tracker lifecycle errors
//! - [`registry`]: Map of trackers keyed by repository
//! - [`sensor`]: Display entity built from a coordinator snapshot
//! - [`state`]: Cached state and derived lifecycle phase

pub mod coordinator;
pub mod error;
pub mod registry;
pub mod sensor;
pub mod state;
