//! Display entity for a tracked repository
//!
//! Renders the coordinator's cached state as a named value with auxiliary
//! attributes. Reads never trigger a fetch.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::release::types::{RefreshOutcome, RepositoryId};
use crate::tracker::coordinator::Coordinator;
use crate::tracker::state::CoordinatorState;

/// Rendered sensor, as consumed by outputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorView {
    pub unique_id: String,
    pub name: String,
    /// Latest version, `None` until a release with a tag has been fetched
    pub state: Option<String>,
    pub available: bool,
    pub phase: &'static str,
    pub attributes: Map<String, Value>,
}

/// Sensor exposing the latest release of one repository
#[derive(Clone)]
pub struct ReleaseSensor {
    coordinator: Coordinator,
    unique_id: String,
}

impl ReleaseSensor {
    pub fn new(coordinator: Coordinator) -> Self {
        let unique_id = unique_id_for(coordinator.repository());
        Self {
            coordinator,
            unique_id,
        }
    }

    pub fn name(&self) -> String {
        format!("GitHub Latest Release {}", self.coordinator.repository())
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn state(&self) -> Option<String> {
        state_of(&self.coordinator.snapshot())
    }

    pub fn attributes(&self) -> Map<String, Value> {
        attributes_of(&self.coordinator.snapshot())
    }

    /// Whether the last refresh attempt succeeded
    pub fn available(&self) -> bool {
        self.coordinator.snapshot().is_available()
    }

    /// Renders the sensor from one consistent snapshot
    pub fn view(&self) -> SensorView {
        self.view_of(&self.coordinator.snapshot())
    }

    pub fn view_of(&self, state: &CoordinatorState) -> SensorView {
        SensorView {
            unique_id: self.unique_id.clone(),
            name: self.name(),
            state: state_of(state),
            available: state.is_available(),
            phase: state.phase().as_str(),
            attributes: attributes_of(state),
        }
    }

    /// Manual update request, routed through the coordinator's refresh gate
    pub async fn request_update(&self) -> RefreshOutcome {
        self.coordinator.refresh().await
    }
}

/// Unique id in the form `sensor.github_release_{owner}_{name}`
pub fn unique_id_for(repository: &RepositoryId) -> String {
    format!(
        "sensor.github_release_{}_{}",
        repository.owner(),
        repository.name()
    )
}

fn state_of(state: &CoordinatorState) -> Option<String> {
    state
        .last_record
        .as_ref()
        .and_then(|record| record.version.clone())
}

fn attributes_of(state: &CoordinatorState) -> Map<String, Value> {
    let mut attributes = Map::new();

    let Some(record) = &state.last_record else {
        return attributes;
    };

    attributes.insert("html_url".to_string(), json!(record.url));
    attributes.insert("release_title".to_string(), json!(record.title));
    attributes.insert(
        "published_at".to_string(),
        json!(record.published_at.map(|dt| dt.to_rfc3339())),
    );
    attributes.insert("prerelease".to_string(), json!(record.is_prerelease));
    if let Some(download_url) = &record.download_url {
        attributes.insert("download_url".to_string(), json!(download_url));
    }
    if let Some(error) = &state.last_error {
        attributes.insert("last_error".to_string(), json!(error.to_string()));
        attributes.insert("last_error_kind".to_string(), json!(error.kind().as_str()));
    }

    attributes
}
