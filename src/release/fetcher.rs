//! GitHub Releases API fetcher

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::release::error::FetchError;
use crate::release::types::{ReleaseRecord, RepositoryId, normalize_version};

/// Trait for fetching the latest release of a repository
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs one round trip for the latest release of `repo`.
    ///
    /// Failures are returned as data; implementations never retry.
    async fn fetch(&self, repo: &RepositoryId) -> Result<ReleaseRecord, FetchError>;
}

/// Response from the `releases/latest` endpoint.
///
/// Every field is optional since upstream payloads vary.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Release {
    tag_name: Option<String>,
    name: Option<String>,
    html_url: Option<String>,
    published_at: Option<String>,
    prerelease: Option<bool>,
    assets: Option<Vec<Asset>>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    browser_download_url: Option<String>,
}

impl Release {
    fn into_record(self) -> ReleaseRecord {
        let published_at = self.published_at.and_then(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .inspect_err(|e| warn!("Ignoring unparsable published_at {:?}: {}", raw, e))
                .ok()
        });

        ReleaseRecord {
            version: self.tag_name.map(|tag| normalize_version(&tag).to_string()),
            title: self.name,
            url: self.html_url,
            published_at,
            is_prerelease: self.prerelease.unwrap_or(false),
            download_url: self
                .assets
                .and_then(|assets| assets.into_iter().next())
                .and_then(|asset| asset.browser_download_url),
        }
    }
}

fn parse_release(body: &str) -> Result<Release, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    if !value.is_object() {
        return Err(FetchError::Malformed("expected a JSON object".to_string()));
    }

    serde_json::from_value(value).map_err(|e| FetchError::Malformed(e.to_string()))
}

/// Fetcher implementation for the GitHub Releases API
pub struct GitHubFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GitHubFetcher {
    /// Creates a new GitHubFetcher with a custom base URL and request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("release-tracker/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Endpoint for the latest release of `repo`
    pub fn latest_release_url(&self, repo: &RepositoryId) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.base_url,
            repo.owner(),
            repo.name()
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for GitHubFetcher {
    async fn fetch(&self, repo: &RepositoryId) -> Result<ReleaseRecord, FetchError> {
        let url = self.latest_release_url(repo);
        debug!("Fetching latest release for {} from {}", repo, url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        debug!("Received status {} for {}", status, repo);

        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(FetchError::Upstream(status.as_u16()));
        }

        let body = response.text().await?;

        let release = parse_release(&body).inspect_err(|e| {
            warn!("Failed to parse GitHub release response for {}: {}", repo, e);
        })?;

        Ok(release.into_record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn repo(owner: &str, name: &str) -> RepositoryId {
        RepositoryId::new(owner, name).unwrap()
    }

    fn fetcher(base_url: &str) -> GitHubFetcher {
        GitHubFetcher::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn latest_release_url_is_built_from_repository_parts() {
        let fetcher = fetcher("https://api.example.com/");
        assert_eq!(
            fetcher.latest_release_url(&repo("owner", "name")),
            "https://api.example.com/repos/owner/name/releases/latest"
        );
    }

    #[tokio::test]
    async fn fetch_returns_normalized_record() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/owner/project/releases/latest")
            .match_header("accept", "application/vnd.github+json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "tag_name": "v2.0.0",
                    "name": "Big Release",
                    "html_url": "https://github.com/owner/project/releases/tag/v2.0.0",
                    "published_at": "2024-01-15T10:30:00Z",
                    "prerelease": false,
                    "assets": [
                        {"browser_download_url": "https://example.com/project-2.0.0.tar.gz"},
                        {"browser_download_url": "https://example.com/project-2.0.0.zip"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let result = fetcher(&server.url())
            .fetch(&repo("owner", "project"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            ReleaseRecord {
                version: Some("2.0.0".to_string()),
                title: Some("Big Release".to_string()),
                url: Some("https://github.com/owner/project/releases/tag/v2.0.0".to_string()),
                published_at: Some("2024-01-15T10:30:00Z".parse().unwrap()),
                is_prerelease: false,
                download_url: Some("https://example.com/project-2.0.0.tar.gz".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn fetch_defaults_missing_fields() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/owner/project/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name": "1.0.0"}"#)
            .create_async()
            .await;

        let result = fetcher(&server.url())
            .fetch(&repo("owner", "project"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            ReleaseRecord {
                version: Some("1.0.0".to_string()),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn fetch_ignores_unparsable_published_at() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/owner/project/releases/latest")
            .with_status(200)
            .with_body(r#"{"tag_name": "v1", "published_at": "yesterday", "prerelease": true}"#)
            .create_async()
            .await;

        let result = fetcher(&server.url())
            .fetch(&repo("owner", "project"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.published_at, None);
        assert!(result.is_prerelease);
    }

    #[tokio::test]
    async fn fetch_returns_upstream_for_not_found() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/nonexistent/repo/releases/latest")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let result = fetcher(&server.url())
            .fetch(&repo("nonexistent", "repo"))
            .await;

        mock.assert_async().await;
        assert_eq!(result, Err(FetchError::Upstream(404)));
    }

    #[tokio::test]
    async fn fetch_returns_upstream_for_rate_limit() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/owner/project/releases/latest")
            .with_status(403)
            .with_body(r#"{"message": "API rate limit exceeded"}"#)
            .create_async()
            .await;

        let result = fetcher(&server.url())
            .fetch(&repo("owner", "project"))
            .await;

        mock.assert_async().await;
        assert_eq!(result, Err(FetchError::Upstream(403)));
    }

    #[tokio::test]
    async fn fetch_returns_malformed_for_invalid_body() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/owner/project/releases/latest")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let result = fetcher(&server.url())
            .fetch(&repo("owner", "project"))
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(FetchError::Malformed(_))));
    }

    #[tokio::test]
    async fn fetch_returns_malformed_for_non_object_body() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/owner/project/releases/latest")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let result = fetcher(&server.url())
            .fetch(&repo("owner", "project"))
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(FetchError::Malformed(_))));
    }

    #[tokio::test]
    async fn fetch_returns_transport_when_server_is_unreachable() {
        // Port 9 (discard) is not expected to accept connections on test hosts
        let result = fetcher("http://127.0.0.1:9")
            .fetch(&repo("owner", "project"))
            .await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn fetch_returns_transport_when_server_never_responds() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let fetcher =
            GitHubFetcher::new(&format!("http://{addr}"), Duration::from_millis(200)).unwrap();
        let started = std::time::Instant::now();
        let result = fetcher.fetch(&repo("owner", "project")).await;
        let elapsed = started.elapsed();
        server.abort();

        assert!(matches!(result, Err(FetchError::Transport(_))));
        assert!(elapsed >= Duration::from_millis(200), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "elapsed {elapsed:?}");
    }
}
