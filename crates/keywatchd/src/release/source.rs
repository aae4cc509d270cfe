//! Where release observations come from.
//!
//! The worker only sees the [`ReleaseSource`] trait. [`GithubReleaseSource`]
//! is the production implementation over the GitHub REST API.

use std::time::Duration;

use async_trait::async_trait;
use keywatch_core::{FetchError, Release};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};

use crate::error::MonitorError;

/// Default GitHub API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `User-Agent`; GitHub rejects requests without one.
pub const DEFAULT_USER_AGENT: &str = concat!("keywatch/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Locator
// ============================================================================

/// Identifies the project whose latest release is polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLocator {
    owner: String,
    project: String,
    api_base: String,
}

impl ReleaseLocator {
    /// Creates a locator for `owner/project` on the public GitHub API.
    ///
    /// # Errors
    ///
    /// `MonitorError::InvalidLocator` if either segment is empty, contains a
    /// `/`, or contains whitespace.
    pub fn new(owner: impl Into<String>, project: impl Into<String>) -> Result<Self, MonitorError> {
        let owner = owner.into();
        let project = project.into();
        validate_segment("owner", &owner)?;
        validate_segment("project", &project)?;

        Ok(Self {
            owner,
            project,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Points the locator at another API endpoint (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// URL of the latest-release document.
    pub fn url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base, self.owner, self.project
        )
    }
}

fn validate_segment(field: &'static str, value: &str) -> Result<(), MonitorError> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.contains('/') {
        "must not contain '/'"
    } else if value.chars().any(char::is_whitespace) {
        "must not contain whitespace"
    } else {
        return Ok(());
    };

    Err(MonitorError::InvalidLocator {
        field,
        reason: format!("{value:?} {reason}"),
    })
}

// ============================================================================
// Sources
// ============================================================================

/// Produces the latest release on demand.
#[async_trait]
pub trait ReleaseSource: Send + Sync + 'static {
    /// Fetches the latest release. Every failure is a `FetchError`.
    async fn latest_release(&self) -> Result<Release, FetchError>;
}

/// Release source backed by the GitHub "latest release" endpoint.
#[derive(Debug, Clone)]
pub struct GithubReleaseSource {
    client: reqwest::Client,
    url: String,
}

impl GithubReleaseSource {
    /// Creates a source with the default timeout and user agent.
    pub fn new(locator: &ReleaseLocator) -> Result<Self, MonitorError> {
        Self::with_options(locator, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Creates a source with a custom timeout and user agent.
    ///
    /// # Errors
    ///
    /// `MonitorError::HttpClient` if the user agent is not a valid header
    /// value or the client cannot be built.
    pub fn with_options(
        locator: &ReleaseLocator,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, MonitorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            url: locator.url(),
        })
    }

    /// URL this source fetches.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReleaseSource for GithubReleaseSource {
    async fn latest_release(&self) -> Result<Release, FetchError> {
        // Status is not inspected: error documents fail to decode below.
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
