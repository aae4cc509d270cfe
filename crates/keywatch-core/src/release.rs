//! Latest-release descriptors and polling observations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// The latest published release of a project.
///
/// Deserializes directly from the GitHub "latest release" document. Both
/// `tag_name` and `html_url` are required; anything lacking them is not a
/// release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Version tag, e.g. `v1.4.0`
    pub tag_name: String,

    /// Canonical page of the release
    pub html_url: String,

    /// Release title, when the project sets one
    #[serde(default)]
    pub name: Option<String>,

    /// Publication time, absent for drafts
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Release {
    /// Creates a release with just a tag and a link.
    pub fn new(tag_name: impl Into<String>, html_url: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            html_url: html_url.into(),
            name: None,
            published_at: None,
        }
    }

    /// Human-readable version of the release.
    pub fn version(&self) -> &str {
        &self.tag_name
    }

    /// Link to the release page.
    pub fn url(&self) -> &str {
        &self.html_url
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version {} available", self.tag_name)
    }
}

/// Outcome of one polling cycle.
///
/// Exactly one of success or failure; created fresh each cycle and never
/// retained by the monitor after it is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseObservation {
    /// The remote resource answered with a release
    Success(Release),

    /// The fetch failed in transport, body read or decoding
    Failure(FetchError),
}

impl ReleaseObservation {
    /// Builds an observation from a fetch result.
    pub fn from_result(result: Result<Release, FetchError>) -> Self {
        match result {
            Ok(release) => Self::Success(release),
            Err(error) => Self::Failure(error),
        }
    }

    /// Returns true for a successful observation.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The observed release, if the fetch succeeded.
    pub fn release(&self) -> Option<&Release> {
        match self {
            Self::Success(release) => Some(release),
            Self::Failure(_) => None,
        }
    }

    /// The failure cause, if the fetch failed.
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }
}

impl From<Result<Release, FetchError>> for ReleaseObservation {
    fn from(result: Result<Release, FetchError>) -> Self {
        Self::from_result(result)
    }
}
