//! Construction-time errors for the monitors.
//!
//! Steady-state failures never show up here: fetch failures become
//! `ReleaseObservation::Failure` events and device-open failures go to the
//! caller of `open()`.

use keywatch_core::FeedError;
use thiserror::Error;

/// Errors returned when a monitor cannot be started.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The release locator has an unusable segment
    #[error("invalid {field}: {reason}")]
    InvalidLocator { field: &'static str, reason: String },

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    /// The upstream presence feed refused the subscription
    #[error("failed to subscribe to presence feed: {0}")]
    Subscribe(#[from] FeedError),
}
