//! Domain-specific error types following panic-free policy.
//!
//! Every error here carries rendered messages rather than the underlying
//! library error, so the values stay `Clone` and can travel inside published
//! events.

use thiserror::Error;

/// Why a single release fetch failed.
///
/// Consumers treat every variant the same way (a failed observation); the
/// split exists for diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response
    #[error("cannot retrieve latest release info from {url}: {message}")]
    Transport { url: String, message: String },

    /// The response body could not be read
    #[error("cannot read latest release info: {0}")]
    Body(String),

    /// The body is not a release document
    #[error("cannot decode latest release info: {0}")]
    Decode(String),
}

/// Why opening an inserted device failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// The device connector refused or failed to connect
    #[error("failed to open device {reader}: {message}")]
    Connect { reader: String, message: String },

    /// The relay that produced the event was cancelled by its owner
    #[error("device session for {reader} is closed")]
    SessionClosed { reader: String },
}

impl OpenError {
    /// Creates a connect error for the given reader.
    pub fn connect(reader: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            reader: reader.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while subscribing to an upstream presence feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The feed could not be reached at all
    #[error("presence feed unavailable: {0}")]
    Unavailable(String),

    /// The feed only supports one subscriber and already has it
    #[error("presence feed already has a subscriber")]
    AlreadySubscribed,
}
