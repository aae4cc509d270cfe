//! Diagnostic events emitted by the monitors.
//!
//! Monitors never call the logger directly. They emit `Diagnostic` values
//! into an injected `DiagnosticSink`; the default `TracingSink` turns them
//! into structured `tracing` events, and tests can record them instead.

use std::fmt;
use std::time::Duration;

use keywatch_core::{FetchError, OpenError, Presence};
use tracing::{debug, error, info, warn};

/// Why a monitor worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation token fired
    Cancelled,
    /// The upstream feed closed its channel
    FeedClosed,
    /// The consumer dropped the event stream
    ConsumerGone,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::FeedClosed => write!(f, "feed closed"),
            Self::ConsumerGone => write!(f, "consumer gone"),
        }
    }
}

/// A structured diagnostic from one of the monitors.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A release fetch succeeded
    ReleaseFetched { version: String, url: String },

    /// A release fetch failed; the next attempt follows after `retry_in`
    ReleaseFetchFailed { error: FetchError, retry_in: Duration },

    /// The relay received a presence change from its feed
    TransitionReceived { reader: String, presence: Presence },

    /// A consumer asked to open an inserted device
    DeviceOpening { reader: String },

    /// Opening an inserted device failed
    DeviceOpenFailed { reader: String, error: OpenError },

    /// A monitor worker exited
    MonitorStopped {
        monitor: &'static str,
        reason: StopReason,
    },
}

/// Receiver of monitor diagnostics.
pub trait DiagnosticSink: Send + Sync {
    /// Records one diagnostic. Must not block.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Sink that forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::ReleaseFetched { version, url } => {
                debug!(version = %version, url = %url, "Latest release info");
            }
            Diagnostic::ReleaseFetchFailed { error, retry_in } => {
                warn!(
                    error = %error,
                    retry_in_secs = retry_in.as_secs(),
                    "Cannot retrieve latest release info"
                );
            }
            Diagnostic::TransitionReceived { reader, presence } => {
                debug!(reader = %reader, presence = %presence, "Received reader presence change");
            }
            Diagnostic::DeviceOpening { reader } => {
                debug!(reader = %reader, "Opening device");
            }
            Diagnostic::DeviceOpenFailed { reader, error } => {
                error!(reader = %reader, error = %error, "Error opening device");
            }
            Diagnostic::MonitorStopped { monitor, reason } => {
                info!(monitor, reason = %reason, "Stopping monitor");
            }
        }
    }
}
