//! Latest-release polling monitor.
//!
//! A single worker runs `fetch -> classify -> publish -> wait` forever. The
//! wait after a success is long and the wait after a failure is short, so a
//! healthy endpoint is barely touched while an outage is retried quickly.
//! Consumers see a `Failure` for every failed attempt rather than silence.
//!
//! Only the idle wait races the cancellation token. A fetch that is in
//! flight when the token fires runs to completion and its observation is
//! still handed to the consumer; the worker exits at the wait that follows.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Fetch failures are values, never errors of the worker

mod source;

pub use source::{
    GithubReleaseSource, ReleaseLocator, ReleaseSource, DEFAULT_API_BASE,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT,
};

use std::sync::Arc;
use std::time::Duration;

use keywatch_core::ReleaseObservation;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::channel::{EventStream, EVENT_BUFFER};
use crate::diagnostics::{Diagnostic, DiagnosticSink, StopReason, TracingSink};
use crate::error::MonitorError;

/// Wait after a successful fetch.
pub const SUCCESS_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Wait after a failed fetch.
pub const FAILURE_INTERVAL: Duration = Duration::from_secs(60);

const MONITOR_NAME: &str = "release";

/// Wait intervals between polling cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    /// Wait after a `Success` observation
    pub on_success: Duration,
    /// Wait after a `Failure` observation
    pub on_failure: Duration,
}

impl PollIntervals {
    pub fn new(on_success: Duration, on_failure: Duration) -> Self {
        Self {
            on_success,
            on_failure,
        }
    }

    /// Interval to wait after `observation`; depends on nothing else.
    pub fn after(&self, observation: &ReleaseObservation) -> Duration {
        if observation.is_success() {
            self.on_success
        } else {
            self.on_failure
        }
    }
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self::new(SUCCESS_INTERVAL, FAILURE_INTERVAL)
    }
}

/// Builder for a release polling monitor.
///
/// ```no_run
/// use keywatchd::release::{GithubReleaseSource, ReleaseLocator, ReleaseMonitor};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> Result<(), keywatchd::MonitorError> {
/// let locator = ReleaseLocator::new("octo", "widget")?;
/// let cancel = CancellationToken::new();
/// let mut releases = ReleaseMonitor::new(GithubReleaseSource::new(&locator)?).spawn(cancel);
///
/// while let Some(observation) = releases.recv().await {
///     println!("{observation:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct ReleaseMonitor<S> {
    source: S,
    intervals: PollIntervals,
    sink: Arc<dyn DiagnosticSink>,
}

impl<S: ReleaseSource> ReleaseMonitor<S> {
    /// Creates a monitor with default intervals that logs through `tracing`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            intervals: PollIntervals::default(),
            sink: Arc::new(TracingSink),
        }
    }

    #[must_use]
    pub fn with_intervals(mut self, intervals: PollIntervals) -> Self {
        self.intervals = intervals;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Starts the worker. The first event arrives once the first fetch
    /// completes.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(self, cancel: CancellationToken) -> EventStream<ReleaseObservation> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let worker = tokio::spawn(self.run(tx, cancel));
        EventStream::new(rx, worker)
    }

    async fn run(self, tx: mpsc::Sender<ReleaseObservation>, cancel: CancellationToken) {
        let reason = loop {
            let observation = ReleaseObservation::from(self.source.latest_release().await);
            let wait = self.intervals.after(&observation);
            self.report(&observation, wait);

            // Not raced against the token: fetch and publish always finish.
            if tx.send(observation).await.is_err() {
                break StopReason::ConsumerGone;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break StopReason::Cancelled,

                _ = sleep(wait) => {}
            }
        };

        self.sink.emit(Diagnostic::MonitorStopped {
            monitor: MONITOR_NAME,
            reason,
        });
    }

    fn report(&self, observation: &ReleaseObservation, wait: Duration) {
        let diagnostic = match observation {
            ReleaseObservation::Success(release) => Diagnostic::ReleaseFetched {
                version: release.tag_name.clone(),
                url: release.html_url.clone(),
            },
            ReleaseObservation::Failure(error) => Diagnostic::ReleaseFetchFailed {
                error: error.clone(),
                retry_in: wait,
            },
        };
        self.sink.emit(diagnostic);
    }
}

/// Starts a GitHub release monitor for `locator`.
///
/// # Errors
///
/// `MonitorError::HttpClient` if the HTTP client cannot be built. Fetch
/// failures never surface here; they arrive as `Failure` observations.
pub fn spawn_github_monitor(
    cancel: CancellationToken,
    locator: &ReleaseLocator,
    intervals: PollIntervals,
    request_timeout: Duration,
    user_agent: &str,
) -> Result<EventStream<ReleaseObservation>, MonitorError> {
    let source = GithubReleaseSource::with_options(locator, request_timeout, user_agent)?;
    Ok(ReleaseMonitor::new(source)
        .with_intervals(intervals)
        .spawn(cancel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keywatch_core::{FetchError, Release};

    #[test]
    fn test_default_intervals() {
        let intervals = PollIntervals::default();
        assert_eq!(intervals.on_success, Duration::from_secs(3600));
        assert_eq!(intervals.on_failure, Duration::from_secs(60));
    }

    #[test]
    fn test_interval_depends_only_on_outcome() {
        let intervals = PollIntervals::new(Duration::from_secs(10), Duration::from_secs(2));
        let ok = ReleaseObservation::Success(Release::new("v1", "https://example.com"));
        let failed = ReleaseObservation::Failure(FetchError::Decode("eof".to_string()));

        for observation in [&ok, &failed, &failed, &ok, &ok, &failed] {
            let expected = if observation.is_success() {
                Duration::from_secs(10)
            } else {
                Duration::from_secs(2)
            };
            assert_eq!(intervals.after(observation), expected);
        }
    }
}
