//! Release monitor behaviour: backoff, ordering, cancellation, backpressure.
//!
//! Runs on a paused clock so intervals of an hour take no real time.
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use keywatch_core::{FetchError, Release, ReleaseObservation};
use keywatchd::release::{PollIntervals, ReleaseMonitor, ReleaseSource};
use keywatchd::{Diagnostic, DiagnosticSink, StopReason};
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

const LONG: Duration = Duration::from_secs(3600);
const SHORT: Duration = Duration::from_secs(60);
const TIMER_SLACK: Duration = Duration::from_millis(10);

// ============================================================================
// Test Helpers
// ============================================================================

fn ok(tag: &str) -> Result<Release, FetchError> {
    Ok(Release::new(tag, format!("https://example.com/releases/{tag}")))
}

fn failed(message: &str) -> Result<Release, FetchError> {
    Err(FetchError::Transport {
        url: "https://example.com".to_string(),
        message: message.to_string(),
    })
}

/// Plays back scripted outcomes and records when each fetch happened.
#[derive(Clone, Default)]
struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Result<Release, FetchError>>>>,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<Release, FetchError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::default(),
        }
    }

    fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ReleaseSource for ScriptedSource {
    async fn latest_release(&self) -> Result<Release, FetchError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| failed("script exhausted"))
    }
}

/// Blocks the first fetch until the test opens the gate.
#[derive(Clone, Default)]
struct GatedSource {
    started: Arc<Notify>,
    gate: Arc<Notify>,
    finished: Arc<AtomicBool>,
}

#[async_trait]
impl ReleaseSource for GatedSource {
    async fn latest_release(&self) -> Result<Release, FetchError> {
        self.started.notify_one();
        self.gate.notified().await;
        self.finished.store(true, Ordering::SeqCst);
        ok("v9.9.9")
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<Diagnostic> {
        self.events.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.events.lock().unwrap().push(diagnostic);
    }
}

fn intervals() -> PollIntervals {
    PollIntervals::new(LONG, SHORT)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_follows_each_outcome_in_order() {
    let script = vec![
        ok("v1"),
        failed("dns"),
        failed("reset"),
        ok("v2"),
        ok("v2"),
        failed("timeout"),
        ok("v3"),
    ];
    let source = ScriptedSource::new(script.clone());
    let cancel = CancellationToken::new();
    let mut releases = ReleaseMonitor::new(source.clone())
        .with_intervals(intervals())
        .spawn(cancel.clone());

    for expected in &script {
        let observation = releases.recv().await.expect("monitor stopped early");
        assert_eq!(observation, ReleaseObservation::from(expected.clone()));
    }

    let times = source.call_times();
    assert!(times.len() >= script.len());
    for (i, pair) in times.windows(2).take(script.len() - 1).enumerate() {
        let gap = pair[1] - pair[0];
        let expected = if script[i].is_ok() { LONG } else { SHORT };
        assert!(
            gap >= expected && gap < expected + TIMER_SLACK,
            "cycle {i}: waited {gap:?}, expected {expected:?}"
        );
    }

    cancel.cancel();
    assert!(releases.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_first_event_arrives_after_first_fetch() {
    let source = ScriptedSource::new(vec![ok("v1")]);
    let cancel = CancellationToken::new();
    let mut releases = ReleaseMonitor::new(source.clone()).spawn(cancel.clone());

    let first = releases.recv().await.unwrap();
    assert_eq!(first.release().map(Release::version), Some("v1"));
    assert_eq!(source.calls(), 1);

    cancel.cancel();
    assert!(releases.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_wait_stops_without_fetching() {
    let source = ScriptedSource::new(vec![ok("v1"), ok("v2")]);
    let sink = Arc::new(RecordingSink::default());
    let cancel = CancellationToken::new();
    let mut releases = ReleaseMonitor::new(source.clone())
        .with_intervals(intervals())
        .with_sink(sink.clone())
        .spawn(cancel.clone());

    assert!(releases.recv().await.is_some());
    cancel.cancel();
    // Cancelling twice has no further effect.
    cancel.cancel();

    assert!(releases.recv().await.is_none());
    assert_eq!(source.calls(), 1);

    // Nothing resumes later.
    sleep(LONG * 3).await;
    assert_eq!(source.calls(), 1);
    assert!(releases.is_finished());

    assert_eq!(
        sink.events().last(),
        Some(&Diagnostic::MonitorStopped {
            monitor: "release",
            reason: StopReason::Cancelled,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_fetch_is_published_after_cancel() {
    let source = GatedSource::default();
    let cancel = CancellationToken::new();
    let mut releases = ReleaseMonitor::new(source.clone()).spawn(cancel.clone());

    source.started.notified().await;
    cancel.cancel();
    source.gate.notify_one();

    assert_eq!(
        releases.recv().await,
        Some(ReleaseObservation::from(ok("v9.9.9")))
    );
    assert!(source.finished.load(Ordering::SeqCst));
    assert!(releases.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_blocked_on_publish_still_delivers() {
    let source = ScriptedSource::new(vec![ok("v1"), ok("v2"), ok("v3")]);
    let cancel = CancellationToken::new();
    let mut releases = ReleaseMonitor::new(source.clone())
        .with_intervals(PollIntervals::new(Duration::from_secs(1), Duration::from_secs(1)))
        .spawn(cancel.clone());

    // v1 fills the slot, the worker blocks handing over v2.
    sleep(Duration::from_secs(10)).await;
    assert_eq!(source.calls(), 2);
    cancel.cancel();

    assert_eq!(releases.recv().await, Some(ReleaseObservation::from(ok("v1"))));
    assert_eq!(releases.recv().await, Some(ReleaseObservation::from(ok("v2"))));
    assert!(releases.recv().await.is_none());
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failure_is_reported_with_short_retry() {
    let source = ScriptedSource::new(vec![failed("connection refused"), ok("v1")]);
    let sink = Arc::new(RecordingSink::default());
    let cancel = CancellationToken::new();
    let mut releases = ReleaseMonitor::new(source)
        .with_intervals(intervals())
        .with_sink(sink.clone())
        .spawn(cancel.clone());

    let first = releases.recv().await.unwrap();
    assert!(!first.is_success());
    let second = releases.recv().await.unwrap();
    assert!(second.is_success());

    let events = sink.events();
    assert!(matches!(
        &events[0],
        Diagnostic::ReleaseFetchFailed { retry_in, .. } if *retry_in == SHORT
    ));
    assert_eq!(
        events[1],
        Diagnostic::ReleaseFetched {
            version: "v1".to_string(),
            url: "https://example.com/releases/v1".to_string(),
        }
    );

    cancel.cancel();
    assert!(releases.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_slow_consumer_stalls_worker_without_loss() {
    let script: Vec<_> = (1..=5).map(|n| ok(&format!("v{n}"))).collect();
    let source = ScriptedSource::new(script.clone());
    let cancel = CancellationToken::new();
    let mut releases = ReleaseMonitor::new(source.clone())
        .with_intervals(PollIntervals::new(Duration::from_secs(1), Duration::from_secs(1)))
        .spawn(cancel.clone());

    // Not reading: one event fills the slot, the next fetch blocks on publish.
    sleep(Duration::from_secs(100)).await;
    assert_eq!(source.calls(), 2);

    for expected in &script {
        assert_eq!(
            releases.recv().await,
            Some(ReleaseObservation::from(expected.clone()))
        );
    }

    cancel.cancel();
    while releases.recv().await.is_some() {}
}

#[tokio::test(start_paused = true)]
async fn test_dropped_consumer_stops_worker() {
    let source = ScriptedSource::new(vec![ok("v1"), ok("v2"), ok("v3")]);
    let sink = Arc::new(RecordingSink::default());
    let releases = ReleaseMonitor::new(source)
        .with_intervals(intervals())
        .with_sink(sink.clone())
        .spawn(CancellationToken::new());

    releases.join().await.unwrap();

    assert_eq!(
        sink.events().last(),
        Some(&Diagnostic::MonitorStopped {
            monitor: "release",
            reason: StopReason::ConsumerGone,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_monitors_are_independent() {
    let first = ScriptedSource::new(vec![ok("a1"), ok("a2")]);
    let second = ScriptedSource::new(vec![failed("down"), ok("b1")]);
    let cancel_first = CancellationToken::new();
    let cancel_second = CancellationToken::new();

    let mut a = ReleaseMonitor::new(first.clone())
        .with_intervals(intervals())
        .spawn(cancel_first.clone());
    let mut b = ReleaseMonitor::new(second.clone())
        .with_intervals(intervals())
        .spawn(cancel_second.clone());

    assert!(a.recv().await.unwrap().is_success());
    cancel_first.cancel();
    assert!(a.recv().await.is_none());

    assert!(!b.recv().await.unwrap().is_success());
    assert_eq!(
        b.recv().await.unwrap().release().map(Release::version),
        Some("b1")
    );

    assert_eq!(first.calls(), 1);
    cancel_second.cancel();
    assert!(b.recv().await.is_none());
}
