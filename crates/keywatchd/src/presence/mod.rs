//! Security key insertion relay.
//!
//! Subscribes to an upstream presence feed and republishes every change to
//! `Available` as an [`InsertionEvent`]. Any other change is dropped without
//! an event. The relay never opens devices itself; each event carries a
//! connector and opens a fresh device when asked.
//!
//! # Shutdown
//!
//! The feed subscription runs under a token derived from the caller's.
//! Whatever ends the worker (caller cancellation, feed closing, consumer
//! leaving) cancels it, which tears down the subscription.
//!
//! Device sessions hang off a separate child of the caller's token. Events
//! already published stay openable after the feed closes or the worker
//! stops; only the caller's cancellation closes them.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Feed closure is a normal stop, not an error

mod event;
mod feed;

pub use event::{CardInsertion, DeviceConnector, InsertionEvent};
pub use feed::PresenceFeed;

use std::sync::Arc;

use keywatch_core::PresenceChange;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::channel::{publish, Delivery, EventStream, EVENT_BUFFER};
use crate::diagnostics::{Diagnostic, DiagnosticSink, StopReason, TracingSink};
use crate::error::MonitorError;

const MONITOR_NAME: &str = "presence";

/// Insertion event as published by the relay.
pub type SharedInsertion<D> = Arc<dyn InsertionEvent<Device = D>>;

/// Builder for a presence relay.
pub struct PresenceRelay<C> {
    connector: Arc<C>,
    sink: Arc<dyn DiagnosticSink>,
}

impl<C: DeviceConnector> PresenceRelay<C> {
    /// Creates a relay whose events open devices through `connector`.
    pub fn new(connector: C) -> Self {
        Self::with_shared_connector(Arc::new(connector))
    }

    /// Creates a relay sharing an existing connector.
    pub fn with_shared_connector(connector: Arc<C>) -> Self {
        Self {
            connector,
            sink: Arc::new(TracingSink),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Subscribes to `feed` and starts the worker.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// `MonitorError::Subscribe` if the feed refuses the subscription. No
    /// worker is started in that case.
    pub fn spawn<F: PresenceFeed>(
        self,
        cancel: CancellationToken,
        feed: F,
    ) -> Result<EventStream<SharedInsertion<C::Device>>, MonitorError> {
        let subscription = cancel.child_token();
        let upstream = match feed.subscribe(subscription.clone()) {
            Ok(upstream) => upstream,
            Err(e) => {
                subscription.cancel();
                return Err(e.into());
            }
        };
        let devices = cancel.child_token();

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let worker = tokio::spawn(self.run(upstream, tx, subscription, devices));
        Ok(EventStream::new(rx, worker))
    }

    async fn run(
        self,
        mut upstream: mpsc::Receiver<PresenceChange>,
        tx: mpsc::Sender<SharedInsertion<C::Device>>,
        subscription: CancellationToken,
        devices: CancellationToken,
    ) {
        let reason = loop {
            let change = tokio::select! {
                biased;

                _ = subscription.cancelled() => break StopReason::Cancelled,

                change = upstream.recv() => match change {
                    Some(change) => change,
                    None => break StopReason::FeedClosed,
                },
            };

            self.sink.emit(Diagnostic::TransitionReceived {
                reader: change.id().to_string(),
                presence: change.presence(),
            });

            if !change.presence().is_available() {
                continue;
            }

            let event: SharedInsertion<C::Device> = Arc::new(CardInsertion::new(
                change.id().to_string(),
                Arc::clone(&self.connector),
                devices.clone(),
                Arc::clone(&self.sink),
            ));

            match publish(&tx, event, &subscription).await {
                Delivery::Delivered => {}
                Delivery::Cancelled => break StopReason::Cancelled,
                Delivery::ConsumerGone => break StopReason::ConsumerGone,
            }
        };

        subscription.cancel();
        self.sink.emit(Diagnostic::MonitorStopped {
            monitor: MONITOR_NAME,
            reason,
        });
    }
}
