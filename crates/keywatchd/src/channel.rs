//! Event stream and handoff shared by every monitor.
//!
//! A monitor is one worker task plus one single-slot `mpsc` channel. The
//! presence relay publishes with [`publish`], which waits for room in the
//! slot while watching the cancellation token; the release monitor sends
//! without the token so a completed fetch is always handed over. Consumers hold an [`EventStream`]; the
//! stream yielding `None` is the only termination signal.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A closed receiver is reported as `Delivery::ConsumerGone`, never an error

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Capacity of every monitor output channel.
///
/// One slot: a consumer that stops reading stalls the worker after at most
/// one undelivered event, and nothing is dropped.
pub const EVENT_BUFFER: usize = 1;

/// Result of handing one event to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The event is in the channel
    Delivered,
    /// Cancellation fired before the slot became free
    Cancelled,
    /// The consumer dropped its receiver
    ConsumerGone,
}

/// Hands `value` to the consumer, waiting for the slot to free up.
///
/// Returns once the value sits in the slot, not once the consumer has read
/// it. The worker may therefore run one event ahead: it moves on while the
/// previous event still waits, and blocks on the publish after that.
///
/// Cancellation is checked first, so a worker whose token already fired never
/// publishes again.
pub async fn publish<T>(
    sender: &mpsc::Sender<T>,
    value: T,
    cancel: &CancellationToken,
) -> Delivery {
    tokio::select! {
        biased;

        _ = cancel.cancelled() => Delivery::Cancelled,

        sent = sender.send(value) => match sent {
            Ok(()) => Delivery::Delivered,
            Err(_) => Delivery::ConsumerGone,
        },
    }
}

/// Read side of a monitor.
///
/// Owns the receiver and the worker's join handle. Dropping the stream makes
/// the worker stop at its next publish.
#[derive(Debug)]
pub struct EventStream<T> {
    receiver: mpsc::Receiver<T>,
    worker: JoinHandle<()>,
}

impl<T> EventStream<T> {
    pub(crate) fn new(receiver: mpsc::Receiver<T>, worker: JoinHandle<()>) -> Self {
        Self { receiver, worker }
    }

    /// Receives the next event, or `None` once the monitor has terminated
    /// and every published event has been read.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Returns the next event if one is waiting, without suspending.
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Returns true once the worker task has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Detaches the worker and returns the raw channel.
    pub fn into_receiver(self) -> mpsc::Receiver<T> {
        self.receiver
    }

    /// Drops the receiver and waits for the worker to exit.
    ///
    /// A worker blocked on publish sees the consumer leave; one that is
    /// idle exits at its next publish or when its token fires.
    ///
    /// # Errors
    ///
    /// The `JoinError` of a worker that panicked or was aborted.
    pub async fn join(self) -> Result<(), JoinError> {
        let Self { receiver, worker } = self;
        drop(receiver);
        worker.await.map_err(|e| {
            warn!(error = %e, panicked = e.is_panic(), "Monitor worker did not stop cleanly");
            e
        })
    }
}
