//! Insertion events with deferred device acquisition.
//!
//! An [`InsertionEvent`] names the reader a key was inserted into and can
//! open the device on request. Opening is expensive and can fail on its own,
//! so the relay never does it; the consumer decides whether and when.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use keywatch_core::OpenError;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// Opens a device in a reader slot.
///
/// Each call must establish a new connection; the returned device is owned
/// by the caller. `session` is cancelled when the token the relay was
/// spawned with is cancelled.
#[async_trait]
pub trait DeviceConnector: Send + Sync + 'static {
    type Device: Send + 'static;

    async fn connect(
        &self,
        reader: &str,
        session: CancellationToken,
    ) -> Result<Self::Device, OpenError>;
}

/// A key was inserted into a reader.
#[async_trait]
pub trait InsertionEvent: Send + Sync + fmt::Debug {
    type Device: Send + 'static;

    /// Identifier of the reader; the same on every call.
    fn id(&self) -> &str;

    /// Opens the inserted device.
    ///
    /// Every call opens a fresh, independent device. Failures only affect
    /// this call.
    async fn open(&self) -> Result<Self::Device, OpenError>;
}

/// Insertion event produced by [`PresenceRelay`](super::PresenceRelay).
pub struct CardInsertion<C> {
    id: String,
    connector: Arc<C>,
    session: CancellationToken,
    sink: Arc<dyn DiagnosticSink>,
}

impl<C: DeviceConnector> CardInsertion<C> {
    pub(crate) fn new(
        id: String,
        connector: Arc<C>,
        session: CancellationToken,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            id,
            connector,
            session,
            sink,
        }
    }
}

impl<C> fmt::Debug for CardInsertion<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardInsertion")
            .field("id", &self.id)
            .field("session_closed", &self.session.is_cancelled())
            .finish()
    }
}

#[async_trait]
impl<C: DeviceConnector> InsertionEvent for CardInsertion<C> {
    type Device = C::Device;

    fn id(&self) -> &str {
        &self.id
    }

    async fn open(&self) -> Result<Self::Device, OpenError> {
        self.sink.emit(Diagnostic::DeviceOpening {
            reader: self.id.clone(),
        });

        let result = if self.session.is_cancelled() {
            Err(OpenError::SessionClosed {
                reader: self.id.clone(),
            })
        } else {
            self.connector
                .connect(&self.id, self.session.child_token())
                .await
        };

        if let Err(error) = &result {
            self.sink.emit(Diagnostic::DeviceOpenFailed {
                reader: self.id.clone(),
                error: error.clone(),
            });
        }
        result
    }
}
