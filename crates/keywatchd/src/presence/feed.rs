//! Upstream presence feeds.

use keywatch_core::{FeedError, PresenceChange};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A source of reader presence changes.
///
/// `subscribe` receives the relay's derived cancellation token; a feed that
/// runs its own worker should stop it when the token fires. The feed closes
/// the returned channel when it shuts down.
pub trait PresenceFeed: Send {
    /// Opens the subscription.
    ///
    /// # Errors
    ///
    /// A `FeedError` if the subscription cannot be established; the relay
    /// is then not started.
    fn subscribe(
        self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<PresenceChange>, FeedError>;
}

/// A channel that is already being fed by someone else.
///
/// The external owner controls its shutdown, so the token is not used.
impl PresenceFeed for mpsc::Receiver<PresenceChange> {
    fn subscribe(
        self,
        _cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<PresenceChange>, FeedError> {
        Ok(self)
    }
}
