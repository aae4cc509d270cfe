//! Reader presence states and the upstream changes that carry them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Occupancy of a monitored reader slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// A card or key is present and usable
    Available,
    /// The slot is empty or the reader is gone
    Unavailable,
}

impl Presence {
    /// Returns true for `Available`.
    pub fn is_available(self) -> bool {
        self == Self::Available
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A presence change reported by the upstream feed.
///
/// Owned and produced by the feed; relays only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChange {
    id: String,
    presence: Presence,
}

impl PresenceChange {
    /// Creates a change for the reader `id`.
    pub fn new(id: impl Into<String>, presence: Presence) -> Self {
        Self {
            id: id.into(),
            presence,
        }
    }

    /// Shorthand for an `Available` change.
    pub fn available(id: impl Into<String>) -> Self {
        Self::new(id, Presence::Available)
    }

    /// Shorthand for an `Unavailable` change.
    pub fn unavailable(id: impl Into<String>) -> Self {
        Self::new(id, Presence::Unavailable)
    }

    /// Stable identifier of the reader slot.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// New presence state of the slot.
    pub fn presence(&self) -> Presence {
        self.presence
    }
}
