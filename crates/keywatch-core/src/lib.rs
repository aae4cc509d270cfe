//! keywatch core - Shared types for the keywatch monitors
//!
//! This crate provides the plain domain values that flow out of the
//! monitors in `keywatchd` and into whatever presents them:
//! - `release` - latest-release descriptors and per-cycle observations
//! - `presence` - reader presence states and upstream presence changes
//! - `error` - fetch, device-open and feed errors
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod presence;
pub mod release;

// Re-exports for convenience
pub use error::{FeedError, FetchError, OpenError};
pub use presence::{Presence, PresenceChange};
pub use release::{Release, ReleaseObservation};
