//! keywatch monitors - background workers that publish typed events
//!
//! This crate provides the monitor pipeline used by the `keywatchd` binary
//! and by any presentation layer that wants release or key-insertion events:
//! - `release` - polls the latest release of a project with adaptive backoff
//! - `presence` - relays reader insertions as events with deferred device open
//! - `channel` - the event stream and handoff shared by every monitor
//! - `diagnostics` - injected observability sink
//! - `config` - file and environment configuration
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  ReleaseObservation  ┌──────────────────┐
//! │  ReleaseMonitor  │─────────────────────▶│                  │
//! │ (fetch / sleep)  │   EventStream (1)    │                  │
//! └──────────────────┘                      │     consumer     │
//! ┌──────────────────┐  InsertionEvent      │ (UI, daemon log) │
//! │  PresenceRelay   │─────────────────────▶│                  │
//! │ (filter feed)    │   EventStream (1)    │                  │
//! └────────▲─────────┘                      └──────────────────┘
//!          │ PresenceChange
//!  ┌───────┴────────┐
//!  │ presence feed  │ (external)
//!  └────────────────┘
//! ```
//!
//! Each monitor owns one worker task and one output channel. Shutdown is
//! cooperative through a `CancellationToken`; the closing of the output
//! channel is the only termination signal consumers see.
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod presence;
pub mod release;

pub use channel::{EventStream, EVENT_BUFFER};
pub use diagnostics::{Diagnostic, DiagnosticSink, StopReason, TracingSink};
pub use error::MonitorError;
