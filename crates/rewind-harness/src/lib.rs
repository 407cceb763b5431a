#![forbid(unsafe_code)]

//! Test harness and reference collaborators for rewind.
//!
//! The engine only sees abstract resources and actions. This crate supplies
//! concrete ones for tests and benches:
//!
//! - [`document`]: an in-memory text document whose edits are reversible
//!   [`TextEdit`] actions
//! - [`confirm`]: a [`ScriptedConfirmer`] that answers from a script and
//!   remembers what it was asked
//! - [`observer`]: a [`RecordingObserver`] that logs history events
//! - [`capture`]: a `tracing` layer that captures spans and events

pub mod capture;
pub mod confirm;
pub mod document;
pub mod observer;

pub use capture::{CaptureHandle, CapturedEvent, CapturedSpan, LogCapture, capture_logs};
pub use confirm::ScriptedConfirmer;
pub use document::{TextDocument, TextEdit};
pub use observer::{HistoryEvent, RecordingObserver};
