//! Structured logging facility for the command engine
//!
//! Two layers of logging exist side by side:
//! - the per-command text lines (`Command X : Idle -> Executing`) that go to
//!   a [`crate::log::LogSink`] handed in through a `RunContext`
//! - structured `tracing` events around every `run` call, emitted with the
//!   macros below and carrying `component`, `op`, `event`, `command`, `run_id`
//!   and `state` fields
//!
//! This module owns the second layer: subscriber set-up via `init(profile)`,
//! the `log_op_*` macros, and an in-memory capture layer for tests.
//!
//! ```rust
//! use excmd_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
