//! Core types shared across excmd facilities
//!
//! This crate provides foundational types used by both the command engine
//! and its logging facility:
//!
//! - **Correlation**: `RunId`, the id shared by every command of one run
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::RunId;
