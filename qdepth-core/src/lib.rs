//! Core types for the qdepth queue depth exporter
//!
//! This crate contains the I/O free pieces of the exporter:
//!
//! - [`SessionTarget`] and [`Mode`] describing one remote execution attempt
//! - [`command`] builders for the diagnostic and file transfer commands
//! - [`parse_queue_depths`] turning `runmqsc` reports into queue depths
//! - [`OverrideStore`] holding the manual test override
//!
//! The runtime pieces (the Kubernetes exec channel, the poll loop and the
//! HTTP surface) live in the `qdepth` crate.

pub mod command;

pub mod error;
pub use error::ValidationError;

pub mod overrides;
pub use overrides::{OverrideRequest, OverrideState, OverrideStore};

pub mod parse;
pub use parse::{parse_queue_depths, QueueDepths};

pub mod target;
pub use target::{Mode, SessionTarget};
