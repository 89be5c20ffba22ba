//! Errors surfaced by the override boundary
use thiserror::Error;

/// Validation failures for a manual override request
///
/// The `Display` output doubles as the HTTP 400 response body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The `q` query parameter was not supplied
    #[error("queue name is missing.")]
    MissingQueue,

    /// The `d` query parameter was not supplied
    #[error("queue depth is missing. Example: d=100")]
    MissingDepth,

    /// The `d` query parameter was supplied but is not an integer
    #[error("queue depth is not an integer: {0:?}. Example: d=100")]
    InvalidDepth(String),
}
