//! Errors raised while assembling the exporter
use thiserror::Error;

/// Possible errors when setting up or serving the exporter
#[derive(Error, Debug)]
pub enum Error {
    /// A metric could not be created, registered or encoded
    #[error("metrics error: {0}")]
    Metrics(#[source] prometheus::Error),

    /// Encoded metrics were not valid UTF-8
    #[error("UTF-8 error: {0}")]
    FromUtf8(#[source] std::string::FromUtf8Error),

    /// The HTTP listener could not be bound or failed while serving
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),

    /// No Kubernetes client could be constructed
    #[error("failed to create kube client: {0}")]
    Kube(#[source] kube::Error),
}

/// Convenient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
