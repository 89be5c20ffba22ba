//! Prometheus exporter for MQ queue depths read through Kubernetes exec
//!
//! The exporter never talks to the queue manager directly. Every poll it runs
//! `runmqsc` inside the queue manager's container through the `pods/exec`
//! subresource, parses the report and publishes one gauge series per queue.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use qdepth::{CommandRunner, Metrics, PodExecutor, Poller, QueueQuery};
//! use qdepth_core::OverrideStore;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = kube::Client::try_default().await?;
//!     let query = QueueQuery {
//!         pod: "qm-0".into(),
//!         container: "mq".into(),
//!         namespace: "messaging".into(),
//!         queue: "*".into(),
//!         manager: "QM1".into(),
//!     };
//!     let runner = CommandRunner::new(PodExecutor::new(client), &query, Some(Duration::from_secs(60)));
//!     let metrics = Metrics::new()?;
//!     let poller = Poller::new(runner, metrics.queue_depth.clone(), OverrideStore::new(), Duration::from_secs(30));
//!     poller.run(CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;

pub mod error;
pub use error::{Error, Result};

pub mod exec;
pub use exec::{Deadline, Executor, Output, PodExecutor, Session, SessionError};

pub mod metrics;
pub use metrics::{Metrics, QueueDepthGauge};

pub mod poller;
pub use poller::Poller;

pub mod runner;
pub use runner::{CommandRunner, QueueQuery};

pub mod server;
