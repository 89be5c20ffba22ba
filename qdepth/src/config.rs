//! Command line and environment configuration
//!
//! Every option can be given as a flag or as an `EXP_` prefixed environment
//! variable, e.g. `EXP_MQ_POD_NAME=qm-0`.
use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};

use crate::runner::QueueQuery;
use qdepth_core::SessionTarget;

/// Prometheus exporter for MQ queue depths
#[derive(Parser, Debug)]
#[command(name = "qdepth", version, about)]
pub struct Cli {
    /// The queue manager container
    #[command(flatten)]
    pub target: TargetArgs,

    /// What to do; `serve` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// The container that commands are executed in
#[derive(Args, Clone, Debug)]
pub struct TargetArgs {
    /// Pod running the queue manager
    #[arg(long, env = "EXP_MQ_POD_NAME")]
    pub mq_pod_name: String,

    /// Namespace of the pod
    #[arg(long, env = "EXP_MQ_NAMESPACE")]
    pub mq_namespace: String,

    /// Container running the queue manager
    #[arg(long, env = "EXP_MQ_CONTAINER")]
    pub mq_container: String,
}

impl TargetArgs {
    /// Target `command` at the configured container
    pub fn target(&self, command: Vec<String>) -> SessionTarget {
        SessionTarget::new(&self.mq_pod_name, &self.mq_container, &self.mq_namespace, command)
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the exporter
    Serve(ServeArgs),
    /// Upload a local file into the container
    Put {
        /// File to upload
        local: PathBuf,
        /// Destination path inside the container
        remote: String,
    },
    /// Download a file from the container
    Get {
        /// Path inside the container
        remote: String,
        /// Local destination file
        local: PathBuf,
    },
}

/// Exporter options
#[derive(Parser, Clone, Debug)]
pub struct ServeArgs {
    /// Port to serve /metrics and /testQueue on
    #[arg(long, env = "EXP_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Queue to report, generic names such as `*` allowed
    #[arg(long, env = "EXP_MQ_QUEUE_NAME")]
    pub mq_queue_name: String,

    /// Queue manager name
    #[arg(long, env = "EXP_MQ_MANAGER")]
    pub mq_manager: String,

    /// Seconds between polls
    #[arg(long, env = "EXP_POLL_INTERVAL", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,

    /// Seconds a poll may take before it is abandoned, 0 for no limit
    #[arg(long, env = "EXP_EXEC_TIMEOUT", default_value_t = 60)]
    pub exec_timeout: u64,
}

impl ServeArgs {
    /// Options taken from the environment alone, used when no subcommand is given
    pub fn from_env() -> Self {
        Self::parse_from(["serve"])
    }

    /// Time between the end of one poll and the start of the next
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Bound on a single diagnostic exec
    pub fn exec_timeout(&self) -> Option<Duration> {
        (self.exec_timeout > 0).then(|| Duration::from_secs(self.exec_timeout))
    }

    /// The diagnostic query against `target`
    pub fn query(&self, target: &TargetArgs) -> QueueQuery {
        QueueQuery {
            pod: target.mq_pod_name.clone(),
            container: target.mq_container.clone(),
            namespace: target.mq_namespace.clone(),
            queue: self.mq_queue_name.clone(),
            manager: self.mq_manager.clone(),
        }
    }
}
