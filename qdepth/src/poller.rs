//! The timer driven query, parse and publish loop
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    exec::{Executor, SessionError},
    metrics::QueueDepthGauge,
    runner::CommandRunner,
};
use qdepth_core::{parse_queue_depths, OverrideStore, QueueDepths};

/// Periodically publishes queue depths read from the queue manager
///
/// Cycles never overlap: the next wait only starts once a cycle has published.
pub struct Poller<E> {
    runner: CommandRunner<E>,
    gauge: QueueDepthGauge,
    overrides: OverrideStore,
    interval: Duration,
}

impl<E: Executor> Poller<E> {
    /// A poller publishing into `gauge` every `interval`
    pub fn new(
        runner: CommandRunner<E>,
        gauge: QueueDepthGauge,
        overrides: OverrideStore,
        interval: Duration,
    ) -> Self {
        Self {
            runner,
            gauge,
            overrides,
            interval,
        }
    }

    /// Run one cycle
    ///
    /// On a session failure nothing real is published and previously published
    /// values stay as they are. An active override is published either way,
    /// after any real reading, so it wins over a reading for the same queue.
    pub async fn poll_once(&self) -> Result<QueueDepths, SessionError> {
        let polled = self.runner.run().await.map(|stdout| parse_queue_depths(&stdout));
        match &polled {
            Ok(depths) => {
                for (queue, depth) in depths {
                    self.gauge.set(queue, *depth);
                }
                debug!(queues = depths.len(), "published queue depths");
            }
            Err(err) => warn!(error = %err, "failed to get queue depth"),
        }

        let state = self.overrides.read();
        if state.active {
            self.gauge.set(&state.queue_name, state.depth);
        }
        polled
    }

    /// Poll until `shutdown` is cancelled
    ///
    /// Cancellation interrupts both the wait and an in-flight cycle.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval = ?self.interval, "starting queue depth poller");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.poll_once() => {}
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("queue depth poller stopped");
    }
}
