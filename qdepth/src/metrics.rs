//! Prometheus metrics published by the exporter
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::Error;

/// Gauge of the current depth of each queue, labelled by `queue_name`
///
/// Values are overwritten on every set and never removed once created.
#[derive(Clone, Debug)]
pub struct QueueDepthGauge {
    depth: IntGaugeVec,
}

impl QueueDepthGauge {
    fn new() -> Result<Self, prometheus::Error> {
        let opts = Opts::new("queue_depth", "MQ queue depth")
            .namespace("mq")
            .subsystem("mon");
        let depth = IntGaugeVec::new(opts, &["queue_name"])?;
        Ok(Self { depth })
    }

    /// Publish `depth` for `queue`
    pub fn set(&self, queue: &str, depth: i64) {
        self.depth.with_label_values(&[queue]).set(depth);
    }
}

/// The exporter's registry and the metrics registered in it
#[derive(Clone, Debug)]
pub struct Metrics {
    registry: Registry,
    /// Depth per queue
    pub queue_depth: QueueDepthGauge,
}

impl Metrics {
    /// Create and register all metrics in a fresh registry
    pub fn new() -> Result<Self, Error> {
        let registry = Registry::new();
        let queue_depth = QueueDepthGauge::new().map_err(Error::Metrics)?;
        registry
            .register(Box::new(queue_depth.depth.clone()))
            .map_err(Error::Metrics)?;
        Ok(Self { registry, queue_depth })
    }

    /// Render every registered metric in the text exposition format
    pub fn encode(&self) -> Result<String, Error> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(Error::Metrics)?;
        String::from_utf8(buf).map_err(Error::FromUtf8)
    }

    /// Content type of [`Metrics::encode`]
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// The exposed depth of `queue`, read back from the rendered text
    #[cfg(test)]
    pub(crate) fn depth_of(&self, queue: &str) -> Option<i64> {
        let series = format!("mq_mon_queue_depth{{queue_name=\"{queue}\"}} ");
        self.encode()
            .ok()?
            .lines()
            .find_map(|line| line.strip_prefix(series.as_str())?.parse().ok())
    }
}
