//! Parsing of `runmqsc` queue depth reports
//!
//! A report holds one block per matched queue:
//!
//! ```text
//! AMQ8409I: Display Queue details.
//!    QUEUE(ORDERS)               TYPE(QLOCAL)
//!      CURDEPTH(3)
//! ```
//!
//! The format is produced by a third party tool, so parsing is lenient:
//! anything that does not look like a queue or depth line is skipped.
use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;

/// Queue name to current depth
pub type QueueDepths = BTreeMap<String, i64>;

static QUEUE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^QUEUE\((.+)\)\s*TYPE").expect("valid queue pattern"));
static DEPTH_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CURDEPTH\((.*)\)").expect("valid depth pattern"));

/// Extract the queue depths from a `display ql(..) curdepth` report
///
/// A depth is only recorded against the most recent `QUEUE(..)` line that has
/// not already received one. Depth lines without such a queue, and depth values
/// that are not non-negative integers, are dropped.
///
/// ```
/// let depths = qdepth_core::parse_queue_depths("QUEUE(A) TYPE(QLOCAL)\nCURDEPTH(7)\n");
/// assert_eq!(depths.get("A"), Some(&7));
/// ```
pub fn parse_queue_depths(output: &str) -> QueueDepths {
    let mut depths = QueueDepths::new();
    let mut pending: Option<&str> = None;

    for line in output.lines().map(str::trim) {
        if let Some(caps) = QUEUE_LINE.captures(line) {
            pending = caps.get(1).map(|m| m.as_str());
            continue;
        }
        let Some(caps) = DEPTH_LINE.captures(line) else {
            continue;
        };
        if pending.is_none() {
            continue;
        }
        let value = caps.get(1).map_or("", |m| m.as_str());
        // a malformed value leaves the queue pending for a later depth line
        if let Some(depth) = parse_depth(value) {
            if let Some(queue) = pending.take() {
                depths.insert(queue.to_owned(), depth);
            }
        }
    }
    depths
}

fn parse_depth(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().filter(|depth| *depth >= 0)
}
