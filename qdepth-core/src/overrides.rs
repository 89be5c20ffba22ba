//! Manually injected queue depth used to exercise the metrics pipeline
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ValidationError;

/// Queue name that deactivates the override
pub const CLEAR: &str = "CLEAR";

/// Snapshot of the current override
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverrideState {
    /// Queue the override publishes under
    pub queue_name: String,
    /// Depth to publish
    pub depth: i64,
    /// Whether the override is published at all
    ///
    /// False for an empty queue name or [`CLEAR`].
    pub active: bool,
}

impl OverrideState {
    fn new(queue_name: String, depth: i64) -> Self {
        let active = !queue_name.is_empty() && queue_name != CLEAR;
        Self {
            queue_name,
            depth,
            active,
        }
    }
}

/// Shared holder of the single manual override
///
/// Clones share the same state. Reads and writes are serialized behind a mutex
/// and never perform I/O while holding it.
#[derive(Clone, Debug, Default)]
pub struct OverrideStore {
    state: Arc<Mutex<OverrideState>>,
}

impl OverrideStore {
    /// A store with an inactive override
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the override
    pub fn set(&self, queue_name: impl Into<String>, depth: i64) {
        let state = OverrideState::new(queue_name.into(), depth);
        *self.state.lock() = state;
    }

    /// A consistent snapshot of the override
    pub fn read(&self) -> OverrideState {
        self.state.lock().clone()
    }
}

/// A validated override request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverrideRequest {
    /// Queue name as given by the caller
    pub queue_name: String,
    /// Depth as given by the caller
    pub depth: i64,
}

impl OverrideRequest {
    /// Validate the raw `q` and `d` parameters of an override request
    pub fn from_params(queue: Option<&str>, depth: Option<&str>) -> Result<Self, ValidationError> {
        let queue_name = queue.ok_or(ValidationError::MissingQueue)?;
        let depth = depth.ok_or(ValidationError::MissingDepth)?;
        let depth = depth
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidDepth(depth.to_owned()))?;
        Ok(Self {
            queue_name: queue_name.to_owned(),
            depth,
        })
    }

    /// Store this request as the current override
    pub fn apply(self, store: &OverrideStore) {
        store.set(self.queue_name, self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_inactive() {
        assert_eq!(OverrideStore::new().read(), OverrideState::default());
        assert!(!OverrideStore::new().read().active);
    }

    #[test]
    fn set_activates_named_queue() {
        let store = OverrideStore::new();
        store.set("Q1", 5);
        assert_eq!(store.read(), OverrideState {
            queue_name: "Q1".into(),
            depth: 5,
            active: true,
        });
    }

    #[test]
    fn clear_and_empty_deactivate() {
        let store = OverrideStore::new();
        store.set("Q1", 5);
        store.set(CLEAR, 9);
        assert!(!store.read().active);

        store.set("Q1", 5);
        store.set("", 9);
        assert!(!store.read().active);
    }

    #[test]
    fn clones_share_state() {
        let store = OverrideStore::new();
        let handle = store.clone();
        handle.set("Q2", 7);
        assert_eq!(store.read().queue_name, "Q2");
    }

    #[test]
    fn request_validation() {
        assert_eq!(
            OverrideRequest::from_params(None, Some("1")),
            Err(ValidationError::MissingQueue)
        );
        assert_eq!(
            OverrideRequest::from_params(Some("Q"), None),
            Err(ValidationError::MissingDepth)
        );
        assert!(matches!(
            OverrideRequest::from_params(Some("Q"), Some("ten")),
            Err(ValidationError::InvalidDepth(d)) if d == "ten"
        ));
        assert_eq!(
            OverrideRequest::from_params(Some("ORDERS"), Some("42")),
            Ok(OverrideRequest {
                queue_name: "ORDERS".into(),
                depth: 42
            })
        );
    }

    #[test]
    fn applied_request_is_readable() {
        let store = OverrideStore::new();
        OverrideRequest::from_params(Some("ORDERS"), Some("42"))
            .unwrap()
            .apply(&store);
        let state = store.read();
        assert!(state.active);
        assert_eq!((state.queue_name.as_str(), state.depth), ("ORDERS", 42));
    }
}
