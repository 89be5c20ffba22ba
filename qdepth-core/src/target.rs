//! Identifies one remote execution attempt
use std::fmt;

/// A command to run in a specific container of a specific pod
///
/// Immutable once constructed; every remote execution is described by exactly one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionTarget {
    pod: String,
    container: String,
    namespace: String,
    command: Vec<String>,
}

impl SessionTarget {
    /// Target `command` inside `container` of the pod `pod` in `namespace`
    pub fn new<I, T>(
        pod: impl Into<String>,
        container: impl Into<String>,
        namespace: impl Into<String>,
        command: I,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            pod: pod.into(),
            container: container.into(),
            namespace: namespace.into(),
            command: command.into_iter().map(Into::into).collect(),
        }
    }

    /// Name of the pod
    pub fn pod(&self) -> &str {
        &self.pod
    }

    /// Name of the container within the pod
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Namespace of the pod
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The command and its arguments, in order
    pub fn command(&self) -> &[String] {
        &self.command
    }
}

impl fmt::Display for SessionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}[{}]", self.namespace, self.pod, self.container)
    }
}

/// Which streams of a remote session are wired up
///
/// Only one direction is ever piped per session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// No stdin; stdout and stderr are collected into memory
    Capture,
    /// stdin is fed from a local source; stdout and stderr are collected
    Upload,
    /// stdout is drained into a local sink; stderr is collected
    Download,
}

impl Mode {
    /// Whether the remote stdin is attached
    pub fn stdin(self) -> bool {
        matches!(self, Mode::Upload)
    }

    /// Whether the remote stdout is attached
    pub fn stdout(self) -> bool {
        true
    }

    /// Whether the remote stderr is attached
    pub fn stderr(self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_keeps_command_order() {
        let target = SessionTarget::new("qm-0", "mq", "messaging", ["sh", "-c", "true"]);
        assert_eq!(target.command(), ["sh", "-c", "true"]);
        assert_eq!(target.to_string(), "messaging/qm-0[mq]");
    }

    #[test]
    fn only_upload_attaches_stdin() {
        assert!(!Mode::Capture.stdin());
        assert!(Mode::Upload.stdin());
        assert!(!Mode::Download.stdin());
        assert!(Mode::Download.stdout() && Mode::Download.stderr());
    }
}
