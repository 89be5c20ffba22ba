//! Runs the queue depth diagnostic command
use std::time::Duration;

use tracing::{debug, info};

use crate::exec::{capture_until, Deadline, Executor, SessionError};
use qdepth_core::{command, Mode, SessionTarget};

/// Where and what to query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueQuery {
    /// Pod running the queue manager
    pub pod: String,
    /// Container running the queue manager
    pub container: String,
    /// Namespace of the pod
    pub namespace: String,
    /// Queue name, possibly generic (`*`, `APP.*`)
    pub queue: String,
    /// Queue manager name
    pub manager: String,
}

impl QueueQuery {
    /// The session target of the diagnostic command
    pub fn target(&self) -> SessionTarget {
        SessionTarget::new(
            &self.pod,
            &self.container,
            &self.namespace,
            command::display_queue_depth(&self.queue, &self.manager),
        )
    }
}

/// Runs the diagnostic command in capture mode
pub struct CommandRunner<E> {
    executor: E,
    target: SessionTarget,
    timeout: Option<Duration>,
}

impl<E: Executor> CommandRunner<E> {
    /// A runner for `query`, bounding each run by `timeout` when given
    pub fn new(executor: E, query: &QueueQuery, timeout: Option<Duration>) -> Self {
        Self {
            executor,
            target: query.target(),
            timeout,
        }
    }

    /// Run the command once and return its stdout
    ///
    /// stderr is logged but does not fail the run; `runmqsc` writes banners there.
    /// Opening and running share one deadline. Output read before it expires is
    /// kept on the resulting [`SessionError::Timeout`].
    pub async fn run(&self) -> Result<String, SessionError> {
        let deadline = self.timeout.map(Deadline::after);
        let open = self.executor.open(&self.target, Mode::Capture);
        let session = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline.at(), open)
                .await
                .map_err(|_| SessionError::timeout(&self.target.to_string(), deadline))??,
            None => open.await?,
        };
        let output = capture_until(session, deadline).await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(%stdout, "diagnostic stdout");
        if !output.stderr.is_empty() {
            info!(stderr = %String::from_utf8_lossy(&output.stderr), "diagnostic stderr");
        }
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::fake::{FakeExecutor, Reply};

    fn query() -> QueueQuery {
        QueueQuery {
            pod: "qm-0".into(),
            container: "mq".into(),
            namespace: "messaging".into(),
            queue: "*".into(),
            manager: "QM1".into(),
        }
    }

    #[tokio::test]
    async fn runs_diagnostic_command_in_capture_mode() {
        let exec = FakeExecutor::new([Reply::output("QUEUE(A) TYPE(QLOCAL)\n", "")]);
        let runner = CommandRunner::new(exec.clone(), &query(), None);
        assert_eq!(runner.run().await.unwrap(), "QUEUE(A) TYPE(QLOCAL)\n");

        let calls = exec.calls();
        assert_eq!(calls.len(), 1);
        let (target, mode) = &calls[0];
        assert_eq!(*mode, Mode::Capture);
        assert_eq!((target.pod(), target.container(), target.namespace()), ("qm-0", "mq", "messaging"));
        assert_eq!(target.command()[2], r#"echo "display ql(*) curdepth" | runmqsc -e QM1"#);
    }

    #[tokio::test]
    async fn stderr_alone_is_not_a_failure() {
        let exec = FakeExecutor::new([Reply::output("", "Starting MQSC for queue manager QM1.\n")]);
        let runner = CommandRunner::new(exec, &query(), None);
        assert_eq!(runner.run().await.unwrap(), "");
    }

    #[tokio::test]
    async fn failure_status_is_an_error() {
        let exec = FakeExecutor::new([Reply::failed("", "AMQ8118E\n")]);
        let runner = CommandRunner::new(exec, &query(), None);
        assert!(matches!(runner.run().await, Err(SessionError::Command { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_command_times_out() {
        let exec = FakeExecutor::new([Reply::Stall { stdout: Vec::new() }]);
        let runner = CommandRunner::new(exec, &query(), Some(Duration::from_secs(5)));
        match runner.run().await {
            Err(SessionError::Timeout { timeout, .. }) => assert_eq!(timeout, Duration::from_secs(5)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_keeps_report_printed_before_stall() {
        let report = "QUEUE(ORDERS) TYPE(QLOCAL)\nCURDEPTH(3)\n";
        let exec = FakeExecutor::new([Reply::Stall {
            stdout: report.as_bytes().to_vec(),
        }]);
        let runner = CommandRunner::new(exec, &query(), Some(Duration::from_secs(5)));
        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, SessionError::Timeout { .. }));
        assert_eq!(err.partial_output().unwrap().stdout, report.as_bytes());
    }
}
