//! Sessions over the Kubernetes `pods/exec` subresource
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, AttachParams, AttachedProcess},
    Client,
};
use tracing::{debug, info};

use super::{Executor, Session, SessionError};
use qdepth_core::{Mode, SessionTarget};

/// Status reported by the apiserver when the remote command fails
const FAILURE: &str = "Failure";

/// Executes commands in pod containers through a kube [`Client`]
#[derive(Clone)]
pub struct PodExecutor {
    client: Client,
}

impl PodExecutor {
    /// An executor using `client` for every session
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Executor for PodExecutor {
    async fn open(&self, target: &SessionTarget, mode: Mode) -> Result<Session, SessionError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), target.namespace());
        let ap = AttachParams::default()
            .container(target.container())
            .stdin(mode.stdin())
            .stdout(mode.stdout())
            .stderr(mode.stderr())
            .tty(false);
        info!(
            pod = target.pod(),
            container = target.container(),
            namespace = target.namespace(),
            ?mode,
            "opening exec session"
        );
        debug!(command = ?target.command(), "exec command");

        let mut process = pods
            .exec(target.pod(), target.command().to_vec(), &ap)
            .await
            .map_err(|source| SessionError::Open {
                target: target.to_string(),
                source: source.into(),
            })?;

        let stdin = process.stdin();
        let stdout = process.stdout();
        let stderr = process.stderr();
        let status = process.take_status();
        let name = target.to_string();
        let mut running = Running(Some(process));
        let finished = async move {
            let status = match status {
                Some(status) => status.await,
                None => None,
            };
            if let Some(process) = running.0.take() {
                process
                    .join()
                    .await
                    .map_err(|err| SessionError::transfer(&name, err))?;
            }
            match status {
                Some(status) if status.status.as_deref() == Some(FAILURE) => Err(SessionError::Command {
                    target: name,
                    reason: status.reason.unwrap_or_default(),
                    message: status.message.unwrap_or_default(),
                    partial: Default::default(),
                }),
                // the stream may close without a status once stdin is done
                _ => Ok(()),
            }
        };

        let mut session = Session::new(target, finished);
        if let Some(stdin) = stdin {
            session = session.with_stdin(stdin);
        }
        if let Some(stdout) = stdout {
            session = session.with_stdout(stdout);
        }
        if let Some(stderr) = stderr {
            session = session.with_stderr(stderr);
        }
        Ok(session)
    }
}

// Aborts the message loop of a session that is dropped before it finished.
struct Running(Option<AttachedProcess>);

impl Drop for Running {
    fn drop(&mut self) {
        if let Some(process) = self.0.take() {
            process.abort();
        }
    }
}
