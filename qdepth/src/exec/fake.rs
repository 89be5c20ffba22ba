//! Scripted in-memory executor for tests
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{Executor, Session, SessionError};
use qdepth_core::{Mode, SessionTarget};

/// How the fake remote side answers one `open`
pub(crate) enum Reply {
    /// Refuse to open the session
    Refuse(String),
    /// Print the given output, then exit, optionally with a failure status
    Output {
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        failure: Option<(String, String)>,
    },
    /// Print some stdout, then drop the connection
    Break { stdout: Vec<u8> },
    /// Print some stdout, then never finish
    Stall { stdout: Vec<u8> },
}

impl Reply {
    pub(crate) fn output(stdout: &str, stderr: &str) -> Self {
        Reply::Output {
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            failure: None,
        }
    }

    pub(crate) fn failed(stdout: &str, stderr: &str) -> Self {
        Reply::Output {
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            failure: Some(("NonZeroExitCode".into(), "command terminated with exit code 1".into())),
        }
    }
}

#[derive(Default)]
struct State {
    replies: VecDeque<Reply>,
    calls: Vec<(SessionTarget, Mode)>,
    stdin: Vec<u8>,
}

/// Answers each `open` with the next scripted [`Reply`]
///
/// Runs out of script by refusing to open further sessions.
#[derive(Clone, Default)]
pub(crate) struct FakeExecutor {
    state: Arc<Mutex<State>>,
}

impl FakeExecutor {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        let exec = Self::default();
        exec.push(replies);
        exec
    }

    pub(crate) fn push(&self, replies: impl IntoIterator<Item = Reply>) {
        self.state.lock().unwrap().replies.extend(replies);
    }

    pub(crate) fn calls(&self) -> Vec<(SessionTarget, Mode)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Everything uploaded through remote stdin so far
    pub(crate) fn received_stdin(&self) -> Vec<u8> {
        self.state.lock().unwrap().stdin.clone()
    }
}

impl Executor for FakeExecutor {
    async fn open(&self, target: &SessionTarget, mode: Mode) -> Result<Session, SessionError> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((target.clone(), mode));
            state.replies.pop_front()
        };
        let name = target.to_string();
        let (stdout, stderr, failure, broken) = match reply {
            None => {
                return Err(SessionError::Open {
                    target: name,
                    source: "no scripted reply".into(),
                })
            }
            Some(Reply::Refuse(reason)) => {
                return Err(SessionError::Open {
                    target: name,
                    source: reason.into(),
                })
            }
            Some(Reply::Stall { stdout }) => {
                let (mut out_w, out_r) = tokio::io::duplex(64);
                let (err_w, err_r) = tokio::io::duplex(64);
                let session = Session::new(target, async move {
                    let _stderr = err_w;
                    // a failed write means the reader is gone; keep hanging regardless
                    let _ = out_w.write_all(&stdout).await;
                    std::future::pending::<Result<(), SessionError>>().await
                });
                return Ok(session.with_stdout(out_r).with_stderr(err_r));
            }
            Some(Reply::Output {
                stdout,
                stderr,
                failure,
            }) => (stdout, stderr, failure, false),
            Some(Reply::Break { stdout }) => (stdout, Vec::new(), None, true),
        };

        let (mut out_w, out_r) = tokio::io::duplex(64);
        let (mut err_w, err_r) = tokio::io::duplex(64);
        let (in_w, mut in_r) = tokio::io::duplex(64);
        let state = self.state.clone();
        let remote = tokio::spawn(async move {
            if mode.stdin() {
                let mut received = Vec::new();
                in_r.read_to_end(&mut received).await?;
                state.lock().unwrap().stdin.extend(received);
            }
            out_w.write_all(&stdout).await?;
            drop(out_w);
            err_w.write_all(&stderr).await?;
            Ok::<_, std::io::Error>(())
        });

        let session = Session::new(target, async move {
            match remote.await {
                Ok(Ok(())) if broken => Err(SessionError::transfer(&name, "connection reset by peer")),
                Ok(Ok(())) => match failure {
                    Some((reason, message)) => Err(SessionError::Command {
                        target: name,
                        reason,
                        message,
                        partial: Default::default(),
                    }),
                    None => Ok(()),
                },
                Ok(Err(err)) => Err(SessionError::transfer(&name, err)),
                Err(err) => Err(SessionError::transfer(&name, err)),
            }
        });
        let session = session.with_stdout(out_r).with_stderr(err_r);
        Ok(if mode.stdin() { session.with_stdin(in_w) } else { session })
    }
}
