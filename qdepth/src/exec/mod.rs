//! Remote command execution against a single container
//!
//! An [`Executor`] opens a [`Session`] for a [`SessionTarget`]. A session owns
//! exactly one remote stream and exposes up to three pipes: a writer for the
//! remote stdin and readers for the remote stdout and stderr. Which pipes are
//! present is decided by the [`Mode`] it was opened with.
//!
//! [`capture`] is the common case: run a command and collect everything it
//! prints. The piped upload/download transfers live in [`crate::bridge`].
use std::{fmt, future::Future, io, time::Duration};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite},
    time::Instant,
};
use tracing::warn;

use qdepth_core::{Mode, SessionTarget};

mod pod;
pub use pod::PodExecutor;

#[cfg(test)] pub(crate) mod fake;

/// A boxed, thread safe error cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub(crate) type Reader = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Opens remote execution sessions
pub trait Executor: Send + Sync {
    /// Start `target`'s command with the pipes required by `mode`
    ///
    /// Fails with [`SessionError::Open`] when the session cannot be established.
    fn open(
        &self,
        target: &SessionTarget,
        mode: Mode,
    ) -> impl Future<Output = Result<Session, SessionError>> + Send;
}

/// Everything a remote command printed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output {
    /// Bytes written to stdout
    pub stdout: Vec<u8>,
    /// Bytes written to stderr
    pub stderr: Vec<u8>,
}

impl Output {
    /// Whether nothing at all was captured
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stdout: {:?}, stderr: {:?}",
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr)
        )
    }
}

/// Failures of a remote execution session
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session could not be established
    #[error("failed to open exec session to {target}: {source}")]
    Open {
        /// The session target
        target: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// The stream failed after it had started
    #[error("exec session to {target} failed mid-stream: {source}")]
    Transfer {
        /// The session target
        target: String,
        /// Underlying cause
        #[source]
        source: BoxError,
        /// Output received before the failure
        partial: Output,
    },

    /// The remote command reported a failure status
    #[error("command in {target} failed ({reason}): {message}")]
    Command {
        /// The session target
        target: String,
        /// Status reason, e.g. `NonZeroExitCode`
        reason: String,
        /// Status message
        message: String,
        /// Output received before the command exited
        partial: Output,
    },

    /// The remote command did not complete in time
    #[error("command in {target} did not finish within {timeout:?}")]
    Timeout {
        /// The session target
        target: String,
        /// The bound that was exceeded
        timeout: Duration,
        /// Output received before the bound expired
        partial: Output,
    },
}

impl SessionError {
    /// Output captured before a mid-stream failure
    pub fn partial_output(&self) -> Option<&Output> {
        match self {
            Self::Transfer { partial, .. } | Self::Command { partial, .. } | Self::Timeout { partial, .. } => {
                Some(partial)
            }
            Self::Open { .. } => None,
        }
    }

    pub(crate) fn transfer(target: &str, source: impl Into<BoxError>) -> Self {
        Self::Transfer {
            target: target.to_owned(),
            source: source.into(),
            partial: Output::default(),
        }
    }

    pub(crate) fn timeout(target: &str, deadline: Deadline) -> Self {
        Self::Timeout {
            target: target.to_owned(),
            timeout: deadline.limit,
            partial: Output::default(),
        }
    }

    pub(crate) fn with_partial(mut self, output: Output) -> Self {
        if let Self::Transfer { partial, .. } | Self::Command { partial, .. } | Self::Timeout { partial, .. } =
            &mut self
        {
            if partial.is_empty() {
                *partial = output;
            }
        }
        self
    }
}

/// One running remote command
///
/// Not reusable: the stream is consumed by [`Session::finish`].
pub struct Session {
    target: String,
    stdin: Option<Writer>,
    stdout: Option<Reader>,
    stderr: Option<Reader>,
    finished: BoxFuture<'static, Result<(), SessionError>>,
}

impl Session {
    /// A session for `target` that completes with `finished`
    ///
    /// `finished` resolves once the remote stream has terminated.
    pub fn new<F>(target: &SessionTarget, finished: F) -> Self
    where
        F: Future<Output = Result<(), SessionError>> + Send + 'static,
    {
        Self {
            target: target.to_string(),
            stdin: None,
            stdout: None,
            stderr: None,
            finished: Box::pin(finished),
        }
    }

    /// Attach the writer feeding the remote stdin
    pub fn with_stdin(mut self, stdin: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stdin = Some(Box::new(stdin));
        self
    }

    /// Attach the reader for the remote stdout
    pub fn with_stdout(mut self, stdout: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.stdout = Some(Box::new(stdout));
        self
    }

    /// Attach the reader for the remote stderr
    pub fn with_stderr(mut self, stderr: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.stderr = Some(Box::new(stderr));
        self
    }

    /// Display name of the target, `namespace/pod[container]`
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Take the remote stdin writer; dropping or shutting it down ends the input
    pub fn stdin(&mut self) -> Option<impl AsyncWrite + Send + Unpin> {
        self.stdin.take()
    }

    /// Take the remote stdout reader
    pub fn stdout(&mut self) -> Option<impl AsyncRead + Send + Unpin> {
        self.stdout.take()
    }

    /// Take the remote stderr reader
    pub fn stderr(&mut self) -> Option<impl AsyncRead + Send + Unpin> {
        self.stderr.take()
    }

    /// Wait for the remote stream to terminate
    ///
    /// Pipes that were not taken are dropped first so the stream cannot stall on them.
    pub async fn finish(self) -> Result<(), SessionError> {
        let Session {
            stdin,
            stdout,
            stderr,
            finished,
            ..
        } = self;
        drop((stdin, stdout, stderr));
        finished.await
    }
}

/// The point in time by which a session has to have finished
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    /// A deadline `limit` from now
    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now() + limit,
            limit,
        }
    }

    /// The instant the deadline expires
    pub fn at(&self) -> Instant {
        self.at
    }

    /// The bound the deadline was created with
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

/// Run a session to completion, collecting stdout and stderr
///
/// On failure the output received so far is attached to the error and logged.
pub async fn capture(session: Session) -> Result<Output, SessionError> {
    capture_until(session, None).await
}

/// Like [`capture`], but gives up with [`SessionError::Timeout`] at `deadline`
///
/// Output read before the deadline is kept as the error's partial output.
pub async fn capture_until(mut session: Session, deadline: Option<Deadline>) -> Result<Output, SessionError> {
    let target = session.target().to_owned();
    let stdout = session.stdout.take();
    let stderr = session.stderr.take();
    let mut output = Output::default();

    let exchange = async {
        tokio::join!(
            drain(stdout, &mut output.stdout),
            drain(stderr, &mut output.stderr),
            session.finish()
        )
    };
    let exchanged = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline.at, exchange)
            .await
            .map_err(|_| SessionError::timeout(&target, deadline)),
        None => Ok(exchange.await),
    };

    let result = match exchanged {
        Err(err) => Err(err),
        Ok((out_err, err_err, finished)) => match (finished, out_err.or(err_err)) {
            (Err(err), _) => Err(err),
            (Ok(()), Some(read_err)) => Err(SessionError::transfer(&target, read_err)),
            (Ok(()), None) => Ok(()),
        },
    };
    match result {
        Ok(()) => Ok(output),
        Err(err) => {
            let err = err.with_partial(output);
            if let Some(partial) = err.partial_output().filter(|p| !p.is_empty()) {
                warn!(session = %target, %partial, "partial output before session failure");
            }
            Err(err)
        }
    }
}

// Reads until EOF into `buf`. Whatever arrived stays in `buf` if the read is
// cancelled or fails.
async fn drain(reader: Option<Reader>, buf: &mut Vec<u8>) -> Option<io::Error> {
    let mut reader = reader?;
    let mut chunk = [0; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(err) => return Some(err),
        }
    }
}
