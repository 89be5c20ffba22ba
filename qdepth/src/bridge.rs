//! Piping local streams through a remote session
//!
//! [`upload`] feeds a local source into the remote stdin and [`download`]
//! drains the remote stdout into a local sink. In both cases the copy runs in
//! a background [`Transfer`] that always closes the pipe it writes to, so the
//! side reading from that pipe sees end of stream even when the copy fails.
use std::io;

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    task::JoinHandle,
};
use tracing::debug;

use crate::exec::{capture, Executor, Output, SessionError};
use qdepth_core::{Mode, SessionTarget};

/// Size of the in-memory pipe between the remote stdout and the local sink
const PIPE_BUF: usize = 8 * 1024;

/// A background copy from a reader into a writer
///
/// The writer is shut down once the copy ends, successfully or not. Dropping an
/// unfinished transfer aborts it, which drops (and thereby closes) the writer.
pub struct Transfer {
    task: Option<JoinHandle<io::Result<u64>>>,
}

impl Transfer {
    /// Start copying `reader` into `writer`
    pub fn spawn<R, W>(mut reader: R, mut writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let task = tokio::spawn(async move {
            let copied = tokio::io::copy(&mut reader, &mut writer).await;
            let closed = writer.shutdown().await;
            let copied = copied?;
            closed?;
            Ok(copied)
        });
        Self { task: Some(task) }
    }

    /// Wait for the copy to end, returning the number of bytes copied
    pub async fn finish(mut self) -> io::Result<u64> {
        let Some(task) = self.task.take() else {
            return Ok(0);
        };
        match task.await {
            Ok(copied) => copied,
            Err(err) => Err(io::Error::other(err)),
        }
    }
}

impl Drop for Transfer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Outcome of a piped session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transferred {
    /// Bytes moved through the piped direction
    pub bytes: u64,
    /// Output that was captured rather than piped
    pub output: Output,
}

/// Run `target` with `source` as its stdin
///
/// The remote stdout and stderr are captured. A failure to read `source` fails
/// the upload after the remote command has seen end of input.
///
/// A successful upload only means every byte reached the remote stdin. Over
/// [`PodExecutor`](crate::PodExecutor) the apiserver closes the stream once
/// stdin ends, before the command reports an exit status, so a remote command
/// that fails after reading its input (e.g. `cat > path` on a read-only
/// filesystem) is not reported as [`SessionError::Command`]. Check the
/// returned stderr, or read the file back with [`download`].
pub async fn upload<E, R>(executor: &E, target: &SessionTarget, source: R) -> Result<Transferred, SessionError>
where
    E: Executor,
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut session = executor.open(target, Mode::Upload).await?;
    let name = session.target().to_owned();
    let stdin = session
        .stdin()
        .ok_or_else(|| SessionError::transfer(&name, "session has no stdin"))?;

    let transfer = Transfer::spawn(source, stdin);
    let (captured, copied) = tokio::join!(capture(session), transfer.finish());
    let output = captured?;
    let bytes = copied.map_err(|err| SessionError::transfer(&name, err).with_partial(output.clone()))?;
    debug!(session = %name, bytes, "upload complete");
    Ok(Transferred { bytes, output })
}

/// Run `target`, writing its stdout into `sink`
///
/// The remote stderr is captured. Bytes reach `sink` in the order the remote
/// command wrote them; the call returns once `sink` has received everything.
pub async fn download<E, W>(
    executor: &E,
    target: &SessionTarget,
    sink: &mut W,
) -> Result<Transferred, SessionError>
where
    E: Executor,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut session = executor.open(target, Mode::Download).await?;
    let name = session.target().to_owned();
    let stdout = session
        .stdout()
        .ok_or_else(|| SessionError::transfer(&name, "session has no stdout"))?;

    let (pipe_writer, pipe_reader) = tokio::io::duplex(PIPE_BUF);
    let transfer = Transfer::spawn(stdout, pipe_writer);
    let delivered = async {
        // owned here so a failing sink drops the pipe and unblocks the transfer
        let mut pipe_reader = pipe_reader;
        let bytes = tokio::io::copy(&mut pipe_reader, sink).await?;
        sink.flush().await?;
        Ok::<_, io::Error>(bytes)
    };
    let (captured, drained, delivered) = tokio::join!(capture(session), transfer.finish(), delivered);

    let output = captured?;
    let fail = |err: io::Error| SessionError::transfer(&name, err).with_partial(output.clone());
    drained.map_err(fail)?;
    let bytes = delivered.map_err(fail)?;
    debug!(session = %name, bytes, "download complete");
    Ok(Transferred { bytes, output })
}
