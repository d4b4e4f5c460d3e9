// src/exec/process.rs

//! Subprocess supervision shared by the dependency installer and the worker.
//!
//! - [`wait_supervised`] waits for a child while honouring the run's
//!   deadline and cancellation; an interrupted child is killed.
//! - [`spawn_forwarder`] consumes one output pipe line by line so the child
//!   never blocks on a full buffer.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::control::{Interruption, RunControl};

use super::stdio::OutputCallback;

/// How long output readers may lag behind process exit before being dropped.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Longest line handed to a callback; longer output is split into chunks.
pub const MAX_LINE_BYTES: u64 = 64 * 1024;

/// How a supervised wait ended.
#[derive(Debug)]
pub enum WaitOutcome {
    Exited(ExitStatus),
    Interrupted(Interruption),
}

/// Locate an executable on `PATH` (or validate an explicit path).
pub fn resolve_program(program: &str) -> Result<PathBuf, String> {
    which::which(program).map_err(|e| format!("cannot locate '{program}': {e}"))
}

/// Exit code of a finished process; `-1` when it was terminated by a signal.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Wait for `child` to exit, or kill it once the run is interrupted.
pub async fn wait_supervised(
    child: &mut Child,
    control: &RunControl,
    label: &str,
) -> io::Result<WaitOutcome> {
    if let Some(interruption) = control.check() {
        kill(child, label).await;
        return Ok(WaitOutcome::Interrupted(interruption));
    }

    tokio::select! {
        status = child.wait() => Ok(WaitOutcome::Exited(status?)),

        interruption = control.interrupted() => {
            info!(
                process = label,
                ?interruption,
                "run interrupted; killing process"
            );
            kill(child, label).await;
            Ok(WaitOutcome::Interrupted(interruption))
        }
    }
}

async fn kill(child: &mut Child, label: &str) {
    if let Err(e) = child.kill().await {
        warn!(process = label, error = %e, "failed to kill child process");
    }
}

/// Parent stream a forwarder mirrors captured output to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    Stdout,
    Stderr,
}

impl Mirror {
    async fn write(self, bytes: &[u8]) {
        let res = match self {
            Mirror::Stdout => write_flush(tokio::io::stdout(), bytes).await,
            Mirror::Stderr => write_flush(tokio::io::stderr(), bytes).await,
        };
        if let Err(e) = res {
            debug!(stream = ?self, error = %e, "failed to mirror output");
        }
    }
}

async fn write_flush<W: AsyncWrite + Unpin>(mut out: W, bytes: &[u8]) -> io::Result<()> {
    out.write_all(bytes).await?;
    out.flush().await
}

/// Read `reader` to the end, passing every line to `callback` and, when
/// `mirror` is set, copying the raw bytes to the parent's stream.
///
/// Lines are decoded lossily so binary noise never stops the capture. A line
/// longer than [`MAX_LINE_BYTES`] is delivered in several pieces; a multi-byte
/// character cut at a piece boundary shows up as a replacement character.
pub fn spawn_forwarder<R>(
    reader: R,
    callback: OutputCallback,
    mirror: Option<Mirror>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match (&mut reader)
                .take(MAX_LINE_BYTES)
                .read_until(b'\n', &mut buf)
                .await
            {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    callback(text.trim_end_matches(['\n', '\r']));
                    if let Some(mirror) = mirror {
                        mirror.write(&buf).await;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "output stream closed with error");
                    break;
                }
            }
        }
    })
}

/// Forward a pipe into the debug log.
pub fn spawn_debug_logger<R>(reader: R, label: &'static str, stream: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let callback: OutputCallback = Arc::new(move |line: &str| {
        debug!(process = label, stream, "{}", line);
    });
    spawn_forwarder(reader, callback, None)
}

/// Wait for output readers to finish after the process exited.
///
/// A grandchild that inherited the pipe can keep it open forever; such
/// readers are abandoned after a grace period.
pub async fn drain(readers: Vec<JoinHandle<()>>) {
    for mut handle in readers {
        if tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut handle)
            .await
            .is_err()
        {
            warn!("output pipe still open after process exit; abandoning reader");
            handle.abort();
        }
    }
}
