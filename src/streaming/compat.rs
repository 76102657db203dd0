//! Compatibility streaming for containers browsers cannot play.
//!
//! A request runs at most two encoder attempts. The first copies the video
//! track into fragmented MP4 and re-encodes only the audio; if that process
//! exits or stalls before writing anything, a full video transcode is tried
//! with the same muxing. Nothing is sent to the client until an attempt has
//! produced its first chunk, so a failed remux is never visible.
//!
//! The running encoder is owned by the returned [`CompatStream`]. Dropping
//! the stream (the client went away) or cancelling its token kills the
//! encoder.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use reelhouse_common::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TranscodeConfig;

const FIRST_CHUNK_CAPACITY: usize = 64 * 1024;

/// Fragmented MP4 that can be written to a pipe.
const MOVFLAGS: &str = "frag_keyframe+empty_moov+default_base_moof";

/// One encoder invocation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Copy video, re-encode audio.
    Remux,
    /// Re-encode video and audio.
    Transcode,
}

impl Attempt {
    /// The attempt to run when this one fails, if any.
    pub fn fallback(self) -> Option<Attempt> {
        match self {
            Self::Remux => Some(Self::Transcode),
            Self::Transcode => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Remux => "remux",
            Self::Transcode => "transcode",
        }
    }
}

/// Encoder arguments for an attempt. `start` seeks on the input side.
pub fn encoder_args(
    attempt: Attempt,
    input: &Path,
    start: Option<f64>,
    config: &TranscodeConfig,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostdin".into()];

    if let Some(start) = start.filter(|s| s.is_finite() && *s > 0.0) {
        args.push("-ss".into());
        args.push(format!("{start:.3}"));
    }

    args.push("-i".into());
    args.push(input.to_string_lossy().into_owned());
    args.extend(["-map", "0:v:0", "-map", "0:a:0?"].map(String::from));

    match attempt {
        Attempt::Remux => {
            args.extend(["-c:v", "copy"].map(String::from));
        }
        Attempt::Transcode => {
            args.extend(["-c:v", "libx264", "-preset"].map(String::from));
            args.push(config.video_preset.clone());
            args.push("-crf".into());
            args.push(config.video_crf.to_string());
            args.extend(["-pix_fmt", "yuv420p"].map(String::from));
        }
    }

    args.extend(["-c:a", "aac", "-b:a"].map(String::from));
    args.push(config.audio_bitrate.clone());
    args.extend(["-ac", "2", "-movflags", MOVFLAGS, "-f", "mp4", "pipe:1"].map(String::from));
    args
}

/// Owns an encoder child and kills it when dropped.
struct EncoderProcess {
    child: Child,
    stderr: Option<JoinHandle<String>>,
}

impl EncoderProcess {
    fn kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!("Encoder already exited: {}", e);
        }
    }

    /// Kill, reap and return the captured stderr tail.
    async fn shutdown(mut self) -> String {
        self.kill();
        let _ = self.child.wait().await;
        match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        }
    }
}

impl Drop for EncoderProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Keep the last `cap` bytes written to the encoder's stderr.
fn capture_tail<R>(mut reader: R, cap: usize) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut tail: Vec<u8> = Vec::with_capacity(cap.min(4096));
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    tail.extend_from_slice(&chunk[..n]);
                    if tail.len() > cap {
                        let excess = tail.len() - cap;
                        tail.drain(..excess);
                    }
                }
            }
        }
        String::from_utf8_lossy(&tail).trim().to_string()
    })
}

/// Why an attempt produced no stream.
#[derive(Debug)]
enum AttemptFailure {
    Spawn(io::Error),
    NoOutput { stderr: String },
    TimedOut { stderr: String },
    Cancelled,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to start encoder: {e}"),
            Self::NoOutput { .. } => write!(f, "encoder exited without output"),
            Self::TimedOut { .. } => write!(f, "encoder produced no output before the timeout"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A running compatibility stream.
pub struct CompatStream {
    attempt: Attempt,
    pid: Option<u32>,
    first: Option<Bytes>,
    reader: ReaderStream<ChildStdout>,
    cancelled: BoxFuture<'static, ()>,
    done: bool,
    process: EncoderProcess,
    _permit: OwnedSemaphorePermit,
}

impl CompatStream {
    /// Which attempt is producing output.
    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    /// OS process id of the encoder.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

impl Stream for CompatStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        if self.cancelled.poll_unpin(cx).is_ready() {
            self.done = true;
            self.process.kill();
            return Poll::Ready(None);
        }
        if let Some(first) = self.first.take() {
            return Poll::Ready(Some(Ok(first)));
        }
        Pin::new(&mut self.reader).poll_next(cx)
    }
}

/// Starts compatibility streams, bounded by an encoder slot semaphore.
pub struct CompatTranscoder {
    ffmpeg: Option<PathBuf>,
    config: TranscodeConfig,
    slots: Arc<Semaphore>,
}

impl CompatTranscoder {
    pub fn new(ffmpeg: Option<PathBuf>, config: TranscodeConfig) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            ffmpeg,
            config,
            slots,
        }
    }

    fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.config.startup_timeout_secs)
    }

    /// Encoder slots currently free.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Start streaming `input` from `start` seconds, falling back from remux
    /// to transcode.
    pub async fn start(
        &self,
        input: &Path,
        start: Option<f64>,
        cancel: CancellationToken,
    ) -> Result<CompatStream> {
        let Some(ref ffmpeg) = self.ffmpeg else {
            return Err(Error::transcode(
                "no encoder available for this file; use an external player",
            ));
        };

        let permit = tokio::time::timeout(
            self.startup_timeout(),
            Arc::clone(&self.slots).acquire_owned(),
        )
        .await
        .map_err(|_| Error::unavailable("all encoder slots are busy"))?
        .map_err(|_| Error::internal("encoder slots closed"))?;

        let mut next = Some(Attempt::Remux);
        while let Some(attempt) = next {
            match self.run_attempt(ffmpeg, attempt, input, start, &cancel).await {
                Ok((process, pid, first, reader)) => {
                    info!(
                        attempt = attempt.label(),
                        path = ?input,
                        start = ?start,
                        "Compatibility stream started"
                    );
                    return Ok(CompatStream {
                        attempt,
                        pid,
                        first: Some(first),
                        reader: ReaderStream::new(reader),
                        cancelled: cancel.cancelled_owned().boxed(),
                        done: false,
                        process,
                        _permit: permit,
                    });
                }
                Err(AttemptFailure::Cancelled) => {
                    debug!(path = ?input, "Compatibility stream cancelled during startup");
                    return Err(Error::unavailable("compatibility stream cancelled"));
                }
                Err(failure) => {
                    let stderr = match &failure {
                        AttemptFailure::NoOutput { stderr } | AttemptFailure::TimedOut { stderr } => {
                            stderr.as_str()
                        }
                        _ => "",
                    };
                    warn!(
                        attempt = attempt.label(),
                        path = ?input,
                        stderr = %stderr,
                        "Compatibility attempt failed: {}",
                        failure
                    );
                    next = attempt.fallback();
                }
            }
        }

        Err(Error::transcode(format!(
            "could not convert {} for the browser; use an external player",
            input.display()
        )))
    }

    async fn run_attempt(
        &self,
        ffmpeg: &Path,
        attempt: Attempt,
        input: &Path,
        start: Option<f64>,
        cancel: &CancellationToken,
    ) -> std::result::Result<(EncoderProcess, Option<u32>, Bytes, ChildStdout), AttemptFailure> {
        let args = encoder_args(attempt, input, start, &self.config);
        debug!(attempt = attempt.label(), args = ?args, "Spawning encoder");

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(AttemptFailure::Spawn)?;

        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child
            .stderr
            .take()
            .map(|err| capture_tail(err, self.config.stderr_capture_bytes));
        let process = EncoderProcess { child, stderr };

        let Some(mut stdout) = stdout else {
            return Err(AttemptFailure::NoOutput {
                stderr: process.shutdown().await,
            });
        };

        let mut first = BytesMut::with_capacity(FIRST_CHUNK_CAPACITY);
        tokio::select! {
            read = stdout.read_buf(&mut first) => match read {
                Ok(n) if n > 0 => Ok((process, pid, first.freeze(), stdout)),
                _ => Err(AttemptFailure::NoOutput { stderr: process.shutdown().await }),
            },
            _ = tokio::time::sleep(self.startup_timeout()) => {
                Err(AttemptFailure::TimedOut { stderr: process.shutdown().await })
            }
            _ = cancel.cancelled() => {
                process.shutdown().await;
                Err(AttemptFailure::Cancelled)
            }
        }
    }
}
