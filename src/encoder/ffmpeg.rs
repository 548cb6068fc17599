//! FFmpeg subprocess engine.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::engine::{EncodingEngine, EngineEvent, EngineHandle, EngineRun, KillSignal};
use super::options::EncodeCommand;
use super::progress::ProgressParser;
use crate::error::EncoderError;
use crate::media::probe;

/// Bytes of stderr kept for error messages.
const STDERR_TAIL_BYTES: usize = 64 * 1024;

/// Lines of stderr shown in a failure message.
const ERROR_LINES: usize = 5;

/// How long a terminated encode waits for its stderr to close.
const KILL_STDERR_GRACE: Duration = Duration::from_secs(2);

/// Encoding engine backed by the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegEngine {
    /// Creates an engine using the given executables.
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

#[async_trait]
impl EncodingEngine for FfmpegEngine {
    async fn probe_duration(&self, input: &Path) -> Result<Option<f64>, EncoderError> {
        let info = probe::probe(&self.ffprobe, input).await?;
        Ok(info.duration)
    }

    fn start(&self, command: &EncodeCommand) -> Result<EngineRun, EncoderError> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(cmd = ?cmd, "Spawning ffmpeg");

        let child = cmd
            .spawn()
            .map_err(|e| EncoderError::SpawnFailed(format!("{}: {}", self.ffmpeg.display(), e)))?;

        info!(
            input = %command.input.display(),
            output = %command.output.display(),
            encoder = %command.video_encoder,
            bitrate_kbps = command.video_bitrate_kbps,
            "Started ffmpeg"
        );

        let (handle, signal) = EngineHandle::pair();
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(drive(child, command.duration_secs, signal, tx));

        Ok(EngineRun { events: rx, handle })
    }
}

/// Reads progress until the process exits or is terminated, then reports
/// the outcome as the final event.
async fn drive(mut child: Child, duration_secs: f64, signal: KillSignal, tx: mpsc::Sender<EngineEvent>) {
    let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(read_tail(stderr)));

    let mut parser = ProgressParser::new(duration_secs);
    let mut terminated = false;

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                _ = signal.terminated() => {
                    terminated = true;
                    break;
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(reading) = parser.feed(&line) {
                            // Progress is best effort; a closed receiver is not an error here.
                            let _ = tx
                                .send(EngineEvent::Progress {
                                    percent: reading.percent,
                                    fps: reading.fps,
                                })
                                .await;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "Failed reading ffmpeg progress");
                        break;
                    }
                },
            }
        }
    }

    let status = if terminated || signal.is_terminated() {
        terminated = true;
        if let Err(e) = child.start_kill() {
            debug!(error = %e, "ffmpeg already exited");
        }
        child.wait().await
    } else {
        tokio::select! {
            status = child.wait() => status,
            _ = signal.terminated() => {
                terminated = true;
                let _ = child.start_kill();
                child.wait().await
            }
        }
    };

    let stderr = match stderr_task {
        Some(task) if terminated => collect_after_kill(task).await,
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    let event = match status {
        _ if terminated => {
            debug!("ffmpeg terminated on request");
            EngineEvent::Failed(EncoderError::Terminated.to_string())
        }
        Ok(status) if status.success() => EngineEvent::Completed,
        Ok(status) => {
            let message = failure_message(status.code(), &stderr);
            warn!(code = ?status.code(), error = %message, "ffmpeg failed");
            EngineEvent::Failed(message)
        }
        Err(e) => EngineEvent::Failed(format!("Failed waiting for ffmpeg: {}", e)),
    };

    let _ = tx.send(event).await;
}

/// Waits briefly for the stderr reader of a killed process. A grandchild
/// still holding the pipe must not keep the batch waiting.
async fn collect_after_kill(mut task: JoinHandle<String>) -> String {
    match tokio::time::timeout(KILL_STDERR_GRACE, &mut task).await {
        Ok(tail) => tail.unwrap_or_default(),
        Err(_) => {
            debug!("stderr still open after kill, abandoning it");
            task.abort();
            String::new()
        }
    }
}

/// Reads a stream to the end, keeping only the last [`STDERR_TAIL_BYTES`].
async fn read_tail<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut tail: Vec<u8> = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > STDERR_TAIL_BYTES {
                    let excess = tail.len() - STDERR_TAIL_BYTES;
                    tail.drain(..excess);
                }
            }
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

/// Human readable failure: the tail of stderr, or the exit code.
fn failure_message(code: Option<i32>, stderr: &str) -> String {
    let tail = last_lines(stderr, ERROR_LINES);
    if !tail.is_empty() {
        return tail;
    }
    match code {
        Some(code) => format!("ffmpeg exited with code {}", code),
        None => "ffmpeg was killed by a signal".to_string(),
    }
}
