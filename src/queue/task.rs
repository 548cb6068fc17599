//! Per-file conversion task state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::encoder::engine::EngineHandle;

/// Lifecycle state of a conversion task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for its turn in the batch.
    Queued,
    /// Currently being encoded.
    Converting,
    /// Converted successfully.
    Done,
    /// The encoder reported a failure.
    Error,
    /// Cancelled before it could finish.
    Cancelled,
}

impl TaskStatus {
    /// Done, Error and Cancelled never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }
}

/// Decides whether a status change is allowed.
///
/// Queued may start or be cancelled; Converting may end in any terminal
/// state; terminal states accept nothing. A late error after a cancel is
/// therefore rejected.
pub fn transition(current: TaskStatus, requested: TaskStatus) -> bool {
    use TaskStatus::*;
    matches!(
        (current, requested),
        (Queued, Converting) | (Queued, Cancelled) | (Converting, Done | Error | Cancelled)
    )
}

/// One input file's conversion and its tracked state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionTask {
    /// Position in the batch, starting at 0.
    pub id: usize,

    /// Input file.
    pub file: PathBuf,

    /// Current status.
    pub status: TaskStatus,

    /// Percent complete (0-100).
    pub progress: u8,

    /// Current encoding speed in frames per second.
    pub fps: f64,

    /// When conversion started.
    pub started: Option<DateTime<Utc>>,

    /// Seconds from start to completion. Set only when done.
    pub elapsed: Option<f64>,

    /// Resolved output path.
    pub output: Option<PathBuf>,

    /// Video bitrate handed to the encoder.
    pub bitrate_kbps: Option<i64>,

    /// Duration used for bitrate and progress math.
    pub duration_secs: Option<f64>,

    /// Failure message for tasks in Error.
    pub error: Option<String>,

    /// Live encoder process while converting.
    #[serde(skip)]
    pub(crate) engine: Option<EngineHandle>,
}

impl ConversionTask {
    /// Creates a queued task.
    pub fn new(id: usize, file: PathBuf) -> Self {
        Self {
            id,
            file,
            status: TaskStatus::Queued,
            progress: 0,
            fps: 0.0,
            started: None,
            elapsed: None,
            output: None,
            bitrate_kbps: None,
            duration_secs: None,
            error: None,
            engine: None,
        }
    }

    /// Returns true once the task can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true while an encoder process is attached.
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Marks the task as converting.
    pub fn start(&mut self) -> bool {
        if !transition(self.status, TaskStatus::Converting) {
            return false;
        }
        self.status = TaskStatus::Converting;
        self.started = Some(Utc::now());
        self.progress = 0;
        self.fps = 0.0;
        true
    }

    /// Records a progress tick. Progress never goes backwards.
    pub fn update_progress(&mut self, percent: u8, fps: f64) -> bool {
        if self.status != TaskStatus::Converting {
            return false;
        }
        self.progress = self.progress.max(percent.min(100));
        self.fps = fps;
        true
    }

    /// Stores the live encoder handle.
    ///
    /// If the task is no longer converting (it was cancelled meanwhile) the
    /// process is terminated right away instead.
    pub fn attach_engine(&mut self, handle: EngineHandle) -> bool {
        if self.status != TaskStatus::Converting {
            handle.terminate();
            return false;
        }
        self.engine = Some(handle);
        true
    }

    /// Marks the task as done.
    pub fn complete(&mut self) -> bool {
        if !transition(self.status, TaskStatus::Done) {
            return false;
        }
        self.status = TaskStatus::Done;
        self.progress = 100;
        self.elapsed = self
            .started
            .map(|s| (Utc::now() - s).num_milliseconds().max(0) as f64 / 1000.0);
        self.engine = None;
        true
    }

    /// Marks the task as failed.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !transition(self.status, TaskStatus::Error) {
            return false;
        }
        self.status = TaskStatus::Error;
        self.error = Some(message.into());
        self.engine = None;
        true
    }

    /// Cancels the task and signals its encoder, if any, to stop.
    pub fn cancel(&mut self) -> bool {
        if !transition(self.status, TaskStatus::Cancelled) {
            return false;
        }
        self.status = TaskStatus::Cancelled;
        self.progress = 0;
        self.fps = 0.0;
        if let Some(engine) = self.engine.take() {
            engine.terminate();
        }
        true
    }
}
