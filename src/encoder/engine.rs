//! The seam between the batch and the external encoder.
//!
//! An engine starts one encode per [`EncodeCommand`] and reports back through
//! a channel of [`EngineEvent`]s: any number of progress ticks, then exactly
//! one terminal event. The [`EngineHandle`] returned with the channel stops
//! the process from outside the event loop.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use super::options::EncodeCommand;
use crate::error::EncoderError;

/// Event emitted by a running encode.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Periodic progress report.
    Progress { percent: u8, fps: f64 },
    /// The encoder failed; carries a display message.
    Failed(String),
    /// The encoder finished successfully.
    Completed,
}

/// A started encode.
#[derive(Debug)]
pub struct EngineRun {
    /// Event stream for this encode.
    pub events: mpsc::Receiver<EngineEvent>,
    /// Handle used to terminate the process.
    pub handle: EngineHandle,
}

#[derive(Debug, Default)]
struct KillState {
    terminated: AtomicBool,
    notify: Notify,
}

/// Cloneable request side of a termination signal.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    state: Arc<KillState>,
}

/// Receiving side of a termination signal, held by the process driver.
#[derive(Debug, Clone)]
pub struct KillSignal {
    state: Arc<KillState>,
}

impl EngineHandle {
    /// Creates a linked handle/signal pair.
    pub fn pair() -> (EngineHandle, KillSignal) {
        let state = Arc::new(KillState::default());
        (
            EngineHandle {
                state: Arc::clone(&state),
            },
            KillSignal { state },
        )
    }

    /// Asks the process to stop. Returns immediately; repeated calls are no-ops.
    pub fn terminate(&self) {
        if !self.state.terminated.swap(true, Ordering::SeqCst) {
            self.state.notify.notify_waiters();
        }
    }
}

impl KillSignal {
    /// Returns true once termination was requested.
    pub fn is_terminated(&self) -> bool {
        self.state.terminated.load(Ordering::SeqCst)
    }

    /// Resolves when termination is requested, including requests made
    /// before this was awaited.
    pub async fn terminated(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_terminated() {
                return;
            }
            notified.await;
        }
    }
}

/// External encoding engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EncodingEngine: Send + Sync {
    /// Returns the media duration in seconds, or None when unknown.
    async fn probe_duration(&self, input: &Path) -> Result<Option<f64>, EncoderError>;

    /// Starts encoding. Must be called from within a tokio runtime.
    fn start(&self, command: &EncodeCommand) -> Result<EngineRun, EncoderError>;
}
