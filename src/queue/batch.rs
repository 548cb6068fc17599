//! Sequential batch runner and its cancellation handle.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::task::{ConversionTask, TaskStatus};
use crate::config::BatchConfig;
use crate::encoder::adapter;
use crate::encoder::engine::EncodingEngine;

/// Shared view of one batch's tasks.
///
/// Cloning is cheap; every clone refers to the same task list, so a clone
/// handed to a signal handler can cancel the run.
#[derive(Debug, Clone, Default)]
pub struct BatchHandle {
    tasks: Arc<Mutex<Vec<ConversionTask>>>,
}

impl BatchHandle {
    fn new(tasks: Vec<ConversionTask>) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(tasks)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConversionTask>> {
        // Task updates cannot leave the list half-written, so a poisoned lock is still usable.
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns an independent copy of all tasks.
    pub fn tasks(&self) -> Vec<ConversionTask> {
        self.lock().clone()
    }

    /// Returns a copy of one task.
    pub fn task(&self, id: usize) -> Option<ConversionTask> {
        self.lock().get(id).cloned()
    }

    /// Cancels every task that has not finished and signals a running
    /// encoder to stop. Does not wait for the process to exit.
    ///
    /// Returns the number of tasks cancelled; calling it again is a no-op.
    pub fn cancel(&self) -> usize {
        let mut tasks = self.lock();
        let cancelled = tasks.iter_mut().map(|t| t.cancel()).filter(|c| *c).count();
        if cancelled > 0 {
            info!(cancelled, "Batch cancelled");
        }
        cancelled
    }

    /// Applies `f` to one task under the lock.
    pub(crate) fn update<R>(&self, id: usize, f: impl FnOnce(&mut ConversionTask) -> R) -> Option<R> {
        self.lock().get_mut(id).map(f)
    }
}

/// Outcome counts of a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Tasks converted successfully.
    pub done: usize,
    /// Failed tasks in batch order: id, input file and message.
    pub failed: Vec<(usize, PathBuf, String)>,
    /// Tasks cancelled before finishing.
    pub cancelled: usize,
}

impl BatchSummary {
    /// Tallies a task list.
    pub fn from_tasks(tasks: &[ConversionTask]) -> Self {
        let mut summary = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::Done => summary.done += 1,
                TaskStatus::Error => summary.failed.push((
                    task.id,
                    task.file.clone(),
                    task.error.clone().unwrap_or_default(),
                )),
                TaskStatus::Cancelled => summary.cancelled += 1,
                TaskStatus::Queued | TaskStatus::Converting => {}
            }
        }
        summary
    }

    /// Returns true when no task failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One batch: N files converted one after another with a shared configuration.
#[derive(Debug)]
pub struct Batch {
    id: Uuid,
    config: BatchConfig,
    handle: BatchHandle,
}

impl Batch {
    /// Creates a batch with one queued task per file, ids assigned in order.
    pub fn new(files: Vec<PathBuf>, config: BatchConfig) -> Self {
        let tasks = files
            .into_iter()
            .enumerate()
            .map(|(id, file)| ConversionTask::new(id, file))
            .collect();
        Self {
            id: Uuid::new_v4(),
            config,
            handle: BatchHandle::new(tasks),
        }
    }

    /// Unique id of this run, used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Configuration shared by every task.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Returns a handle for observing or cancelling the batch.
    pub fn handle(&self) -> BatchHandle {
        self.handle.clone()
    }

    /// Converts every task in order.
    ///
    /// `on_progress` receives a fresh snapshot of the whole list first, then
    /// after every state change and progress tick. Failures stay on their
    /// task; the batch always runs to the end.
    pub async fn run<F>(&self, engine: &dyn EncodingEngine, mut on_progress: F) -> BatchSummary
    where
        F: FnMut(Vec<ConversionTask>) + Send,
    {
        let count = self.handle.lock().len();
        info!(batch_id = %self.id, files = count, "Starting batch");

        on_progress(self.handle.tasks());

        for id in 0..count {
            if self.handle.update(id, |t| t.start()) != Some(true) {
                debug!(batch_id = %self.id, task_id = id, "Skipping finished task");
                continue;
            }
            on_progress(self.handle.tasks());

            adapter::convert(engine, &self.config, &self.handle, id, &mut on_progress).await;
        }

        let summary = BatchSummary::from_tasks(&self.handle.tasks());
        info!(
            batch_id = %self.id,
            done = summary.done,
            failed = summary.failed.len(),
            cancelled = summary.cancelled,
            "Batch finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::engine::EngineHandle;

    fn files(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/v/{}.mov", i))).collect()
    }

    #[test]
    fn new_batch_is_all_queued_in_order() {
        let batch = Batch::new(files(3), BatchConfig::default());
        let tasks = batch.handle().tasks();
        assert_eq!(tasks.len(), 3);
        for (i, task) in tasks.iter().enumerate() {
            assert_eq!(task.id, i);
            assert_eq!(task.file, PathBuf::from(format!("/v/{}.mov", i)));
            assert_eq!(task.status, TaskStatus::Queued);
        }
    }

    #[test]
    fn cancel_is_idempotent_and_spares_finished_tasks() {
        let batch = Batch::new(files(3), BatchConfig::default());
        let handle = batch.handle();
        handle.update(0, |t| {
            t.start();
            t.complete();
        });
        let (engine, signal) = EngineHandle::pair();
        handle.update(1, |t| {
            t.start();
            t.attach_engine(engine);
        });

        assert_eq!(handle.cancel(), 2);
        assert!(signal.is_terminated());
        assert_eq!(handle.cancel(), 0);

        let statuses: Vec<_> = handle.tasks().iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![TaskStatus::Done, TaskStatus::Cancelled, TaskStatus::Cancelled]
        );
    }

    #[test]
    fn cancel_on_empty_batch_is_noop() {
        let batch = Batch::new(Vec::new(), BatchConfig::default());
        assert_eq!(batch.handle().cancel(), 0);
    }

    #[test]
    fn snapshots_are_independent() {
        let batch = Batch::new(files(1), BatchConfig::default());
        let handle = batch.handle();
        let before = handle.tasks();
        handle.update(0, |t| t.start());
        assert_eq!(before[0].status, TaskStatus::Queued);
        assert_eq!(handle.task(0).map(|t| t.status), Some(TaskStatus::Converting));
    }

    #[test]
    fn summary_tallies_in_order() {
        let mut tasks: Vec<_> = files(4)
            .into_iter()
            .enumerate()
            .map(|(i, f)| ConversionTask::new(i, f))
            .collect();
        tasks[0].start();
        tasks[0].complete();
        tasks[1].start();
        tasks[1].fail("boom");
        tasks[2].cancel();
        tasks[3].start();
        tasks[3].complete();

        let summary = BatchSummary::from_tasks(&tasks);
        assert_eq!(summary.done, 2);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(
            summary.failed,
            vec![(1, PathBuf::from("/v/1.mov"), "boom".to_string())]
        );
        assert!(!summary.is_success());
    }
}
