//! Batch runs against a scripted in-memory engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};

use batch_convert::config::model::{BatchConfig, CompressionMode};
use batch_convert::encoder::{EncodeCommand, EncodingEngine, EngineEvent, EngineHandle, EngineRun};
use batch_convert::error::EncoderError;
use batch_convert::queue::{Batch, ConversionTask, TaskStatus};

#[derive(Debug, Clone)]
enum Step {
    Progress(u8, f64),
    Fail(&'static str),
    Complete,
    WaitForKill,
}

/// Replays a fixed list of events per input file.
#[derive(Default)]
struct ScriptedEngine {
    scripts: HashMap<PathBuf, Vec<Step>>,
    durations: HashMap<PathBuf, f64>,
    started: Mutex<Vec<EncodeCommand>>,
}

impl ScriptedEngine {
    fn script(mut self, input: &Path, steps: Vec<Step>) -> Self {
        self.scripts.insert(input.to_path_buf(), steps);
        self
    }

    fn duration(mut self, input: &Path, secs: f64) -> Self {
        self.durations.insert(input.to_path_buf(), secs);
        self
    }

    fn started(&self) -> Vec<EncodeCommand> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl EncodingEngine for ScriptedEngine {
    async fn probe_duration(&self, input: &Path) -> Result<Option<f64>, EncoderError> {
        Ok(self.durations.get(input).copied())
    }

    fn start(&self, command: &EncodeCommand) -> Result<EngineRun, EncoderError> {
        self.started.lock().unwrap().push(command.clone());

        let steps = self
            .scripts
            .get(&command.input)
            .cloned()
            .unwrap_or_else(|| vec![Step::Progress(50, 30.0), Step::Complete]);
        let output = command.output.clone();
        let (handle, signal) = EngineHandle::pair();
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            for step in steps {
                if signal.is_terminated() {
                    let _ = tx.send(EngineEvent::Failed("terminated".into())).await;
                    return;
                }
                match step {
                    Step::Progress(percent, fps) => {
                        let _ = tx.send(EngineEvent::Progress { percent, fps }).await;
                        tokio::task::yield_now().await;
                    }
                    Step::Fail(message) => {
                        let _ = tx.send(EngineEvent::Failed(message.into())).await;
                        return;
                    }
                    Step::Complete => {
                        let _ = std::fs::write(&output, b"converted");
                        let _ = tx.send(EngineEvent::Completed).await;
                        return;
                    }
                    Step::WaitForKill => {
                        signal.terminated().await;
                        let _ = tx.send(EngineEvent::Failed("killed by signal 15".into())).await;
                        return;
                    }
                }
            }
        });

        Ok(EngineRun { events: rx, handle })
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    out: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let out = root.join("out");
        Self {
            _dir: dir,
            root,
            out,
        }
    }

    fn input(&self, relative: &str) -> PathBuf {
        let path = self.root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"source").unwrap();
        path
    }

    fn config(&self) -> BatchConfig {
        let mut config = BatchConfig::default();
        config.output.directory = Some(self.out.clone());
        config.compression = CompressionMode::Bitrate { bitrate_kbps: 5000 };
        config
    }
}

fn statuses(tasks: &[ConversionTask]) -> Vec<TaskStatus> {
    tasks.iter().map(|t| t.status).collect()
}

fn status_changes(snapshots: &[Vec<ConversionTask>]) -> usize {
    snapshots
        .windows(2)
        .filter(|w| statuses(&w[0]) != statuses(&w[1]))
        .count()
}

#[tokio::test]
async fn two_files_fixed_bitrate() {
    let fx = Fixture::new();
    let a = fx.input("day1/clip.mov");
    let b = fx.input("day2/clip.mov");
    let engine = ScriptedEngine::default()
        .duration(&a, 12.0)
        .duration(&b, 20.0);

    let batch = Batch::new(vec![a.clone(), b.clone()], fx.config());
    let mut snapshots = Vec::new();
    let summary = batch.run(&engine, |tasks| snapshots.push(tasks)).await;

    assert_eq!(summary.done, 2);
    assert!(summary.is_success());

    let tasks = batch.handle().tasks();
    for task in &tasks {
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.progress, 100);
        assert_eq!(task.bitrate_kbps, Some(5000));
        assert!(task.elapsed.is_some());
    }
    assert_eq!(tasks[0].output, Some(fx.out.join("clip.mp4")));
    assert_eq!(tasks[1].output, Some(fx.out.join("clip_1.mp4")));
    assert!(fx.out.join("clip.mp4").is_file());
    assert!(fx.out.join("clip_1.mp4").is_file());

    assert!(a.exists() && b.exists(), "sources must be kept");

    assert!(statuses(&snapshots[0]).iter().all(|s| *s == TaskStatus::Queued));
    assert!(status_changes(&snapshots) >= 4);

    let started = engine.started();
    assert_eq!(started.len(), 2);
    assert_eq!(started[0].video_encoder, "libx264");
    assert_eq!(started[1].duration_secs, 20.0);
}

#[tokio::test]
async fn error_on_second_of_three_keeps_going() {
    let fx = Fixture::new();
    let files: Vec<_> = ["a.mov", "b.mov", "c.mov"].iter().map(|f| fx.input(f)).collect();
    let engine = ScriptedEngine::default().script(
        &files[1],
        vec![Step::Progress(10, 25.0), Step::Fail("Conversion failed!")],
    );

    let batch = Batch::new(files.clone(), fx.config());
    let summary = batch.run(&engine, |_| {}).await;

    assert_eq!(summary.done, 2);
    assert_eq!(
        summary.failed,
        vec![(1, files[1].clone(), "Conversion failed!".to_string())]
    );
    assert_eq!(
        statuses(&batch.handle().tasks()),
        vec![TaskStatus::Done, TaskStatus::Error, TaskStatus::Done]
    );
    assert_eq!(engine.started().len(), 3);
}

#[tokio::test]
async fn late_error_after_cancel_is_ignored() {
    let fx = Fixture::new();
    let files: Vec<_> = ["a.mov", "b.mov", "c.mov"].iter().map(|f| fx.input(f)).collect();
    let engine = ScriptedEngine::default().script(
        &files[0],
        vec![Step::Progress(40, 24.0), Step::WaitForKill],
    );

    let batch = Batch::new(files, fx.config());
    let handle = batch.handle();
    let mut snapshots = Vec::new();
    let summary = batch
        .run(&engine, |tasks| {
            if tasks[0].progress == 40 && tasks[0].status == TaskStatus::Converting {
                assert_eq!(handle.cancel(), 3);
            }
            snapshots.push(tasks);
        })
        .await;

    assert_eq!(summary.cancelled, 3);
    assert!(summary.failed.is_empty());

    let tasks = batch.handle().tasks();
    assert_eq!(tasks[0].status, TaskStatus::Cancelled);
    assert_eq!(tasks[0].progress, 0);
    assert_eq!(tasks[0].fps, 0.0);
    assert_eq!(tasks[0].error, None);
    assert_eq!(engine.started().len(), 1, "cancelled tasks are never started");

    for snapshot in &snapshots {
        assert_ne!(snapshot[0].status, TaskStatus::Error);
    }
}

#[tokio::test]
async fn tasks_run_strictly_in_sequence() {
    let fx = Fixture::new();
    let files: Vec<_> = ["a.mov", "b.mov", "c.mov"].iter().map(|f| fx.input(f)).collect();
    let mut engine = ScriptedEngine::default();
    for file in &files {
        engine = engine.script(
            file,
            vec![
                Step::Progress(20, 30.0),
                Step::Progress(60, 31.0),
                Step::Progress(90, 29.0),
                Step::Complete,
            ],
        );
    }

    let batch = Batch::new(files, fx.config());
    let mut snapshots: Vec<Vec<ConversionTask>> = Vec::new();
    batch.run(&engine, |tasks| snapshots.push(tasks)).await;

    for snapshot in &snapshots {
        let converting = snapshot
            .iter()
            .filter(|t| t.status == TaskStatus::Converting)
            .count();
        assert!(converting <= 1);

        for (i, task) in snapshot.iter().enumerate() {
            if task.status != TaskStatus::Queued {
                assert!(
                    snapshot[..i].iter().all(|t| t.is_terminal()),
                    "task {} started before its predecessors finished",
                    i
                );
            }
        }
    }

    // Progress never goes backwards within a task.
    for id in 0..3 {
        let progress: Vec<u8> = snapshots.iter().map(|s| s[id].progress).collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[tokio::test]
async fn cancelled_before_run_skips_everything() {
    let fx = Fixture::new();
    let files: Vec<_> = ["a.mov", "b.mov"].iter().map(|f| fx.input(f)).collect();
    let engine = ScriptedEngine::default();

    let batch = Batch::new(files, fx.config());
    batch.handle().cancel();
    let summary = batch.run(&engine, |_| {}).await;

    assert_eq!(summary.cancelled, 2);
    assert!(engine.started().is_empty());
    assert!(!fx.out.exists());
}

#[tokio::test]
async fn delete_original_after_success_only() {
    let fx = Fixture::new();
    let ok = fx.input("ok.mov");
    let bad = fx.input("bad.mov");
    let engine = ScriptedEngine::default().script(&bad, vec![Step::Fail("Invalid data")]);

    let mut config = fx.config();
    config.delete_original = true;
    let batch = Batch::new(vec![ok.clone(), bad.clone()], config);
    let summary = batch.run(&engine, |_| {}).await;

    assert_eq!(summary.done, 1);
    assert!(!ok.exists(), "converted source is deleted");
    assert!(bad.exists(), "failed source is kept");
    assert_ok!(std::fs::metadata(fx.out.join("ok.mp4")));
}

#[tokio::test]
async fn failed_deletion_does_not_fail_task() {
    let fx = Fixture::new();
    let ghost = fx.root.join("ghost.mov");
    let engine = ScriptedEngine::default();

    let mut config = fx.config();
    config.delete_original = true;
    let batch = Batch::new(vec![ghost.clone()], config);
    let summary = batch.run(&engine, |_| {}).await;

    assert_eq!(summary.done, 1);
    assert_err!(std::fs::metadata(&ghost));
}

#[tokio::test]
async fn target_size_uses_probed_or_fallback_duration() {
    let fx = Fixture::new();
    let known = fx.input("known.mov");
    let unknown = fx.input("unknown.mov");
    let engine = ScriptedEngine::default().duration(&known, 500.0);

    let mut config = fx.config();
    config.compression = CompressionMode::TargetSize { size_mb: 100.0 };
    let batch = Batch::new(vec![known, unknown], config);
    batch.run(&engine, |_| {}).await;

    let tasks = batch.handle().tasks();
    assert_eq!(tasks[0].bitrate_kbps, Some(1472));
    assert_eq!(tasks[1].duration_secs, Some(60.0));
    // floor((800000 - 128 * 60) / 60)
    assert_eq!(tasks[1].bitrate_kbps, Some(13205));
}

#[tokio::test]
async fn rename_pattern_and_subfolder() {
    let fx = Fixture::new();
    let input = fx.input("holiday.mov");
    let engine = ScriptedEngine::default().duration(&input, 83.6);

    let mut config = BatchConfig::default();
    config.output.subfolder = Some("converted".to_string());
    config.output.rename_pattern = Some("{name}_{codec}_{duration}".to_string());
    let batch = Batch::new(vec![input], config);
    batch.run(&engine, |_| {}).await;

    let task = batch.handle().task(0).unwrap();
    assert_eq!(
        task.output,
        Some(fx.root.join("converted").join("holiday_h264_84s.mp4"))
    );
}
