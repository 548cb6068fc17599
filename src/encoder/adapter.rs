//! Converts one task of a batch through an [`EncodingEngine`].

use std::path::Path;

use tracing::{debug, error, info, warn};

use super::engine::{EncodingEngine, EngineEvent, EngineRun};
use super::options::EncodeCommand;
use crate::config::BatchConfig;
use crate::error::EncoderError;
use crate::media::{compute_bitrate_kbps, effective_duration};
use crate::output::{output_base_name, resolve_output_path, NameTokens};
use crate::queue::batch::BatchHandle;
use crate::queue::task::{ConversionTask, TaskStatus};

/// Progress sink receiving full task-list snapshots.
pub type Publish<'a> = &'a mut (dyn FnMut(Vec<ConversionTask>) + Send);

/// Runs the conversion for task `id`, which must already be converting.
///
/// Every change to the task is followed by a snapshot to `publish`. Returns
/// true when the task ended in Done. Failures are recorded on the task and
/// never returned.
pub async fn convert(
    engine: &dyn EncodingEngine,
    config: &BatchConfig,
    handle: &BatchHandle,
    id: usize,
    publish: Publish<'_>,
) -> bool {
    let Some(file) = handle.task(id).map(|t| t.file) else {
        return false;
    };

    let duration = probe_duration(engine, &file).await;
    let bitrate = compute_bitrate_kbps(&config.compression, duration, config.audio.bitrate_kbps);
    if bitrate <= 0 {
        warn!(
            task_id = id,
            bitrate_kbps = bitrate,
            "Target size leaves no room for video; passing bitrate to encoder unchanged"
        );
    }
    let recorded = handle.update(id, |t| {
        if t.status != TaskStatus::Converting {
            return false;
        }
        t.duration_secs = Some(duration);
        t.bitrate_kbps = Some(bitrate);
        true
    });
    if recorded != Some(true) {
        debug!(task_id = id, "Task cancelled while probing");
        return false;
    }

    let output = match output_path(config, &file, duration) {
        Ok(path) => path,
        Err(e) => {
            error!(task_id = id, error = %e, "Cannot resolve output path");
            fail(handle, id, e.to_string(), publish);
            return false;
        }
    };
    let placed = handle.update(id, |t| {
        if t.status != TaskStatus::Converting {
            return false;
        }
        t.output = Some(output.clone());
        true
    });
    if placed != Some(true) {
        debug!(task_id = id, "Task cancelled before the encoder started");
        return false;
    }
    publish(handle.tasks());

    let command = EncodeCommand::new(config, file.clone(), output, bitrate, duration);

    let EngineRun { mut events, handle: engine } = match engine.start(&command) {
        Ok(run) => run,
        Err(e) => {
            error!(task_id = id, error = %e, "Failed to start encoder");
            fail(handle, id, e.to_string(), publish);
            return false;
        }
    };
    handle.update(id, |t| t.attach_engine(engine));

    let mut succeeded = false;
    let mut finished = false;
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Progress { percent, fps } => {
                if handle.update(id, |t| t.update_progress(percent, fps)) == Some(true) {
                    publish(handle.tasks());
                }
            }
            EngineEvent::Failed(message) => {
                finished = true;
                if handle.update(id, |t| t.fail(message.clone())) == Some(true) {
                    error!(task_id = id, file = %file.display(), error = %message, "Conversion failed");
                    publish(handle.tasks());
                } else {
                    debug!(task_id = id, error = %message, "Ignoring failure of a finished task");
                }
                break;
            }
            EngineEvent::Completed => {
                finished = true;
                succeeded = handle.update(id, |t| t.complete()) == Some(true);
                if succeeded {
                    info!(task_id = id, file = %file.display(), "Conversion finished");
                    if config.delete_original {
                        delete_original(&file).await;
                    }
                    publish(handle.tasks());
                }
                break;
            }
        }
    }

    if !finished {
        fail(
            handle,
            id,
            "Encoder stopped without reporting a result".to_string(),
            publish,
        );
    }

    succeeded
}

/// Probes the duration, falling back when it is unavailable.
async fn probe_duration(engine: &dyn EncodingEngine, file: &Path) -> f64 {
    let probed = match engine.probe_duration(file).await {
        Ok(duration) => duration,
        Err(e) => {
            warn!(file = %file.display(), error = %e, "Probe failed");
            None
        }
    };
    let duration = effective_duration(probed);
    if probed != Some(duration) {
        warn!(
            file = %file.display(),
            fallback_secs = duration,
            "Duration unavailable, using fallback"
        );
    }
    duration
}

fn output_path(config: &BatchConfig, file: &Path, duration: f64) -> Result<std::path::PathBuf, EncoderError> {
    let dir = config.output_dir_for(file);
    let tokens = NameTokens::for_input(file, config.output.format, config.output.codec, duration);
    let base = output_base_name(config.output.rename_pattern.as_deref(), &tokens);
    resolve_output_path(&dir, &base, config.output.format.extension())
        .map_err(|source| EncoderError::OutputPath { dir, source })
}

fn fail(handle: &BatchHandle, id: usize, message: String, publish: Publish<'_>) {
    if handle.update(id, |t| t.fail(message)) == Some(true) {
        publish(handle.tasks());
    }
}

async fn delete_original(file: &Path) {
    match tokio::fs::remove_file(file).await {
        Ok(()) => info!(file = %file.display(), "Deleted original"),
        Err(e) => warn!(file = %file.display(), error = %e, "Failed to delete original"),
    }
}
