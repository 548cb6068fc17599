//! Batch Convert - sequential video conversion through ffmpeg.
//!
//! A batch converts each input file in turn, tracking per-file progress,
//! derived bitrate and elapsed time, and can be cancelled mid-run through
//! its [`queue::BatchHandle`].

pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod media;
pub mod output;
pub mod queue;
pub mod validation;

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, ConvertArgs, OverrideArgs};
use crate::config::{loader, BatchConfig};
use crate::encoder::FfmpegEngine;
use crate::error::AppError;
use crate::queue::{Batch, BatchSummary, ConversionTask, TaskStatus};
use crate::validation::{report, validate_config, SystemCapabilities};

/// Runs the command selected on the command line.
pub async fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.log_level(), cli.log_json)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Convert(args) => convert(args, config_path).await,
        Commands::ConfigValidate(overrides) => validate_command(config_path, &overrides),
        Commands::ConfigShow(overrides) => show_config(config_path, &overrides),
        Commands::Check => check_tools(config_path),
    }
}

/// Initializes the tracing subscriber. Logs go to stderr.
fn setup_logging(level: &str, json: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        builder
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .try_init()
    } else {
        builder.with_target(false).try_init()
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// Converts the selected files, printing task snapshots as they change.
async fn convert(args: ConvertArgs, config_path: Option<&Path>) -> Result<()> {
    let (config, capabilities) = load_and_detect(config_path, &args.overrides)?;
    info!(
        ffmpeg = %capabilities.ffmpeg.display(),
        ffprobe = %capabilities.ffprobe.display(),
        "Found tools"
    );
    loader::validate(&config, &capabilities)?;

    let files = media::scan::collect_inputs(&args.inputs, &config.input)?;
    let engine = FfmpegEngine::new(capabilities.ffmpeg.clone(), capabilities.ffprobe.clone());

    let batch = Batch::new(files, config);
    let handle = batch.handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining files");
            handle.cancel();
        }
    });

    let mut printer = SnapshotPrinter::new(args.json);
    let summary = batch.run(&engine, move |tasks| printer.print(&tasks)).await;
    interrupt.abort();

    print_summary(&summary, args.json)?;

    if !summary.is_success() {
        anyhow::bail!("{} file(s) failed to convert", summary.failed.len());
    }
    Ok(())
}

/// Loads the configuration and locates the tools it names.
fn load_and_detect(
    config_path: Option<&Path>,
    overrides: &OverrideArgs,
) -> Result<(BatchConfig, SystemCapabilities), AppError> {
    let config = loader::load(config_path, overrides)?;
    let capabilities = SystemCapabilities::detect(&config.tools)?;
    Ok((config, capabilities))
}

/// Prints the snapshots a batch publishes.
///
/// In text mode only tasks whose status or progress changed since the
/// previous snapshot are printed; in JSON mode every snapshot is one line.
struct SnapshotPrinter {
    json: bool,
    last: Vec<(TaskStatus, u8)>,
}

impl SnapshotPrinter {
    fn new(json: bool) -> Self {
        Self {
            json,
            last: Vec::new(),
        }
    }

    fn print(&mut self, tasks: &[ConversionTask]) {
        if self.json {
            match serde_json::to_string(tasks) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Failed to serialize snapshot"),
            }
            return;
        }

        for task in tasks {
            if self.last.get(task.id) != Some(&(task.status, task.progress)) {
                println!("{}", describe(task, tasks.len()));
            }
        }
        self.last = tasks.iter().map(|t| (t.status, t.progress)).collect();
    }
}

/// One display line for a task.
fn describe(task: &ConversionTask, total: usize) -> String {
    let name = task
        .file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| task.file.display().to_string());
    let prefix = format!("[{}/{}] {}", task.id + 1, total, name);

    match task.status {
        TaskStatus::Queued => format!("{}: queued", prefix),
        TaskStatus::Converting => format!(
            "{}: converting {:>3}% ({:.1} fps)",
            prefix, task.progress, task.fps
        ),
        TaskStatus::Done => {
            let output = task
                .output
                .as_ref()
                .map(|p| format!(" -> {}", p.display()))
                .unwrap_or_default();
            format!("{}: done in {:.1}s{}", prefix, task.elapsed.unwrap_or_default(), output)
        }
        TaskStatus::Error => format!(
            "{}: failed: {}",
            prefix,
            task.error.as_deref().unwrap_or("unknown error")
        ),
        TaskStatus::Cancelled => format!("{}: cancelled", prefix),
    }
}

fn print_summary(summary: &BatchSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
        return Ok(());
    }

    println!(
        "\n{} done, {} failed, {} cancelled",
        summary.done,
        summary.failed.len(),
        summary.cancelled
    );
    for (_, file, error) in &summary.failed {
        println!("  {}: {}", file.display(), error);
    }
    Ok(())
}

/// Validates the configuration and prints the full report.
fn validate_command(config_path: Option<&Path>, overrides: &OverrideArgs) -> Result<()> {
    let (config, capabilities) = load_and_detect(config_path, overrides)?;
    let result = validate_config(&config, &capabilities);

    println!("{}", report::format_report(&result));

    if !result.is_valid() {
        return Err(error::ConfigError::ValidationFailed {
            error_count: result.error_count(),
        }
        .into());
    }
    Ok(())
}

/// Displays the effective configuration after overrides.
fn show_config(config_path: Option<&Path>, overrides: &OverrideArgs) -> Result<()> {
    let config = loader::load(config_path, overrides)?;
    let yaml = serde_yaml::to_string(&config)?;
    println!("{}", yaml);
    Ok(())
}

/// Prints the discovered tools and hardware encoders.
fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let (_, capabilities) = load_and_detect(config_path, &OverrideArgs::default())?;

    println!("ffmpeg:  {}", capabilities.ffmpeg.display());
    println!("ffprobe: {}", capabilities.ffprobe.display());

    let hardware = capabilities.hardware_encoders();
    if hardware.is_empty() {
        println!("Hardware encoders: none");
    } else {
        println!("Hardware encoders: {}", hardware.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn describes_each_status() {
        let mut task = ConversionTask::new(1, PathBuf::from("/v/clip.mov"));
        assert_eq!(describe(&task, 3), "[2/3] clip.mov: queued");

        task.start();
        task.update_progress(42, 29.97);
        assert_eq!(describe(&task, 3), "[2/3] clip.mov: converting  42% (30.0 fps)");

        task.fail("Conversion failed!");
        assert_eq!(describe(&task, 3), "[2/3] clip.mov: failed: Conversion failed!");
    }

    #[test]
    fn done_line_shows_output() {
        let mut task = ConversionTask::new(0, PathBuf::from("/v/clip.mov"));
        task.start();
        task.output = Some(PathBuf::from("/out/clip.mp4"));
        task.complete();
        let line = describe(&task, 1);
        assert!(line.starts_with("[1/1] clip.mov: done in "));
        assert!(line.ends_with(" -> /out/clip.mp4"));
    }
}
