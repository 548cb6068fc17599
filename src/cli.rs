//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::model::{HardwareBackend, OutputFormat, VideoCodec};

/// Convert batches of video files sequentially through ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "batch-convert", version, about, long_about = None)]
pub struct Cli {
    /// Path to an optional YAML configuration file.
    #[arg(short, long, env = "BATCH_CONVERT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the log level based on verbosity flags.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert the given files and directories.
    Convert(ConvertArgs),

    /// Validate the configuration without converting anything.
    #[command(name = "config-validate")]
    ConfigValidate(OverrideArgs),

    /// Display the effective configuration.
    #[command(name = "config-show")]
    ConfigShow(OverrideArgs),

    /// Locate ffmpeg/ffprobe and list hardware encoders.
    Check,
}

/// Arguments for the convert subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input files or directories.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Print every task snapshot as a JSON line.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

/// Flags that override configuration file values.
#[derive(Args, Debug, Default, Clone)]
pub struct OverrideArgs {
    /// Output container format.
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Video codec.
    #[arg(long, value_enum)]
    pub codec: Option<CodecArg>,

    /// Encoder preset (e.g. fast, medium, slow).
    #[arg(long)]
    pub preset: Option<String>,

    /// Fixed video bitrate in kbps.
    #[arg(long, conflicts_with = "target_size")]
    pub bitrate: Option<u32>,

    /// Target output size in MB; bitrate is derived per file.
    #[arg(long)]
    pub target_size: Option<f64>,

    /// Audio bitrate in kbps.
    #[arg(long)]
    pub audio_bitrate: Option<u32>,

    /// Replace the audio track with this file.
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Output directory.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Subfolder created inside the output directory.
    #[arg(long)]
    pub subfolder: Option<String>,

    /// Rename pattern, e.g. "{name}_{codec}_{duration}".
    #[arg(long)]
    pub rename: Option<String>,

    /// Use a hardware encoder when available.
    #[arg(long)]
    pub hwaccel: bool,

    /// Hardware encoder family.
    #[arg(long, value_enum)]
    pub hw_backend: Option<BackendArg>,

    /// Delete source files after a successful conversion.
    #[arg(long)]
    pub delete_original: bool,

    /// Descend into subdirectories of directory inputs.
    #[arg(short, long)]
    pub recursive: bool,
}

/// Output format accepted on the command line.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum FormatArg {
    Mp4,
    Mov,
    Mkv,
    Webm,
    Avi,
    Mpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Mp4 => Self::Mp4,
            FormatArg::Mov => Self::Mov,
            FormatArg::Mkv => Self::Mkv,
            FormatArg::Webm => Self::Webm,
            FormatArg::Avi => Self::Avi,
            FormatArg::Mpeg => Self::Mpeg,
        }
    }
}

/// Video codec accepted on the command line.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum CodecArg {
    H264,
    Hevc,
    Vp9,
    Av1,
    Prores,
    Mpeg2,
}

impl From<CodecArg> for VideoCodec {
    fn from(arg: CodecArg) -> Self {
        match arg {
            CodecArg::H264 => Self::H264,
            CodecArg::Hevc => Self::Hevc,
            CodecArg::Vp9 => Self::Vp9,
            CodecArg::Av1 => Self::Av1,
            CodecArg::Prores => Self::Prores,
            CodecArg::Mpeg2 => Self::Mpeg2,
        }
    }
}

/// Hardware backend accepted on the command line.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum BackendArg {
    Videotoolbox,
    Nvenc,
}

impl From<BackendArg> for HardwareBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Videotoolbox => Self::VideoToolbox,
            BackendArg::Nvenc => Self::Nvenc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_convert_with_overrides() {
        let cli = Cli::parse_from([
            "batch-convert",
            "-v",
            "convert",
            "a.mov",
            "b.mov",
            "--format",
            "webm",
            "--codec",
            "vp9",
            "--target-size",
            "25",
            "--hwaccel",
        ]);
        assert_eq!(cli.log_level(), "debug");
        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.inputs.len(), 2);
                assert_eq!(args.overrides.target_size, Some(25.0));
                assert!(args.overrides.hwaccel);
                assert!(matches!(args.overrides.format, Some(FormatArg::Webm)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn bitrate_conflicts_with_target_size() {
        let result = Cli::try_parse_from([
            "batch-convert",
            "convert",
            "a.mov",
            "--bitrate",
            "4000",
            "--target-size",
            "10",
        ]);
        assert!(result.is_err());
    }
}
