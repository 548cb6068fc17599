//! Encoder selection and FFmpeg argument construction.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::model::{BatchConfig, HardwareConfig, VideoCodec};

/// Presets accepted by x264 and x265.
pub const X26X_PRESETS: &[&str] = &[
    "ultrafast", "superfast", "veryfast", "faster", "fast",
    "medium", "slow", "slower", "veryslow", "placebo",
];

/// Presets accepted by the NVENC encoders.
pub const NVENC_PRESETS: &[&str] = &[
    "p1", "p2", "p3", "p4", "p5", "p6", "p7",
    "default", "slow", "medium", "fast", "hp", "hq", "bd", "ll", "llhq", "llhp",
    "lossless", "losslesshp",
];

/// Presets accepted by SVT-AV1.
pub const SVT_AV1_PRESETS: &[&str] = &[
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13",
];

/// Picks the FFmpeg video encoder: the hardware variant when acceleration is
/// enabled and one exists for the codec, otherwise the software encoder.
pub fn select_video_encoder(codec: VideoCodec, hardware: &HardwareConfig) -> &'static str {
    if hardware.enabled {
        if let Some(hw) = codec.hardware_encoder(hardware.backend) {
            return hw;
        }
    }
    codec.software_encoder()
}

/// Returns the preset vocabulary of an encoder, or None if it takes no `-preset`.
pub fn preset_values(encoder: &str) -> Option<&'static [&'static str]> {
    match encoder {
        "libx264" | "libx265" => Some(X26X_PRESETS),
        "libsvtav1" => Some(SVT_AV1_PRESETS),
        e if e.ends_with("_nvenc") => Some(NVENC_PRESETS),
        _ => None,
    }
}

/// Returns the preset to pass, if the encoder accepts it.
pub fn effective_preset(encoder: &str, preset: &str) -> Option<String> {
    let preset = preset.trim();
    preset_values(encoder)
        .filter(|values| values.contains(&preset))
        .map(|_| preset.to_string())
}

/// Everything needed to run one encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeCommand {
    /// Source video.
    pub input: PathBuf,
    /// Replacement audio track.
    pub audio_input: Option<PathBuf>,
    /// Resolved output file.
    pub output: PathBuf,
    /// FFmpeg video encoder name.
    pub video_encoder: String,
    /// FFmpeg audio encoder name.
    pub audio_encoder: String,
    /// Target video bitrate. May be zero or negative for tiny size targets.
    pub video_bitrate_kbps: i64,
    /// Audio bitrate.
    pub audio_bitrate_kbps: u32,
    /// Encoder preset, when the encoder takes one.
    pub preset: Option<String>,
    /// Duration used to turn output time into a percentage.
    pub duration_secs: f64,
}

impl EncodeCommand {
    /// Builds the command for one input under the batch configuration.
    pub fn new(
        config: &BatchConfig,
        input: PathBuf,
        output: PathBuf,
        video_bitrate_kbps: i64,
        duration_secs: f64,
    ) -> Self {
        let video_encoder = select_video_encoder(config.output.codec, &config.hardware);
        Self {
            input,
            audio_input: config.audio.replacement.clone(),
            output,
            video_encoder: video_encoder.to_string(),
            audio_encoder: config.output.format.audio_encoder().to_string(),
            video_bitrate_kbps,
            audio_bitrate_kbps: config.audio.bitrate_kbps,
            preset: effective_preset(video_encoder, &config.output.preset),
            duration_secs,
        }
    }

    /// FFmpeg arguments, without the binary itself.
    ///
    /// Progress is written to stdout as `key=value` blocks.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(self.input.clone().into_os_string());

        let audio_map = match &self.audio_input {
            Some(audio) => {
                args.push(OsString::from("-i"));
                args.push(audio.clone().into_os_string());
                "1:a:0"
            }
            None => "0:a?",
        };
        for arg in ["-map", "0:v:0", "-map", audio_map] {
            args.push(OsString::from(arg));
        }

        let rate = format!("{}k", self.video_bitrate_kbps);
        for arg in [
            "-c:v", &self.video_encoder,
            "-b:v", &rate,
            "-minrate", &rate,
            "-maxrate", &rate,
            "-bufsize", &rate,
        ] {
            args.push(OsString::from(arg));
        }

        if let Some(preset) = &self.preset {
            args.push(OsString::from("-preset"));
            args.push(OsString::from(preset));
        }

        let audio_rate = format!("{}k", self.audio_bitrate_kbps);
        for arg in [
            "-c:a", &self.audio_encoder,
            "-b:a", &audio_rate,
            "-progress", "pipe:1",
            "-nostats",
        ] {
            args.push(OsString::from(arg));
        }

        args.push(self.output.clone().into_os_string());
        args
    }
}
