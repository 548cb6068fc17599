//! Configuration data structures.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Shared configuration for one batch run. Read-only once the batch starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Output target and naming.
    #[serde(default)]
    pub output: OutputConfig,

    /// How the video bitrate is chosen.
    #[serde(default)]
    pub compression: CompressionMode,

    /// Audio track settings.
    #[serde(default)]
    pub audio: AudioConfig,

    /// Hardware-accelerated encoding.
    #[serde(default)]
    pub hardware: HardwareConfig,

    /// Delete each source file after it converted successfully.
    #[serde(default)]
    pub delete_original: bool,

    /// Explicit locations of the external tools.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Input selection when directories are given.
    #[serde(default)]
    pub input: InputConfig,
}

impl BatchConfig {
    /// Returns the directory that outputs for `input` are written to.
    ///
    /// Falls back to the input's own directory when no output directory is
    /// configured, then appends the optional subfolder.
    pub fn output_dir_for(&self, input: &Path) -> PathBuf {
        let base = match &self.output.directory {
            Some(dir) => dir.clone(),
            None => input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        match self.output.subfolder.as_deref().map(str::trim) {
            Some(sub) if !sub.is_empty() => base.join(sub),
            _ => base,
        }
    }
}

/// Output target and file naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Container format of the converted files.
    #[serde(default)]
    pub format: OutputFormat,

    /// Video codec.
    #[serde(default)]
    pub codec: VideoCodec,

    /// Encoder speed/quality trade-off token.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Output directory. Defaults to each input's directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Optional subfolder created inside the output directory.
    #[serde(default)]
    pub subfolder: Option<String>,

    /// Template for output names, e.g. "{name}_{codec}".
    #[serde(default)]
    pub rename_pattern: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            codec: VideoCodec::default(),
            preset: default_preset(),
            directory: None,
            subfolder: None,
            rename_pattern: None,
        }
    }
}

/// Supported output containers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mov,
    Mkv,
    Webm,
    Avi,
    Mpeg,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Avi => "avi",
            Self::Mpeg => "mpg",
        }
    }

    /// Audio encoder the container accepts. AAC unless the container rules it out.
    pub fn audio_encoder(&self) -> &'static str {
        match self {
            Self::Webm => "libopus",
            Self::Mpeg => "mp2",
            _ => "aac",
        }
    }

    /// Whether the container can carry the given video codec.
    pub fn supports_codec(&self, codec: VideoCodec) -> bool {
        use VideoCodec::*;
        match self {
            Self::Mkv => true,
            Self::Mp4 => matches!(codec, H264 | Hevc | Vp9 | Av1 | Mpeg2),
            Self::Mov => matches!(codec, H264 | Hevc | Prores | Mpeg2),
            Self::Webm => matches!(codec, Vp9 | Av1),
            Self::Avi => matches!(codec, H264 | Mpeg2),
            Self::Mpeg => matches!(codec, Mpeg2),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Avi => "avi",
            Self::Mpeg => "mpeg",
        };
        write!(f, "{}", name)
    }
}

/// Supported video codecs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    H264,
    Hevc,
    Vp9,
    Av1,
    Prores,
    Mpeg2,
}

impl VideoCodec {
    /// FFmpeg software encoder name.
    pub fn software_encoder(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Hevc => "libx265",
            Self::Vp9 => "libvpx-vp9",
            Self::Av1 => "libsvtav1",
            Self::Prores => "prores_ks",
            Self::Mpeg2 => "mpeg2video",
        }
    }

    /// FFmpeg hardware encoder name for the backend, if one exists.
    pub fn hardware_encoder(&self, backend: HardwareBackend) -> Option<&'static str> {
        match (backend, self) {
            (HardwareBackend::VideoToolbox, Self::H264) => Some("h264_videotoolbox"),
            (HardwareBackend::VideoToolbox, Self::Hevc) => Some("hevc_videotoolbox"),
            (HardwareBackend::VideoToolbox, Self::Prores) => Some("prores_videotoolbox"),
            (HardwareBackend::Nvenc, Self::H264) => Some("h264_nvenc"),
            (HardwareBackend::Nvenc, Self::Hevc) => Some("hevc_nvenc"),
            (HardwareBackend::Nvenc, Self::Av1) => Some("av1_nvenc"),
            _ => None,
        }
    }
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::H264 => "h264",
            Self::Hevc => "hevc",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
            Self::Prores => "prores",
            Self::Mpeg2 => "mpeg2",
        };
        write!(f, "{}", name)
    }
}

/// How the target video bitrate is chosen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompressionMode {
    /// Fixed video bitrate for every file.
    Bitrate { bitrate_kbps: u32 },
    /// Bitrate derived per file from a desired output size.
    TargetSize { size_mb: f64 },
}

impl Default for CompressionMode {
    fn default() -> Self {
        Self::Bitrate {
            bitrate_kbps: default_video_bitrate(),
        }
    }
}

/// Audio track configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio bitrate in kbps.
    #[serde(default = "default_audio_bitrate")]
    pub bitrate_kbps: u32,

    /// Audio file replacing the source's audio track.
    #[serde(default)]
    pub replacement: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: default_audio_bitrate(),
            replacement: None,
        }
    }
}

/// Hardware acceleration settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// Use a hardware encoder when one exists for the codec.
    #[serde(default)]
    pub enabled: bool,

    /// Which hardware encoder family to use.
    #[serde(default)]
    pub backend: HardwareBackend,
}

/// Hardware encoder families.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HardwareBackend {
    /// Apple VideoToolbox.
    #[default]
    VideoToolbox,
    /// NVIDIA NVENC.
    Nvenc,
}

/// Explicit tool locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the ffmpeg binary.
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary.
    #[serde(default)]
    pub ffprobe: Option<PathBuf>,
}

/// Directory expansion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Descend into subdirectories.
    #[serde(default)]
    pub recursive: bool,

    /// File name patterns to pick up from directories.
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            file_patterns: default_file_patterns(),
        }
    }
}

// Default value functions

fn default_preset() -> String {
    "medium".to_string()
}

fn default_video_bitrate() -> u32 {
    5000
}

fn default_audio_bitrate() -> u32 {
    128
}

fn default_file_patterns() -> Vec<String> {
    ["*.mp4", "*.mov", "*.mkv", "*.avi", "*.webm", "*.m4v", "*.mpg", "*.mpeg"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: BatchConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.output.format, OutputFormat::Mp4);
        assert_eq!(config.output.codec, VideoCodec::H264);
        assert_eq!(config.output.preset, "medium");
        assert_eq!(
            config.compression,
            CompressionMode::Bitrate { bitrate_kbps: 5000 }
        );
        assert_eq!(config.audio.bitrate_kbps, 128);
        assert!(!config.delete_original);
        assert!(!config.hardware.enabled);
    }

    #[test]
    fn target_size_mode_parses() {
        let yaml = r#"
output:
  format: webm
  codec: vp9
compression:
  mode: target_size
  size_mb: 25
hardware:
  enabled: true
  backend: nvenc
"#;
        let config: BatchConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.compression, CompressionMode::TargetSize { size_mb: 25.0 });
        assert_eq!(config.output.format, OutputFormat::Webm);
        assert_eq!(config.hardware.backend, HardwareBackend::Nvenc);
    }

    #[test]
    fn output_dir_defaults_to_input_parent() {
        let config = BatchConfig::default();
        assert_eq!(
            config.output_dir_for(Path::new("/videos/clip.mov")),
            PathBuf::from("/videos")
        );
    }

    #[test]
    fn output_dir_appends_subfolder() {
        let mut config = BatchConfig::default();
        config.output.directory = Some(PathBuf::from("/out"));
        config.output.subfolder = Some("converted".to_string());
        assert_eq!(
            config.output_dir_for(Path::new("/videos/clip.mov")),
            PathBuf::from("/out/converted")
        );
    }

    #[test]
    fn blank_subfolder_is_ignored() {
        let mut config = BatchConfig::default();
        config.output.subfolder = Some("  ".to_string());
        assert_eq!(
            config.output_dir_for(Path::new("/videos/clip.mov")),
            PathBuf::from("/videos")
        );
    }

    #[test]
    fn webm_uses_opus_and_mpeg_uses_mp2() {
        assert_eq!(OutputFormat::Webm.audio_encoder(), "libopus");
        assert_eq!(OutputFormat::Mpeg.audio_encoder(), "mp2");
        assert_eq!(OutputFormat::Mov.audio_encoder(), "aac");
    }

    #[test]
    fn hardware_variants() {
        assert_eq!(
            VideoCodec::Hevc.hardware_encoder(HardwareBackend::VideoToolbox),
            Some("hevc_videotoolbox")
        );
        assert_eq!(VideoCodec::Vp9.hardware_encoder(HardwareBackend::VideoToolbox), None);
        assert_eq!(VideoCodec::Av1.hardware_encoder(HardwareBackend::Nvenc), Some("av1_nvenc"));
    }
}
