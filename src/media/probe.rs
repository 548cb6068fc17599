//! FFprobe wrapper for media analysis.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::EncoderError;

/// Result of probing a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// File path.
    pub path: String,
    /// Container format.
    pub format: String,
    /// Duration in seconds, when the container reports one.
    pub duration: Option<f64>,
    /// File size in bytes.
    pub size: u64,
    /// Overall bitrate in bits per second.
    pub bitrate: u64,
    /// Number of video streams.
    pub video_streams: usize,
    /// Number of audio streams.
    pub audio_streams: usize,
}

/// Probes a media file using ffprobe.
pub async fn probe(ffprobe: &Path, path: &Path) -> Result<MediaInfo, EncoderError> {
    let output = Command::new(ffprobe)
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| EncoderError::ProbeFailed {
            path: path.to_path_buf(),
            message: format!("Failed to run ffprobe: {}", e),
        })?;

    if !output.status.success() {
        return Err(EncoderError::ProbeFailed {
            path: path.to_path_buf(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).map_err(|e| EncoderError::ProbeFailed {
            path: path.to_path_buf(),
            message: format!("Failed to parse ffprobe output: {}", e),
        })?;

    let info = parse_probe_output(&json, path)?;
    debug!(path = ?path, duration = ?info.duration, format = %info.format, "Probed media");
    Ok(info)
}

/// Parses ffprobe JSON output into structured data.
pub fn parse_probe_output(json: &serde_json::Value, path: &Path) -> Result<MediaInfo, EncoderError> {
    let format = json.get("format").ok_or_else(|| EncoderError::ProbeFailed {
        path: path.to_path_buf(),
        message: "Missing format in ffprobe output".to_string(),
    })?;
    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let count = |kind: &str| {
        streams
            .iter()
            .filter(|s| s.get("codec_type").and_then(|v| v.as_str()) == Some(kind))
            .count()
    };

    Ok(MediaInfo {
        path: path.to_string_lossy().to_string(),
        format: format
            .get("format_name")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        duration: format
            .get("duration")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .or_else(|| longest_stream_duration(streams)),
        size: format
            .get("size")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        bitrate: format
            .get("bit_rate")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        video_streams: count("video"),
        audio_streams: count("audio"),
    })
}

/// Some containers only report durations per stream.
fn longest_stream_duration(streams: &[serde_json::Value]) -> Option<f64> {
    streams
        .iter()
        .filter_map(|s| s.get("duration").and_then(|v| v.as_str()))
        .filter_map(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))))
}
