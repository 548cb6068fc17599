//! Codec availability validation.

use crate::config::model::BatchConfig;
use crate::encoder::options::select_video_encoder;

use super::{SystemCapabilities, ValidationIssue, ValidationResult};

/// Validates that the container accepts the codec and that ffmpeg offers
/// the encoders the batch will use.
pub fn validate(config: &BatchConfig, capabilities: &SystemCapabilities) -> ValidationResult {
    let mut result = ValidationResult::new();
    let format = config.output.format;
    let codec = config.output.codec;

    if !format.supports_codec(codec) {
        result.add(
            ValidationIssue::error(
                "output.codec",
                format!("Codec '{}' cannot be stored in a {} container", codec, format),
            )
            .with_suggestion("Choose another codec or use the mkv format"),
        );
    }

    if config.hardware.enabled && codec.hardware_encoder(config.hardware.backend).is_none() {
        result.add(ValidationIssue::warning(
            "hardware.enabled",
            format!(
                "No {:?} encoder for '{}'; the software encoder is used",
                config.hardware.backend, codec
            ),
        ));
    }

    let video_encoder = select_video_encoder(codec, &config.hardware);
    if !capabilities.has_encoder(video_encoder) {
        let mut issue = ValidationIssue::error(
            "output.codec",
            format!("Video encoder '{}' is not available in ffmpeg", video_encoder),
        );
        if config.hardware.enabled && capabilities.has_encoder(codec.software_encoder()) {
            issue = issue.with_suggestion(format!(
                "Disable hardware acceleration to use '{}'",
                codec.software_encoder()
            ));
        } else if !capabilities.hardware_encoders().is_empty() {
            issue = issue.with_suggestion(format!(
                "Hardware encoders found: {}",
                capabilities.hardware_encoders().join(", ")
            ));
        }
        result.add(issue);
    }

    let audio_encoder = format.audio_encoder();
    if !capabilities.has_encoder(audio_encoder) {
        result.add(ValidationIssue::error(
            "output.format",
            format!(
                "Audio encoder '{}' needed for {} is not available in ffmpeg",
                audio_encoder, format
            ),
        ));
    }

    result
}
