//! Semantic validation for configuration values.

use crate::config::model::{BatchConfig, CompressionMode};
use crate::encoder::options::{preset_values, select_video_encoder};
use crate::output::naming::{unknown_tokens, KNOWN_TOKENS};

use super::{ValidationIssue, ValidationResult};

/// Audio bitrates outside this range are unusual enough to warn about.
const AUDIO_BITRATE_RANGE: std::ops::RangeInclusive<u32> = 32..=512;

/// Validates semantic correctness of configuration values.
pub fn validate(config: &BatchConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_compression(&config.compression, &mut result);

    let audio = config.audio.bitrate_kbps;
    if !AUDIO_BITRATE_RANGE.contains(&audio) {
        result.add(
            ValidationIssue::warning(
                "audio.bitrate_kbps",
                format!("Audio bitrate {} kbps is unusual", audio),
            )
            .with_suggestion(format!(
                "Typical values are between {} and {} kbps",
                AUDIO_BITRATE_RANGE.start(),
                AUDIO_BITRATE_RANGE.end()
            )),
        );
    }

    validate_preset(config, &mut result);

    if let Some(pattern) = &config.output.rename_pattern {
        for token in unknown_tokens(pattern) {
            result.add(
                ValidationIssue::warning(
                    "output.rename_pattern",
                    format!("Unknown token '{{{}}}' will be kept as is", token),
                )
                .with_suggestion(format!("Did you mean '{{{}}}'?", closest(&token, KNOWN_TOKENS))),
            );
        }
    }

    if let Some(sub) = &config.output.subfolder {
        if sub.contains(&['/', '\\'][..]) || sub == ".." {
            result.add(ValidationIssue::warning(
                "output.subfolder",
                format!("Subfolder '{}' points outside a single directory level", sub),
            ));
        }
    }

    result
}

fn validate_compression(mode: &CompressionMode, result: &mut ValidationResult) {
    match *mode {
        CompressionMode::Bitrate { bitrate_kbps: 0 } => {
            result.add(ValidationIssue::error(
                "compression.bitrate_kbps",
                "Bitrate must be greater than 0",
            ));
        }
        CompressionMode::TargetSize { size_mb } if !(size_mb.is_finite() && size_mb > 0.0) => {
            result.add(ValidationIssue::error(
                "compression.size_mb",
                format!("Target size {} MB must be greater than 0", size_mb),
            ));
        }
        _ => {}
    }
}

fn validate_preset(config: &BatchConfig, result: &mut ValidationResult) {
    let preset = config.output.preset.trim();
    let encoder = select_video_encoder(config.output.codec, &config.hardware);

    match preset_values(encoder) {
        Some(values) if !values.contains(&preset) => {
            result.add(
                ValidationIssue::warning(
                    "output.preset",
                    format!(
                        "Preset '{}' is not valid for {}; the encoder default is used",
                        preset, encoder
                    ),
                )
                .with_suggestion(format!("Did you mean '{}'?", closest(preset, values))),
            );
        }
        None if !preset.is_empty() && preset != "medium" => {
            result.add(ValidationIssue::warning(
                "output.preset",
                format!("{} takes no preset; '{}' is ignored", encoder, preset),
            ));
        }
        _ => {}
    }
}

/// Finds the most similar candidate using Levenshtein distance.
fn closest<'a>(input: &str, candidates: &[&'a str]) -> &'a str {
    let input = input.to_lowercase();
    candidates
        .iter()
        .min_by_key(|c| strsim::levenshtein(&input, c))
        .copied()
        .unwrap_or_default()
}
