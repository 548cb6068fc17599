//! Configuration file loading, CLI overrides and validation.

use std::path::Path;

use anyhow::{Context, Result};

use super::model::{BatchConfig, CompressionMode};
use crate::cli::OverrideArgs;
use crate::error::ConfigError;
use crate::validation::{report, validate_config, SystemCapabilities};

/// Loads the configuration file from disk and parses it.
pub fn load_from_path(path: &Path) -> Result<BatchConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(BatchConfig::default());
    }

    let config: BatchConfig =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(config)
}

/// Loads the configuration (or defaults when no path is given) and applies CLI overrides.
pub fn load(path: Option<&Path>, overrides: &OverrideArgs) -> Result<BatchConfig, ConfigError> {
    let mut config = match path {
        Some(p) => load_from_path(p)?,
        None => BatchConfig::default(),
    };
    apply_overrides(&mut config, overrides);
    Ok(config)
}

/// Applies command-line values on top of the file configuration.
pub fn apply_overrides(config: &mut BatchConfig, overrides: &OverrideArgs) {
    if let Some(format) = overrides.format {
        config.output.format = format.into();
    }
    if let Some(codec) = overrides.codec {
        config.output.codec = codec.into();
    }
    if let Some(preset) = &overrides.preset {
        config.output.preset = preset.clone();
    }
    if let Some(bitrate_kbps) = overrides.bitrate {
        config.compression = CompressionMode::Bitrate { bitrate_kbps };
    }
    if let Some(size_mb) = overrides.target_size {
        config.compression = CompressionMode::TargetSize { size_mb };
    }
    if let Some(audio_bitrate) = overrides.audio_bitrate {
        config.audio.bitrate_kbps = audio_bitrate;
    }
    if let Some(audio) = &overrides.audio {
        config.audio.replacement = Some(audio.clone());
    }
    if let Some(dir) = &overrides.output {
        config.output.directory = Some(dir.clone());
    }
    if let Some(sub) = &overrides.subfolder {
        config.output.subfolder = Some(sub.clone());
    }
    if let Some(pattern) = &overrides.rename {
        config.output.rename_pattern = Some(pattern.clone());
    }
    if overrides.hwaccel {
        config.hardware.enabled = true;
    }
    if let Some(backend) = overrides.hw_backend {
        config.hardware.backend = backend.into();
    }
    if overrides.delete_original {
        config.delete_original = true;
    }
    if overrides.recursive {
        config.input.recursive = true;
    }
}

/// Validates a loaded configuration against the detected tools.
///
/// Warnings are logged; any error rejects the configuration.
pub fn validate(config: &BatchConfig, capabilities: &SystemCapabilities) -> Result<()> {
    let result = validate_config(config, capabilities);

    for issue in result.warnings() {
        tracing::warn!(
            path = %issue.path,
            message = %issue.message,
            suggestion = ?issue.suggestion,
            "Config validation warning"
        );
    }

    if !result.is_valid() {
        tracing::error!("{}", report::format_report(&result));
        return Err(ConfigError::ValidationFailed {
            error_count: result.error_count(),
        })
        .context("Configuration rejected");
    }

    Ok(())
}
