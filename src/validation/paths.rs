//! Path validation for the audio track and output directory.

use std::path::Path;

use crate::config::model::BatchConfig;

use super::{ValidationIssue, ValidationResult};

/// Validates that configured paths exist and are accessible.
///
/// When no output directory is configured outputs go next to each input,
/// which is checked per file when the output path is resolved.
pub fn validate(config: &BatchConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    if let Some(audio) = &config.audio.replacement {
        if !audio.is_file() {
            result.add(
                ValidationIssue::error(
                    "audio.replacement",
                    format!("Replacement audio file not found: '{}'", audio.display()),
                )
                .with_suggestion("Check the path or drop the replacement audio"),
            );
        }
    }

    if let Some(dir) = &config.output.directory {
        validate_directory_writable(dir, "output.directory", &mut result);
    }

    result
}

/// Validates that a directory exists (creating it if needed) and is writable.
fn validate_directory_writable(path: &Path, config_path: &str, result: &mut ValidationResult) {
    if !path.exists() {
        if let Err(e) = std::fs::create_dir_all(path) {
            result.add(
                ValidationIssue::error(
                    config_path,
                    format!("Cannot create directory '{}': {}", path.display(), e),
                )
                .with_suggestion("Check parent directory permissions"),
            );
        }
        return;
    }

    if !path.is_dir() {
        result.add(ValidationIssue::error(
            config_path,
            format!("Path is not a directory: '{}'", path.display()),
        ));
        return;
    }

    let probe = path.join(format!(".batch-convert-{}", uuid::Uuid::new_v4()));
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
        }
        Err(e) => {
            result.add(
                ValidationIssue::error(
                    config_path,
                    format!("Directory is not writable '{}': {}", path.display(), e),
                )
                .with_suggestion("Check directory permissions"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_audio_is_error() {
        let mut config = BatchConfig::default();
        config.audio.replacement = Some("/nonexistent/track.m4a".into());
        let result = validate(&config);
        assert!(!result.is_valid());
        assert!(result.has_issue_at("audio.replacement"));
    }

    #[test]
    fn existing_audio_is_fine() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = BatchConfig::default();
        config.audio.replacement = Some(file.path().to_path_buf());
        assert!(validate(&config).is_valid());
    }

    #[test]
    fn output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("converted");
        let mut config = BatchConfig::default();
        config.output.directory = Some(out.clone());
        assert!(validate(&config).is_valid());
        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn output_path_that_is_a_file_is_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = BatchConfig::default();
        config.output.directory = Some(file.path().to_path_buf());
        assert!(!validate(&config).is_valid());
    }
}
