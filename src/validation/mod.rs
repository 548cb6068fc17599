//! Configuration validation system.

pub mod codec;
pub mod paths;
pub mod report;
pub mod semantic;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{BatchConfig, ToolsConfig};
use crate::error::CapabilityError;

/// Directories searched for ffmpeg and ffprobe before `PATH`.
const WELL_KNOWN_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"];

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Blocks the batch from starting.
    Error,
    /// Logged but allows the batch to run.
    Warning,
}

/// A validation issue found during configuration checking.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue.
    pub severity: ValidationSeverity,
    /// Path to the problematic config field (e.g., "output.codec").
    pub path: String,
    /// Description of the issue.
    pub message: String,
    /// Optional suggestion for fixing the issue.
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Creates a new error-level validation issue.
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Error,
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Creates a new warning-level validation issue.
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Warning,
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Adds a suggestion to this validation issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Result of validating a configuration.
#[derive(Debug, Default)]
pub struct ValidationResult {
    issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Creates an empty validation result.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the result.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Extends the result with issues from another result.
    pub fn extend(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }

    /// Returns true if there are no errors (warnings are allowed).
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == ValidationSeverity::Error)
    }

    /// Returns an iterator over error-level issues.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Error)
    }

    /// Returns an iterator over warning-level issues.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Warning)
    }

    /// Returns the number of errors.
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Returns true if an issue was reported for `path`.
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

/// Tools and encoders found on this machine.
#[derive(Debug, Clone)]
pub struct SystemCapabilities {
    /// ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// ffprobe executable.
    pub ffprobe: PathBuf,
    /// Encoders listed by `ffmpeg -encoders`.
    pub available_encoders: HashSet<String>,
}

impl SystemCapabilities {
    /// Creates capabilities from known values.
    pub fn new(
        ffmpeg: impl Into<PathBuf>,
        ffprobe: impl Into<PathBuf>,
        available_encoders: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            available_encoders: available_encoders.into_iter().map(Into::into).collect(),
        }
    }

    /// Locates ffmpeg and ffprobe and lists the available encoders.
    pub fn detect(tools: &ToolsConfig) -> Result<Self, CapabilityError> {
        let ffmpeg = locate_tool("ffmpeg", tools.ffmpeg.as_deref())?;
        let ffprobe = locate_tool("ffprobe", tools.ffprobe.as_deref())?;
        let available_encoders = detect_ffmpeg_encoders(&ffmpeg)?;

        debug!(
            ffmpeg = %ffmpeg.display(),
            ffprobe = %ffprobe.display(),
            encoders = available_encoders.len(),
            "Detected tools"
        );

        Ok(Self {
            ffmpeg,
            ffprobe,
            available_encoders,
        })
    }

    /// Returns true if ffmpeg offers `encoder`.
    pub fn has_encoder(&self, encoder: &str) -> bool {
        self.available_encoders.contains(encoder)
    }

    /// Hardware video encoders offered by ffmpeg, sorted.
    pub fn hardware_encoders(&self) -> Vec<&str> {
        let mut encoders: Vec<&str> = self
            .available_encoders
            .iter()
            .map(String::as_str)
            .filter(|e| e.ends_with("_videotoolbox") || e.ends_with("_nvenc"))
            .collect();
        encoders.sort_unstable();
        encoders
    }
}

/// Finds a working binary: the configured path, the well-known directories,
/// then `PATH`.
fn locate_tool(name: &str, configured: Option<&Path>) -> Result<PathBuf, CapabilityError> {
    if let Some(path) = configured {
        return if runs(path) {
            Ok(path.to_path_buf())
        } else {
            Err(CapabilityError::ToolNotFound {
                tool: format!("{} (configured as '{}')", name, path.display()),
            })
        };
    }

    WELL_KNOWN_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(name))
        .filter(|p| p.is_file())
        .chain(std::iter::once(PathBuf::from(name)))
        .find(|p| runs(p))
        .ok_or_else(|| CapabilityError::ToolNotFound {
            tool: name.to_string(),
        })
}

/// Returns true if `<tool> -version` exits successfully.
fn runs(tool: &Path) -> bool {
    std::process::Command::new(tool)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Detects available FFmpeg encoders by parsing `ffmpeg -encoders`.
fn detect_ffmpeg_encoders(ffmpeg: &Path) -> Result<HashSet<String>, CapabilityError> {
    let command = format!("{} -encoders", ffmpeg.display());
    let output = std::process::Command::new(ffmpeg)
        .args(["-encoders", "-hide_banner"])
        .output()
        .map_err(|e| CapabilityError::CommandFailed {
            command: command.clone(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(CapabilityError::CommandFailed {
            command,
            message: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(parse_ffmpeg_codec_list(&String::from_utf8_lossy(&output.stdout)))
}

/// Parses FFmpeg encoder list output into a set of encoder names.
fn parse_ffmpeg_codec_list(output: &str) -> HashSet<String> {
    let mut codecs = HashSet::new();
    let mut in_list = false;

    for line in output.lines() {
        // Entries look like: " V....D libx264              libx264 H.264 / AVC ..."
        let trimmed = line.trim();
        if trimmed.starts_with("------") {
            in_list = true;
            continue;
        }
        if !in_list || trimmed.is_empty() {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        if let (Some(flags), Some(name)) = (parts.next(), parts.next()) {
            if flags.len() == 6 && flags.starts_with(&['V', 'A', 'S'][..]) {
                codecs.insert(name.to_string());
            }
        }
    }

    codecs
}

/// Validates the configuration against system capabilities.
pub fn validate_config(config: &BatchConfig, capabilities: &SystemCapabilities) -> ValidationResult {
    let mut result = ValidationResult::new();

    result.extend(semantic::validate(config));
    result.extend(codec::validate(config, capabilities));
    result.extend(paths::validate(config));

    result
}
