//! Error types for the batch converter.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and parsing errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Config validation failed with {error_count} error(s)")]
    ValidationFailed { error_count: usize },
}

/// Encoding operation errors.
#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("ffprobe failed for '{path}': {message}")]
    ProbeFailed { path: PathBuf, message: String },

    #[error("Process spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Cannot prepare output path in '{dir}': {source}")]
    OutputPath {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("Encoding process was terminated")]
    Terminated,
}

/// Input file selection errors.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Input path does not exist: '{0}'")]
    NotFound(PathBuf),

    #[error("Invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("No input files matched")]
    Empty,
}

/// Capability detection errors.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Failed to run '{command}': {message}")]
    CommandFailed { command: String, message: String },

    #[error("Required tool '{tool}' not found")]
    ToolNotFound { tool: String },
}
