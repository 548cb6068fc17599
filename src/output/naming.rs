//! Rename-pattern substitution for output file names.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::model::{OutputFormat, VideoCodec};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("invalid token regex"));

/// Tokens understood in rename patterns.
pub const KNOWN_TOKENS: &[&str] = &["name", "ext", "format", "codec", "duration"];

/// Values substituted into a rename pattern for one file.
#[derive(Debug, Clone)]
pub struct NameTokens {
    /// Original file name without extension.
    pub name: String,
    /// Original extension without the dot.
    pub ext: String,
    /// Target container.
    pub format: OutputFormat,
    /// Target codec.
    pub codec: VideoCodec,
    /// Media duration in seconds.
    pub duration_secs: f64,
}

impl NameTokens {
    /// Builds the tokens for an input path.
    pub fn for_input(input: &Path, format: OutputFormat, codec: VideoCodec, duration_secs: f64) -> Self {
        Self {
            name: input
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "output".to_string()),
            ext: input
                .extension()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default(),
            format,
            codec,
            duration_secs,
        }
    }

    fn value(&self, token: &str) -> Option<String> {
        match token {
            "name" => Some(self.name.clone()),
            "ext" => Some(self.ext.clone()),
            "format" => Some(self.format.to_string()),
            "codec" => Some(self.codec.to_string()),
            "duration" => Some(format!("{}s", self.duration_secs.round() as u64)),
            _ => None,
        }
    }
}

/// Produces the output base name (no extension).
///
/// Without a pattern the original name is kept. Unknown tokens are left
/// verbatim. Path separators in the result are replaced so the name stays
/// inside the output directory.
pub fn output_base_name(pattern: Option<&str>, tokens: &NameTokens) -> String {
    let rendered = match pattern.map(str::trim) {
        Some(p) if !p.is_empty() => TOKEN_RE
            .replace_all(p, |caps: &regex::Captures| {
                tokens.value(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned(),
        _ => tokens.name.clone(),
    };

    let sanitized: String = rendered
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let trimmed = sanitized.trim();

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        tokens.name.clone()
    } else {
        trimmed.to_string()
    }
}

/// Lists tokens in a pattern that are not in [`KNOWN_TOKENS`].
pub fn unknown_tokens(pattern: &str) -> Vec<String> {
    TOKEN_RE
        .captures_iter(pattern)
        .map(|caps| caps[1].to_string())
        .filter(|t| !KNOWN_TOKENS.contains(&t.as_str()))
        .collect()
}
