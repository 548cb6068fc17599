//! Collision-free output path resolution.

use std::io;
use std::path::{Path, PathBuf};

/// Returns `dir/base.ext`, or the first free `dir/base_N.ext` (N = 1, 2, ...).
///
/// Creates `dir` (recursively) first. The check is not atomic; callers
/// resolve and write one file at a time.
pub fn resolve_output_path(dir: &Path, base: &str, extension: &str) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let ext = extension.trim_start_matches('.');
    let file_name = |suffix: Option<u32>| {
        let stem = match suffix {
            Some(n) => format!("{}_{}", base, n),
            None => base.to_string(),
        };
        if ext.is_empty() {
            stem
        } else {
            format!("{}.{}", stem, ext)
        }
    };

    let candidate = dir.join(file_name(None));
    if !candidate.exists() {
        return Ok(candidate);
    }

    let mut n: u32 = 1;
    loop {
        let candidate = dir.join(file_name(Some(n)));
        if !candidate.exists() {
            return Ok(candidate);
        }
        n = n.checked_add(1).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free name for '{}' in '{}'", base, dir.display()),
            )
        })?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_name_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve_output_path(dir.path(), "video", ".mp4").unwrap();
        assert_eq!(path, dir.path().join("video.mp4"));
    }

    #[test]
    fn skips_taken_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("video.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("video_1.mp4"), b"").unwrap();

        let path = resolve_output_path(dir.path(), "video", ".mp4").unwrap();
        assert_eq!(path, dir.path().join("video_2.mp4"));
    }

    #[test]
    fn extension_without_dot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.webm"), b"").unwrap();
        let path = resolve_output_path(dir.path(), "clip", "webm").unwrap();
        assert_eq!(path, dir.path().join("clip_1.webm"));
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let path = resolve_output_path(&nested, "clip", "mkv").unwrap();
        assert!(nested.is_dir());
        assert_eq!(path, nested.join("clip.mkv"));
    }

    #[test]
    fn other_extensions_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mov"), b"").unwrap();
        let path = resolve_output_path(dir.path(), "clip", "mp4").unwrap();
        assert_eq!(path, dir.path().join("clip.mp4"));
    }
}
