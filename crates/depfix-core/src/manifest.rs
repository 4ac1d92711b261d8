//! Manifest discovery and byte-preserving edits.
//!
//! Manifests are rewritten by splicing replacement text into the exact byte
//! span that held the old value; every other byte of the file is kept.

use crate::error::{FixError, Result};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// How many parent directories are searched above the working directory.
pub const MAX_PARENT_DEPTH: usize = 5;

/// Finds the first of `names` in `start` or one of its parents.
///
/// Searches `start` itself and then up to [`MAX_PARENT_DEPTH`] ancestors, so
/// a fix run from a package directory inside a workspace still finds the
/// workspace manifest.
///
/// # Examples
///
/// ```no_run
/// use depfix_core::manifest::locate_upwards;
/// use std::path::Path;
///
/// if let Some(go_mod) = locate_upwards(Path::new("/repo/cmd/server"), &["go.mod"]) {
///     println!("module root: {}", go_mod.display());
/// }
/// ```
pub fn locate_upwards(start: &Path, names: &[&str]) -> Option<PathBuf> {
    let mut dir = Some(start);
    let mut depth = 0;

    while let Some(current) = dir {
        for name in names {
            let candidate = current.join(name);
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "located manifest");
                return Some(candidate);
            }
        }
        if depth == MAX_PARENT_DEPTH {
            break;
        }
        depth += 1;
        dir = current.parent();
    }

    None
}

/// Like [`locate_upwards`] but a missing manifest is a parse error for
/// `package`.
pub fn require_manifest(start: &Path, names: &[&str], package: &str) -> Result<PathBuf> {
    locate_upwards(start, names).ok_or_else(|| {
        FixError::parse(
            package,
            names.join(" | "),
            format!("no manifest found from {}", start.display()),
        )
    })
}

pub async fn read_manifest(path: &Path) -> Result<String> {
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Writes `updated` when it differs from `original`.
///
/// Returns whether the file was written.
pub async fn write_if_changed(path: &Path, original: &str, updated: &str) -> Result<bool> {
    if original == updated {
        tracing::debug!(path = %path.display(), "manifest already up to date");
        return Ok(false);
    }
    tokio::fs::write(path, updated).await?;
    tracing::info!(path = %path.display(), "manifest rewritten");
    Ok(true)
}

/// Replaces the bytes in `span` with `replacement`.
///
/// A span outside `content` or not on a char boundary becomes an insertion
/// at the end.
pub fn splice(content: &str, span: Range<usize>, replacement: &str) -> String {
    let valid = span.start <= span.end
        && span.end <= content.len()
        && content.is_char_boundary(span.start)
        && content.is_char_boundary(span.end);
    let span = if valid {
        span
    } else {
        content.len()..content.len()
    };

    let mut out = String::with_capacity(content.len() + replacement.len());
    out.push_str(&content[..span.start]);
    out.push_str(replacement);
    out.push_str(&content[span.end..]);
    out
}

/// Applies several non-overlapping edits in one pass.
///
/// Edits may be given in any order; overlapping edits after the first are
/// dropped.
pub fn splice_all(content: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for (span, replacement) in edits {
        if span.start < cursor || span.end > content.len() || span.start > span.end {
            continue;
        }
        out.push_str(&content[cursor..span.start]);
        out.push_str(&replacement);
        cursor = span.end;
    }
    out.push_str(&content[cursor..]);
    out
}

/// Puts `original` back at `path` when `result` is an error.
///
/// Used when a manifest was edited ahead of a package manager run, so a
/// failed run does not leave the manifest out of step with its lockfile.
pub async fn restore_on_error<T>(path: &Path, original: &str, result: Result<T>) -> Result<T> {
    if result.is_err() {
        match tokio::fs::write(path, original).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "restored manifest after failed update");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to restore manifest");
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_upwards_in_start_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module x\n").unwrap();
        assert_eq!(
            locate_upwards(dir.path(), &["go.mod"]),
            Some(dir.path().join("go.mod"))
        );
    }

    #[test]
    fn test_locate_upwards_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Pipfile"), "[packages]\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            locate_upwards(&nested, &["Pipfile"]),
            Some(dir.path().join("Pipfile"))
        );
    }

    #[test]
    fn test_locate_upwards_respects_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        assert_eq!(
            locate_upwards(dir.path(), &["a.txt", "b.txt"]),
            Some(dir.path().join("a.txt"))
        );
    }

    #[test]
    fn test_locate_upwards_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module x\n").unwrap();
        let mut deep = dir.path().to_path_buf();
        for i in 0..=MAX_PARENT_DEPTH {
            deep = deep.join(format!("d{i}"));
        }
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(locate_upwards(&deep, &["go.mod"]), None);
    }

    #[test]
    fn test_require_manifest_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = require_manifest(dir.path(), &["go.mod"], "golang.org/x/net").unwrap_err();
        assert!(matches!(err, FixError::ParseError { .. }));
    }

    #[test]
    fn test_splice() {
        let content = "requests==2.0.0\nflask\n";
        assert_eq!(
            splice(content, 0..15, "requests==2.31.0"),
            "requests==2.31.0\nflask\n"
        );
    }

    #[test]
    fn test_splice_out_of_bounds_appends() {
        assert_eq!(splice("abc", 5..9, "d"), "abcd");
    }

    #[test]
    fn test_splice_all_preserves_untouched_bytes() {
        let content = "<a>1</a>  <b>2</b>";
        let edited = splice_all(content, vec![(13..14, "3".into()), (3..4, "9".into())]);
        assert_eq!(edited, "<a>9</a>  <b>3</b>");
    }

    #[tokio::test]
    async fn test_write_if_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        tokio::fs::write(&path, "{}").await.unwrap();

        assert!(!write_if_changed(&path, "{}", "{}").await.unwrap());
        assert!(write_if_changed(&path, "{}", "{\"a\":1}").await.unwrap());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_restore_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyproject.toml");
        tokio::fs::write(&path, "edited").await.unwrap();

        let kept = restore_on_error(&path, "original", Ok(1)).await.unwrap();
        assert_eq!(kept, 1);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "edited");

        let failed: Result<()> = Err(FixError::parse("pyjwt", "pyproject.toml", "boom"));
        assert!(restore_on_error(&path, "original", failed).await.is_err());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "original");
    }
}
