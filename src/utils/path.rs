//! Path normalization utilities.

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Lexical cleanup if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            clean(path)
        } else {
            std::env::current_dir().map_or_else(|_| clean(path), |cwd| clean(&cwd.join(path)))
        }
    })
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// Used for paths that may not exist yet (output directories, removed files).
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
