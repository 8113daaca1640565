//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

/// Resolve URL to a file under `serve_root`, mapping directories to
/// `index.html`. Anything escaping the root resolves to `None`.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if clean.split('/').any(|segment| segment == "..") || clean.contains('\\') {
        return None;
    }

    let local = serve_root.join(&clean);

    // Canonicalize to resolve symlinks and verify path is under serve_root
    let canonical = local.canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

/// Request path without query or fragment, percent-decoded.
pub fn url_path(url: &str) -> String {
    use percent_encoding::percent_decode_str;

    let path = url.split(['?', '#']).next().unwrap_or(url);
    percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default()
}

/// Normalize URL: decode, strip query string, trim slashes
fn normalize_url(url: &str) -> String {
    url_path(url).trim_matches('/').to_string()
}
