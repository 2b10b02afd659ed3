//! Request URL to file resolution

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// Map a request URL onto a file below `root`
///
/// Directories resolve to their `index.html`. Anything that would escape
/// `root`, directly or through a symlink, resolves to `None`.
pub fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let relative = normalize_url(url)?;
    if relative.split('/').any(|segment| segment == "..") {
        return None;
    }

    let root = root.canonicalize().ok()?;
    let candidate = root.join(&relative).canonicalize().ok()?;
    if !candidate.starts_with(&root) {
        return None;
    }

    if candidate.is_file() {
        return Some(candidate);
    }

    let index = candidate.join("index.html");
    index.is_file().then_some(index)
}

/// Decode, drop query and fragment, trim slashes
fn normalize_url(url: &str) -> Option<String> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let decoded = percent_decode_str(&url[..end]).decode_utf8().ok()?;
    if decoded.contains('\\') || decoded.contains('\0') {
        return None;
    }
    Some(decoded.trim_matches('/').to_string())
}
