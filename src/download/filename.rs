//! Filename derivation, sanitization, and collision handling.
//!
//! The core only ever writes files whose name has no directory component;
//! everything derived from a URL or a browser-suggested name passes through
//! [`sanitize_filename`] before touching the filesystem.

use std::path::{Component, Path, PathBuf};

use url::Url;

use super::constants::DEFAULT_FILENAME;

/// Derives a filename from a URL's last path segment.
///
/// The query string is not part of the segment, and percent-encoding is
/// decoded. Falls back to [`DEFAULT_FILENAME`] for URLs with an empty or
/// missing final segment.
#[must_use]
pub(crate) fn filename_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    if segment.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }
    let decoded = urlencoding::decode(segment)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| segment.to_string());
    let sanitized = sanitize_filename(&decoded);
    if sanitized.is_empty() || sanitized == "_" {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Sanitizes a filename for filesystem safety.
///
/// Replaces characters invalid on common filesystems and strips anything
/// that would introduce a directory component or relative traversal.
#[must_use]
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_bare_filename(&sanitized) {
        sanitized
    } else {
        "_".to_string()
    }
}

/// Returns true if `name` is a single normal path component.
fn is_bare_filename(name: &str) -> bool {
    let path = Path::new(name);
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Resolves a collision-free path for `filename` inside `dir`.
///
/// When the name is taken, appends `_2`, `_3`, ... before the extension
/// rather than overwriting a previously retrieved artifact.
#[must_use]
pub(crate) fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = split_extension(filename);
    for suffix in 2..=MAX_SUFFIX_ATTEMPTS {
        let renamed = format!("{stem}_{suffix}{extension}");
        let candidate = dir.join(&renamed);
        if !candidate.exists() {
            return candidate;
        }
    }

    // Suffix space exhausted; fall back to a timestamped name.
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    dir.join(format!("{stem}_{stamp}{extension}"))
}

/// Bound on numeric collision suffixes before the timestamp fallback.
const MAX_SUFFIX_ATTEMPTS: u32 = 1000;

/// Splits a filename into stem and extension, keeping compound firmware
/// extensions such as `.tar.gz` together.
fn split_extension(filename: &str) -> (&str, &str) {
    for compound in [".tar.gz", ".tar.bz2", ".tar.xz"] {
        if let Some(stem) = filename.strip_suffix(compound) {
            if !stem.is_empty() {
                return (stem, compound);
            }
        }
    }
    match filename.rfind('.') {
        Some(index) if index > 0 => filename.split_at(index),
        _ => (filename, ""),
    }
}
