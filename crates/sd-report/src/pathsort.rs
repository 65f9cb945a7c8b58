//! Natural ordering for delimiter-segmented hierarchical paths.
//!
//! Distinguished names such as `OU=Sales,DC=root` list the deepest segment
//! first. Paths are compared from the root end: segment by segment starting
//! at the rightmost one, so siblings group under their container and a
//! container sorts before everything inside it.

use std::cmp::Ordering;
use std::sync::Once;

/// Segments beyond this depth are not compared individually.
pub const MAX_PATH_SEGMENTS: usize = 16;

static DEPTH_NOTICE: Once = Once::new();

/// Split a path on `delimiter`, honoring backslash escapes.
///
/// Escaped delimiters stay inside their segment; segments are trimmed.
pub fn split_path(path: &str, delimiter: char) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in path.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            current.push(ch);
            escaped = true;
        } else if ch == delimiter {
            segments.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    segments.push(current.trim().to_string());
    segments
}

/// Compare two paths root-first.
///
/// Segments compare case-insensitively. When one path is a root-side prefix
/// of the other, the shorter (closer to root) sorts first. Only the
/// [`MAX_PATH_SEGMENTS`] segments nearest the root are compared one by one;
/// deeper paths that tie there order by segment count and then by their
/// whole text.
pub fn compare_paths(a: &str, b: &str, delimiter: char) -> Ordering {
    let sa = split_path(a, delimiter);
    let sb = split_path(b, delimiter);

    for (x, y) in sa.iter().rev().zip(sb.iter().rev()).take(MAX_PATH_SEGMENTS) {
        let ord = x.to_lowercase().cmp(&y.to_lowercase());
        if ord != Ordering::Equal {
            return ord;
        }
    }

    if sa.len() > MAX_PATH_SEGMENTS || sb.len() > MAX_PATH_SEGMENTS {
        DEPTH_NOTICE.call_once(|| {
            tracing::info!(
                max_segments = MAX_PATH_SEGMENTS,
                "path deeper than the segment limit; ordering falls back to text"
            );
        });
    }

    sa.len()
        .cmp(&sb.len())
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Sort paths in place, root-first.
pub fn sort_paths<S: AsRef<str>>(paths: &mut [S], delimiter: char) {
    paths.sort_by(|a, b| compare_paths(a.as_ref(), b.as_ref(), delimiter));
}
