//! Path grammar for user-relative resource paths.
//!
//! Paths use `/` as the delimiter. A trailing delimiter marks a directory and
//! the bare delimiter is the root. Nothing here performs I/O; callers are
//! expected to have run the input through [`crate::paths::validator`] first.

/// Segment delimiter shared by resource paths and object keys.
pub const DELIMITER: char = '/';

/// The root directory of a user's namespace.
pub const ROOT: &str = "/";

/// Regex metacharacters escaped by [`escape_for_pattern`].
const PATTERN_METACHARACTERS: &[char] = &[
    '^', '$', '(', ')', '[', ']', '{', '}', '\\', '/', '*', '+', '?', '|', '.',
];

pub fn is_directory(path: &str) -> bool {
    path.ends_with(DELIMITER)
}

pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Final segment of `path` without its trailing delimiter.
///
/// `a/b/c/` yields `c`, `a/b/file.txt` yields `file.txt`. The root is
/// returned unchanged, so callers that need a real name must handle it first.
pub fn extract_name(path: &str) -> &str {
    if is_root(path) {
        return path;
    }
    let trimmed = trim_trailing_delimiter(path);
    match trimmed.rfind(DELIMITER) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Parent directory of `path`, always in directory form.
///
/// Paths without a parent segment resolve to [`ROOT`].
pub fn remove_name(path: &str) -> &str {
    if is_root(path) {
        return ROOT;
    }
    let trimmed = trim_trailing_delimiter(path);
    match trimmed.rfind(DELIMITER) {
        Some(idx) => &trimmed[..=idx],
        None => ROOT,
    }
}

/// Strip exactly one trailing delimiter, if present.
pub fn trim_trailing_delimiter(path: &str) -> &str {
    path.strip_suffix(DELIMITER).unwrap_or(path)
}

/// Text after the last `.` of the final segment, or `""`.
pub fn extract_extension(path: &str) -> &str {
    let name = extract_name(path);
    match name.rfind('.') {
        Some(idx) => &name[idx + 1..],
        None => "",
    }
}

/// Escape `s` so it can be embedded literally inside a regular expression.
pub fn escape_for_pattern(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if PATTERN_METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Join a directory-form `parent` and a relative `child`.
///
/// Joining onto the root yields `child` unchanged, since user-relative paths
/// never carry a leading delimiter.
pub fn join(parent: &str, child: &str) -> String {
    if is_root(parent) {
        child.to_string()
    } else {
        format!("{}{}", parent, child)
    }
}
