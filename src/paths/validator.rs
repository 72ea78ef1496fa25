//! Validation of untrusted path, name, query and username strings.
//!
//! Every rule is an ordinary function over `&str`; the first failing rule
//! produces a [`ValidationError`] naming the parameter and the rule.

use crate::paths::grammar::{self, DELIMITER};
use thiserror::Error;

/// Maximum size of a full path in bytes.
pub const MAX_PATH_BYTES: usize = 3000;
/// Maximum length of a single resource name in characters.
pub const MAX_NAME_CHARS: usize = 200;
/// Maximum size of a single resource name in bytes.
pub const MAX_NAME_BYTES: usize = 255;
pub const USERNAME_MIN_LEN: usize = 5;
pub const USERNAME_MAX_LEN: usize = 20;

const FORBIDDEN_CHARS: [char; 8] = ['\\', ':', '*', '?', '"', '<', '>', '|'];

/// Rejected input, e.g. `path length must be between 1 and 3000 bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{parameter} {reason}")]
pub struct ValidationError {
    pub parameter: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(parameter: &str, reason: impl Into<String>) -> Self {
        Self {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ValidationResult = Result<(), ValidationError>;

/// What shape of string a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// A file or directory path, including the root.
    Any,
    /// A file path: no trailing delimiter.
    File,
    /// A directory path: trailing delimiter, or the root.
    Directory,
    /// A single resource name without any delimiter.
    Name,
    /// A search query matched against resource names.
    Query,
}

impl PathKind {
    fn is_single_segment(self) -> bool {
        matches!(self, PathKind::Name | PathKind::Query)
    }
}

/// Validate `value` for `parameter` according to `kind`.
pub fn validate(parameter: &str, value: &str, kind: PathKind) -> ValidationResult {
    ensure_not_blank(parameter, value)?;
    ensure_size(parameter, value, kind)?;
    ensure_no_leading_delimiter(parameter, value, kind)?;
    ensure_trailing_delimiter(parameter, value, kind)?;
    ensure_no_whitespace_runs(parameter, value)?;
    ensure_allowed_characters(parameter, value, kind)?;
    Ok(())
}

pub fn validate_path(parameter: &str, value: &str) -> ValidationResult {
    validate(parameter, value, PathKind::Any)
}

pub fn validate_file_path(parameter: &str, value: &str) -> ValidationResult {
    validate(parameter, value, PathKind::File)
}

pub fn validate_directory_path(parameter: &str, value: &str) -> ValidationResult {
    validate(parameter, value, PathKind::Directory)
}

pub fn validate_query(parameter: &str, value: &str) -> ValidationResult {
    validate(parameter, value, PathKind::Query)
}

/// Validate an account username.
///
/// Usernames are 5–20 ASCII letters, digits or underscores and may not start
/// or end with an underscore.
pub fn validate_username(value: &str) -> ValidationResult {
    const PARAMETER: &str = "username";

    ensure_not_blank(PARAMETER, value)?;

    let len = value.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(ValidationError::new(
            PARAMETER,
            format!(
                "length must be between {} and {} characters",
                USERNAME_MIN_LEN, USERNAME_MAX_LEN
            ),
        ));
    }

    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::new(
            PARAMETER,
            "may only contain letters, digits and underscores",
        ));
    }

    if value.starts_with('_') || value.ends_with('_') {
        return Err(ValidationError::new(
            PARAMETER,
            "must not start or end with an underscore",
        ));
    }

    Ok(())
}

fn ensure_not_blank(parameter: &str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(parameter, "must not be blank"));
    }
    Ok(())
}

fn ensure_size(parameter: &str, value: &str, kind: PathKind) -> ValidationResult {
    if value.len() > MAX_PATH_BYTES {
        return Err(ValidationError::new(
            parameter,
            format!("length must be between 1 and {} bytes", MAX_PATH_BYTES),
        ));
    }

    if grammar::is_root(value) && !kind.is_single_segment() {
        return Ok(());
    }

    let name = if kind.is_single_segment() {
        value
    } else {
        grammar::extract_name(value)
    };
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::new(
            parameter,
            format!(
                "name length must be between 1 and {} characters",
                MAX_NAME_CHARS
            ),
        ));
    }
    if name.len() > MAX_NAME_BYTES {
        return Err(ValidationError::new(
            parameter,
            format!("name size must not exceed {} bytes", MAX_NAME_BYTES),
        ));
    }
    Ok(())
}

fn ensure_no_leading_delimiter(parameter: &str, value: &str, kind: PathKind) -> ValidationResult {
    if kind.is_single_segment() || grammar::is_root(value) {
        return Ok(());
    }
    if value.starts_with(DELIMITER) {
        return Err(ValidationError::new(
            parameter,
            "must not start with '/' unless it is the root directory",
        ));
    }
    Ok(())
}

fn ensure_trailing_delimiter(parameter: &str, value: &str, kind: PathKind) -> ValidationResult {
    match kind {
        PathKind::Directory if !grammar::is_directory(value) => Err(ValidationError::new(
            parameter,
            "must end with '/' to denote a directory",
        )),
        PathKind::File if grammar::is_directory(value) => Err(ValidationError::new(
            parameter,
            "must not end with '/' to denote a file",
        )),
        _ => Ok(()),
    }
}

fn ensure_no_whitespace_runs(parameter: &str, value: &str) -> ValidationResult {
    let starts = value.chars().next().is_some_and(char::is_whitespace);
    let ends = value.chars().next_back().is_some_and(char::is_whitespace);
    if starts || ends {
        return Err(ValidationError::new(
            parameter,
            "must not start or end with whitespace",
        ));
    }

    let mut previous: Option<char> = None;
    for c in value.chars() {
        if let Some(prev) = previous.filter(|p| p.is_whitespace()) {
            if c.is_whitespace() {
                return Err(ValidationError::new(
                    parameter,
                    "must not contain consecutive whitespace",
                ));
            }
            if c == DELIMITER {
                return Err(ValidationError::new(
                    parameter,
                    format!("must not contain whitespace {:?} before '/'", prev),
                ));
            }
        }
        previous = Some(c);
    }
    Ok(())
}

fn ensure_allowed_characters(parameter: &str, value: &str, kind: PathKind) -> ValidationResult {
    if let Some(c) = value
        .chars()
        .find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control())
    {
        return Err(ValidationError::new(
            parameter,
            format!("must not contain the character {:?}", c),
        ));
    }

    if kind.is_single_segment() {
        if value.contains(DELIMITER) {
            return Err(ValidationError::new(parameter, "must not contain '/'"));
        }
        return Ok(());
    }

    if grammar::is_root(value) {
        return Ok(());
    }

    for segment in grammar::trim_trailing_delimiter(value).split(DELIMITER) {
        if segment.is_empty() {
            return Err(ValidationError::new(
                parameter,
                "must not contain empty segments ('//')",
            ));
        }
        if segment == "." || segment == ".." {
            return Err(ValidationError::new(
                parameter,
                "must not contain '.' or '..' segments",
            ));
        }
    }
    Ok(())
}
