//! Submission versions and the correction precondition
//!
//! A submission starts at version 1; every accepted correction increments
//! it by one. The version is derived from the correction count and never
//! stored. A correction must declare the version it supersedes. Anything
//! else, including a precondition that is missing or not a number, is a
//! conflict.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Precondition supplied with a correction (e.g. an `If-Match` value)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precondition {
    /// Numeric version the caller expects to supersede
    Version(u32),
    /// Value that is not a version number
    Invalid(String),
    /// No precondition supplied
    Missing,
}

impl Precondition {
    /// Parse a raw precondition value
    ///
    /// Surrounding whitespace and one pair of double quotes (entity-tag
    /// style) are ignored; everything else must be a plain decimal number.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Precondition::Missing;
        };
        let trimmed = raw.trim();
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(trimmed);
        if unquoted.is_empty() {
            return Precondition::Missing;
        }
        if !unquoted.bytes().all(|b| b.is_ascii_digit()) {
            return Precondition::Invalid(raw.to_string());
        }
        match unquoted.parse::<u32>() {
            Ok(version) => Precondition::Version(version),
            Err(_) => Precondition::Invalid(raw.to_string()),
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::Version(v) => write!(f, "{}", v),
            Precondition::Invalid(raw) => write!(f, "\"{}\" (not a version number)", raw),
            Precondition::Missing => write!(f, "no version"),
        }
    }
}

/// Current resolved version of a submission with `corrections` persisted against it
pub fn current_version(corrections: usize) -> u32 {
    u32::try_from(corrections).unwrap_or(u32::MAX - 1).saturating_add(1)
}

/// Check a precondition against the persisted correction count
///
/// Returns the version being superseded, which is also the
/// `submissionVersion` to record on the new correction.
pub fn check_version(declared: &Precondition, existing_corrections: usize) -> Result<u32> {
    let expected = current_version(existing_corrections);
    match declared {
        Precondition::Version(v) if *v == expected => Ok(expected),
        _ => Err(Error::Conflict {
            expected,
            declared: declared.clone(),
        }),
    }
}
