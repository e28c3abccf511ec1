//! Course identifiers as configured by the user and as typed into the search form.

use std::fmt;
use std::str::FromStr;

/// Normalize a raw course identifier: trim, upper-case, and drop all whitespace.
///
/// `" csci 4020u "` becomes `"CSCI4020U"`. Applying it twice yields the same result.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// A normalized course identifier (subject + number, e.g. `CSCI4020U`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseCode(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("course code is empty after normalization: {raw:?}")]
pub struct EmptyCourseCode {
    pub raw: String,
}

impl CourseCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a comma-separated list, skipping blank entries.
    pub fn parse_list(raw: &str) -> Vec<CourseCode> {
        raw.split(',').filter_map(|part| part.parse().ok()).collect()
    }
}

impl FromStr for CourseCode {
    type Err = EmptyCourseCode;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let code = normalize(raw);
        if code.is_empty() {
            return Err(EmptyCourseCode {
                raw: raw.to_owned(),
            });
        }
        Ok(Self(code))
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CourseCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
