//! Lenient deserializers for environment-sourced values.
//!
//! The environment provider guesses types, so a numeric username arrives as an
//! integer and `+15551234567` may arrive as a number without its `+`.

use crate::banner::CourseCode;
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer, de};
use std::time::Duration;

const DURATION_UNITS: [TimeUnit; 5] = [
    TimeUnit::MilliSecond,
    TimeUnit::Second,
    TimeUnit::Minute,
    TimeUnit::Hour,
    TimeUnit::Day,
];

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Unsigned(n) => n.to_string(),
            Scalar::Signed(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Scalar::deserialize(deserializer)?.into_string())
}

/// Blank values count as unset.
pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(Scalar::into_string)
        .and_then(non_empty))
}

/// A phone number in E.164 form; a bare number gets its `+` back.
pub fn opt_phone<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Unsigned(n)) => Some(format!("+{n}")),
        Some(Scalar::Signed(n)) if n > 0 => Some(format!("+{n}")),
        other => other.map(Scalar::into_string).and_then(non_empty),
    })
}

/// A comma-separated string, or a list of strings from a config file.
pub fn course_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<CourseCode>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(Scalar),
        Many(Vec<String>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::One(s) => CourseCode::parse_list(&s.into_string()),
        Raw::Many(list) => list.iter().filter_map(|s| s.parse().ok()).collect(),
    })
}

/// A duration string like `5m` or `90s`; a bare number is seconds.
pub fn duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    parse_duration(Scalar::deserialize(deserializer)?)
}

pub fn opt_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    Option::<Scalar>::deserialize(deserializer)?
        .map(parse_duration)
        .transpose()
}

fn parse_duration<E: de::Error>(value: Scalar) -> Result<Duration, E> {
    match value {
        Scalar::Unsigned(secs) => Ok(Duration::from_secs(secs)),
        Scalar::Str(s) => {
            let parsed = DurationParser::with_time_units(&DURATION_UNITS)
                .parse(s.trim())
                .map_err(|e| E::custom(format!("invalid duration {s:?}: {e}")))?;
            Duration::try_from(parsed).map_err(|e| E::custom(format!("invalid duration {s:?}: {e}")))
        }
        other => Err(E::custom(format!(
            "invalid duration {:?}",
            other.into_string()
        ))),
    }
}
