//! Debug formatting helpers for [`custom_debug_derive`].

use std::fmt;

/// Hides a secret field's value entirely.
///
/// Use with `#[debug(with = "crate::fmt::redacted")]`.
pub fn redacted<T>(_value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("<redacted>")
}

/// Like [`redacted`], but still shows whether an optional secret is set.
pub fn redacted_opt<T>(value: &Option<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Some(_) => f.write_str("Some(<redacted>)"),
        None => f.write_str("None"),
    }
}
