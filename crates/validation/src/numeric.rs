//! Integer validators

use crate::combinator::Validator;
use crate::diagnostic::Diagnostics;

/// Value must lie within the inclusive range `[min, max]`
///
/// A value above the range is reported against `max`.
pub fn int_between(min: i64, max: i64) -> impl Validator<i64> {
    move |value: &i64| {
        let value = *value;
        if value < min {
            return Diagnostics::error(
                "value out of range",
                format!("expected value to be at least {min}, got {value}"),
            );
        }
        if value > max {
            return Diagnostics::error(
                "value out of range",
                format!("expected value to be at most {max}, got {value}"),
            );
        }
        Diagnostics::new()
    }
}

/// Value must be a TCP/UDP port number
pub fn port(value: &i64) -> Diagnostics {
    int_between(1, 65_535).validate(value)
}
