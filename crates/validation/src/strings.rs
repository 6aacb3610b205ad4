//! String validators: enumerations, patterns, lengths, JSON

use crate::combinator::Validator;
use crate::diagnostic::Diagnostics;
use regex::Regex;

/// Longest prefix of an offending value echoed back in a diagnostic
const MAX_ECHO_CHARS: usize = 64;

/// Value must equal one of `valid` exactly (case-sensitive)
pub fn string_in_slice(valid: &[&str]) -> impl Validator<str> + use<> {
    let valid: Vec<String> = valid.iter().map(|s| (*s).to_string()).collect();
    move |value: &str| {
        if valid.iter().any(|v| v == value) {
            return Diagnostics::new();
        }
        Diagnostics::error(
            "invalid value",
            format!(
                "expected value to be one of [{}], got {value:?}",
                valid.join(", ")
            ),
        )
    }
}

/// Value must fully match `pattern`
///
/// `message` describes the expected shape in plain words; the pattern is
/// echoed alongside it.
pub fn matches(pattern: Regex, message: &str) -> impl Validator<str> + use<> {
    let message = message.to_string();
    move |value: &str| {
        let full = pattern
            .find(value)
            .is_some_and(|m| m.start() == 0 && m.end() == value.len());
        if full {
            return Diagnostics::new();
        }
        Diagnostics::error(
            "invalid format",
            format!(
                "{message}: {value:?} does not match pattern {:?}",
                pattern.as_str()
            ),
        )
    }
}

/// Value must contain at least one non-whitespace character
pub fn not_empty(value: &str) -> Diagnostics {
    if value.trim().is_empty() {
        return Diagnostics::error("empty value", "expected a non-empty string");
    }
    Diagnostics::new()
}

/// Character count must lie within `[min, max]`
pub fn length_between(min: usize, max: usize) -> impl Validator<str> {
    move |value: &str| {
        let len = value.chars().count();
        if (min..=max).contains(&len) {
            return Diagnostics::new();
        }
        Diagnostics::error(
            "invalid length",
            format!(
                "expected length of {} to be in the range ({min} - {max}), got {len}",
                echo(value)
            ),
        )
    }
}

/// Value must be syntactically valid JSON
pub fn json(value: &str) -> Diagnostics {
    match serde_json::from_str::<serde_json::Value>(value) {
        Ok(_) => Diagnostics::new(),
        Err(e) => Diagnostics::error(
            "invalid JSON",
            format!("{} is not valid JSON: {e}", echo(value)),
        ),
    }
}

/// Quote `value`, truncated so huge inputs do not flood the diagnostic
pub(crate) fn echo(value: &str) -> String {
    if value.chars().count() <= MAX_ECHO_CHARS {
        return format!("{value:?}");
    }
    let head: String = value.chars().take(MAX_ECHO_CHARS).collect();
    format!("{head:?}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_in_slice() {
        let v = string_in_slice(&["test1", "test2", "test3"]);
        assert!(v.accepts("test1"));
        assert!(!v.accepts("test4"));
        assert!(!v.accepts("TEST1"));
    }

    #[test]
    fn test_string_in_slice_lists_candidates() {
        let v = string_in_slice(&["ALLOW", "DENY"]);
        let diags = v.validate("PERMIT");
        let detail = &diags.last().unwrap().detail;
        assert!(detail.contains("[ALLOW, DENY]"));
        assert!(detail.contains("\"PERMIT\""));
    }

    #[test]
    fn test_matches_requires_full_match() {
        let v = matches(Regex::new(r"[a-z]+").unwrap(), "lowercase letters only");
        assert!(v.accepts("abc"));
        assert!(!v.accepts("abc1"));
        assert!(!v.accepts("1abc"));

        let diags = v.validate("ABC");
        assert!(diags.last().unwrap().detail.contains("[a-z]+"));
    }

    #[test]
    fn test_not_empty() {
        assert!(not_empty("x").is_empty());
        assert!(not_empty("   ").has_errors());
    }

    #[test]
    fn test_length_between() {
        let v = length_between(1, 3);
        assert!(v.accepts("abc"));
        assert!(!v.accepts(""));
        assert!(!v.accepts("abcd"));
    }

    #[test]
    fn test_json() {
        assert!(json(r#"{"a": [1, 2]}"#).is_empty());
        assert!(json("{not json").has_errors());
    }

    #[test]
    fn test_json_truncates_echo() {
        let huge = format!("{{{}", "x".repeat(10_000));
        let diags = json(&huge);
        assert!(diags.last().unwrap().detail.len() < 400);
    }
}
