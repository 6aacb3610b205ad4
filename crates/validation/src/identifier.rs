//! Structured `<prefix>-<suffix>` identifiers
//!
//! Several remote objects are referenced by identifiers such as `ne-123`
//! (network element 123) or `app-a1b2c3`. The prefix names the object kind
//! and comes from a caller-supplied allow-list; the suffix is either purely
//! numeric or alphanumeric depending on the kind.

use crate::combinator::Validator;
use crate::diagnostic::Diagnostics;
use regex::Regex;
use std::sync::LazyLock;

static NUMERIC_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,30}$").unwrap());

static ALPHANUMERIC_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{1,30}$").unwrap());

/// Grammar of the segment after the hyphen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixKind {
    /// 1-30 ASCII digits
    Numeric,
    /// 1-30 ASCII letters or digits
    Alphanumeric,
}

impl SuffixKind {
    fn pattern(self) -> &'static Regex {
        match self {
            Self::Numeric => &NUMERIC_SUFFIX,
            Self::Alphanumeric => &ALPHANUMERIC_SUFFIX,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Numeric => "1-30 digits",
            Self::Alphanumeric => "1-30 letters or digits",
        }
    }
}

/// Value must be `<prefix>-<suffix>` with `prefix` in `prefixes`
pub fn identifier(prefixes: &[&str], suffix: SuffixKind) -> impl Validator<str> + use<> {
    let prefixes: Vec<String> = prefixes.iter().map(|p| (*p).to_string()).collect();
    move |value: &str| {
        let parts: Vec<&str> = value.split('-').collect();
        if parts.len() != 2 {
            return Diagnostics::error(
                "invalid identifier",
                format!("expected {value:?} to have the form <prefix>-<suffix>"),
            );
        }

        let (prefix, rest) = (parts[0], parts[1]);
        if !prefixes.iter().any(|p| p == prefix) {
            return Diagnostics::error(
                "invalid identifier prefix",
                format!(
                    "expected prefix of {value:?} to be one of [{}], got {prefix:?}",
                    prefixes.join(", ")
                ),
            );
        }

        if !suffix.pattern().is_match(rest) {
            return Diagnostics::error(
                "invalid identifier suffix",
                format!(
                    "expected suffix of {value:?} to be {}, got {rest:?}",
                    suffix.describe()
                ),
            );
        }

        Diagnostics::new()
    }
}
