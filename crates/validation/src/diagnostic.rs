//! Diagnostics returned by validators
//!
//! A validator never fails with an `Err`: it returns a [`Diagnostics`] list,
//! and an empty list means the value was accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single user-facing validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Short description of the violated constraint
    pub summary: String,
    /// Full message, quoting the offending value
    pub detail: String,
    /// Attribute path the diagnostic applies to (e.g. `conditions[0].operator`)
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    /// Prefix the attribute path with `parent`
    pub fn at(mut self, parent: &str) -> Self {
        self.attribute = Some(join_path(parent, self.attribute.as_deref()));
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(attr) = &self.attribute {
            write!(f, "{attr}: ")?;
        }
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

impl std::error::Error for Diagnostic {}

fn join_path(parent: &str, child: Option<&str>) -> String {
    match child {
        None | Some("") => parent.to_string(),
        Some(c) if c.starts_with('[') => format!("{parent}{c}"),
        Some(c) => format!("{parent}.{c}"),
    }
}

/// Ordered list of diagnostics; empty means success
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a list holding one error diagnostic
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self(vec![Diagnostic::error(summary, detail)])
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    /// True when nothing was reported
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when at least one error-severity diagnostic was reported
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&Diagnostic> {
        self.0.last()
    }

    /// Prefix every diagnostic's attribute path with `parent`
    pub fn at(self, parent: &str) -> Self {
        Self(self.0.into_iter().map(|d| d.at(parent)).collect())
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_path_nesting() {
        let d = Diagnostic::error("bad", "x").at("operator").at("[0]").at("conditions");
        assert_eq!(d.attribute.as_deref(), Some("conditions[0].operator"));
    }

    #[test]
    fn test_display_includes_attribute() {
        let diags = Diagnostics::error("invalid value", "got \"x\"").at("name");
        assert_eq!(diags.to_string(), "name: invalid value: got \"x\"");
    }

    #[test]
    fn test_warnings_are_not_errors() {
        let diags: Diagnostics = Diagnostic::warning("deprecated", "use y").into();
        assert!(!diags.is_empty());
        assert!(!diags.has_errors());
    }
}
