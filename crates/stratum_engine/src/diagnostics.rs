//! Structured engine diagnostics.
//!
//! Engine operations report problems as a [`Diagnostics`] collection instead
//! of failing on the first one. Callers that only want a single error use
//! [`Diagnostics::err`]; the full list stays reachable through the error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// What the diagnostic is about: a source position or resource address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
            subject: None,
        }
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary)
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(subject) = &self.subject {
            write!(f, "{subject}: ")?;
        }
        f.write_str(&self.summary)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| !d.is_error())
    }

    /// Reduce to a single error if any error diagnostic is present.
    pub fn err(&self) -> Option<EngineError> {
        self.has_errors().then(|| EngineError::Diagnostics(self.clone()))
    }

    /// `Ok(value)` unless an error diagnostic is present.
    pub fn into_result<T>(self, value: T) -> Result<T, Diagnostics> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(value)
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors: Vec<&Diagnostic> = self.errors().collect();
        let shown: Vec<&Diagnostic> = if errors.is_empty() { self.0.iter().collect() } else { errors };
        match shown.as_slice() {
            [] => f.write_str("no diagnostics"),
            [only] => write!(f, "{only}"),
            many => {
                write!(f, "{} problems:", many.len())?;
                for diagnostic in many {
                    write!(f, "\n- {diagnostic}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Diagnostics {}

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_do_not_error() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning("deprecated"));

        assert!(!diags.has_errors());
        assert!(diags.err().is_none());
        assert!(diags.into_result(()).is_ok());
    }

    #[test]
    fn test_single_error_display() {
        let diags: Diagnostics = Diagnostic::error("Invalid resource type")
            .with_subject("foo_thing.a")
            .with_detail("provider null has no resource foo_thing")
            .into();

        assert_eq!(
            diags.to_string(),
            "foo_thing.a: Invalid resource type: provider null has no resource foo_thing"
        );
    }

    #[test]
    fn test_err_keeps_every_diagnostic() {
        let diags: Diagnostics = [
            Diagnostic::error("first"),
            Diagnostic::warning("aside"),
            Diagnostic::error("second"),
        ]
        .into_iter()
        .collect();

        let Some(EngineError::Diagnostics(inner)) = diags.err() else {
            panic!("expected diagnostics error");
        };
        assert_eq!(inner.len(), 3);
        assert_eq!(inner.to_string(), "2 problems:\n- first\n- second");
    }
}
