//! Error and diagnostic types.
//!
//! Fatal problems (a syntax error, a violated internal contract) become
//! [`Error`] and abort the document. Everything recoverable becomes a
//! [`Diagnostic`], accumulated during analysis and reported alongside
//! best-effort output.

use thiserror::Error;

use crate::parser::ParseError;
use crate::span::Span;

/// Fatal error for one document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),

    /// An internal invariant did not hold; no output is produced for the
    /// document.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// How bad a recoverable diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A recoverable problem found while analyzing a document. Analysis keeps
/// going after reporting one.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self { severity: Severity::Warning, message: message.into(), span }
    }

    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self { severity: Severity::Error, message: message.into(), span }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}
