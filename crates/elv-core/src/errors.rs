//! Error type shared by the fabric token crates.
//!
//! Errors carry a [`ErrorKind`] that callers match on, the operation that failed, a
//! human readable reason and an ordered list of contextual fields (`sig_type`, `format`,
//! `token_string`, ...) so that callers can log them structurally.

use std::fmt;

use thiserror::Error;

/// Boxed underlying cause of an [`Error`].
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the fabric token crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input or a violated structural/field rule.
    Invalid,
    /// Signature or verification failure.
    Permission,
    /// The requested item is not available.
    NotExist,
    /// Anything else (I/O, encoder failures).
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Invalid => "invalid",
            ErrorKind::Permission => "permission denied",
            ErrorKind::NotExist => "item does not exist",
            ErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Error raised by identifier, signature and token operations.
#[derive(Debug, Error)]
#[error("op [{op}] kind [{kind}] reason [{reason}]{}", fmt_fields(.fields))]
pub struct Error {
    kind: ErrorKind,
    op: &'static str,
    reason: String,
    fields: Vec<(&'static str, String)>,
    #[source]
    source: Option<Cause>,
}

fn fmt_fields(fields: &[(&'static str, String)]) -> String {
    let mut out = String::new();
    for (name, value) in fields {
        out.push(' ');
        out.push_str(name);
        out.push_str(" [");
        out.push_str(value);
        out.push(']');
    }
    out
}

impl Error {
    /// Create a new error of the given kind.
    pub fn new(kind: ErrorKind, op: &'static str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            op,
            reason: reason.into(),
            fields: Vec::new(),
            source: None,
        }
    }

    /// Malformed input or a violated validation rule.
    pub fn invalid(op: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, op, reason)
    }

    /// Signature or verification failure.
    pub fn permission(op: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, op, reason)
    }

    /// Requested item is not available.
    pub fn not_exist(op: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotExist, op, reason)
    }

    /// Any other failure.
    pub fn other(op: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other, op, reason)
    }

    /// Attach a contextual field.
    pub fn with(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((name, value.to_string()));
        self
    }

    /// Attach the underlying cause.
    pub fn cause(mut self, source: impl Into<Cause>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Operation that failed.
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// Reason of the failure.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Value of a contextual field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All contextual fields in insertion order.
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }
}
