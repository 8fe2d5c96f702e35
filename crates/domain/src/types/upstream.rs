//! Upstream error model
//!
//! The generation backend reports failures as a string code plus an optional
//! HTTP status. [`UpstreamCode`] accepts every spelling the backend uses and
//! falls back to [`UpstreamCode::Unknown`] instead of failing.
//!
//! `Display` on [`UpstreamError`] never includes the message: upstream
//! messages can echo prompts or credentials.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::impl_code_conversions;

/// Status code reported by the upstream backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UpstreamCode {
    Unauthenticated,
    PermissionDenied,
    InvalidArgument,
    FailedPrecondition,
    OutOfRange,
    NotFound,
    ResourceExhausted,
    Unavailable,
    DeadlineExceeded,
    Aborted,
    Internal,
    Cancelled,
    Unknown,
}

impl_code_conversions!(UpstreamCode {
    Unauthenticated => "unauthenticated",
    PermissionDenied => "permission-denied",
    InvalidArgument => "invalid-argument",
    FailedPrecondition => "failed-precondition",
    OutOfRange => "out-of-range",
    NotFound => "not-found",
    ResourceExhausted => "resource-exhausted",
    Unavailable => "unavailable",
    DeadlineExceeded => "deadline-exceeded",
    Aborted => "aborted",
    Internal => "internal",
    Cancelled => "cancelled",
    Unknown => "unknown",
});

impl UpstreamCode {
    /// Parse a backend code, mapping anything unrecognised to `Unknown`
    ///
    /// A namespace prefix such as `functions/` is ignored.
    pub fn parse_lenient(raw: &str) -> Self {
        let code = raw.rsplit('/').next().unwrap_or(raw);
        code.parse().unwrap_or(Self::Unknown)
    }
}

impl From<String> for UpstreamCode {
    fn from(raw: String) -> Self {
        Self::parse_lenient(&raw)
    }
}

impl From<UpstreamCode> for String {
    fn from(code: UpstreamCode) -> Self {
        code.to_string()
    }
}

/// Error returned by the metered upstream operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamError {
    pub code: UpstreamCode,
    /// Raw backend message; may contain sensitive content, never logged
    pub message: String,
    pub http_status: Option<u16>,
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upstream error: {}", self.code)?;
        if let Some(status) = self.http_status {
            write!(f, " (HTTP {status})")?;
        }
        Ok(())
    }
}

impl std::error::Error for UpstreamError {}

impl UpstreamError {
    pub fn new(code: UpstreamCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), http_status: None }
    }

    /// Error known only by its HTTP status
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self { code: UpstreamCode::Unknown, message: message.into(), http_status: Some(status) }
    }

    /// Error from a raw backend code string
    pub fn from_code(raw: &str, message: impl Into<String>) -> Self {
        Self::new(UpstreamCode::parse_lenient(raw), message)
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(UpstreamCode::Unauthenticated, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(UpstreamCode::InvalidArgument, message)
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::new(UpstreamCode::ResourceExhausted, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(UpstreamCode::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(UpstreamCode::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Validates lenient parsing of backend code spellings.
    ///
    /// Assertions:
    /// - Confirms hyphen, underscore and upper-case forms parse alike.
    /// - Confirms a `functions/` namespace prefix is ignored.
    /// - Confirms unrecognised codes become `Unknown`.
    #[test]
    fn test_parse_lenient() {
        assert_eq!(
            UpstreamCode::parse_lenient("resource-exhausted"),
            UpstreamCode::ResourceExhausted
        );
        assert_eq!(
            UpstreamCode::parse_lenient("RESOURCE_EXHAUSTED"),
            UpstreamCode::ResourceExhausted
        );
        assert_eq!(UpstreamCode::parse_lenient("functions/unavailable"), UpstreamCode::Unavailable);
        assert_eq!(UpstreamCode::parse_lenient("teapot"), UpstreamCode::Unknown);
    }

    /// Validates that Display omits the upstream message.
    ///
    /// Assertions:
    /// - Ensures the secret-bearing message is absent from `to_string()`.
    /// - Confirms the HTTP status is rendered when present.
    #[test]
    fn test_display_hides_message() {
        let err = UpstreamError::unauthenticated("token sk-secret expired");
        assert_eq!(err.to_string(), "upstream error: unauthenticated");
        assert!(!err.to_string().contains("sk-secret"));

        let http = UpstreamError::http(503, "down");
        assert_eq!(http.to_string(), "upstream error: unknown (HTTP 503)");
    }

    #[test]
    fn test_code_deserializes_any_spelling() {
        let err: UpstreamError = serde_json::from_str(
            r#"{"code":"INVALID_ARGUMENT","message":"bad","http_status":400}"#,
        )
        .unwrap();
        assert_eq!(err.code, UpstreamCode::InvalidArgument);
        assert_eq!(serde_json::to_value(err.code).unwrap(), "invalid-argument");
    }
}
