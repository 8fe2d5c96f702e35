//! Error classification outcome
//!
//! Every upstream failure is mapped to exactly one [`ErrorClass`]. Only the
//! `Retriable` classes are ever retried; `Unknown` fails closed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::impl_code_conversions;

/// Reason a failure can never succeed on retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalKind {
    /// Credentials are missing or invalid; the caller must re-authenticate
    AuthInvalid,
    /// The request itself is malformed
    BadInput,
}

impl_code_conversions!(FatalKind {
    AuthInvalid => "auth-invalid",
    BadInput => "bad-input",
});

/// Reason a failure is expected to clear with time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetriableKind {
    /// Upstream is transiently unavailable
    Overloaded,
    /// Upstream is throttling or its own quota is exhausted
    RateLimited,
}

impl_code_conversions!(RetriableKind {
    Overloaded => "overloaded",
    RateLimited => "rate-limited",
});

/// Classification of an upstream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "class", content = "kind", rename_all = "snake_case")]
pub enum ErrorClass {
    Fatal(FatalKind),
    Retriable(RetriableKind),
    /// Unrecognised failure, treated as an internal error and never retried
    Unknown,
}

impl ErrorClass {
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Retriable(_))
    }

    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(kind) => write!(f, "fatal({kind})"),
            Self::Retriable(kind) => write!(f, "retriable({kind})"),
            Self::Unknown => f.write_str("unknown(internal-error)"),
        }
    }
}
