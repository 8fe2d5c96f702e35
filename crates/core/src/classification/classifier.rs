//! Upstream error classifier
//!
//! Maps an [`UpstreamError`] to one [`ErrorClass`]. The mapping is total and
//! deterministic: the backend code decides first, then the HTTP status, then
//! well-known phrases in the message. Anything left over is
//! [`ErrorClass::Unknown`] and is never retried.
//!
//! The message is only matched against, never logged or copied.

use meterguard_domain::{ErrorClass, FatalKind, RetriableKind, UpstreamCode, UpstreamError};

/// Phrases that mark a throttling response
const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "rate-limit", "too many requests", "quota"];

/// Phrases that mark a transient outage
const OVERLOAD_MARKERS: &[&str] =
    &["overloaded", "temporarily unavailable", "temporarily", "try again"];

/// Strategy for classifying upstream failures
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &UpstreamError) -> ErrorClass;
}

/// Standard classification rules
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, error: &UpstreamError) -> ErrorClass {
        classify(error)
    }
}

/// Classify an upstream error with the standard rules
pub fn classify(error: &UpstreamError) -> ErrorClass {
    match error.code {
        UpstreamCode::Unauthenticated | UpstreamCode::PermissionDenied => {
            ErrorClass::Fatal(FatalKind::AuthInvalid)
        }
        UpstreamCode::InvalidArgument
        | UpstreamCode::FailedPrecondition
        | UpstreamCode::OutOfRange => ErrorClass::Fatal(FatalKind::BadInput),
        UpstreamCode::ResourceExhausted => ErrorClass::Retriable(RetriableKind::RateLimited),
        UpstreamCode::Unavailable | UpstreamCode::DeadlineExceeded | UpstreamCode::Aborted => {
            ErrorClass::Retriable(RetriableKind::Overloaded)
        }
        // Internal is only retried when the backend says it is transient
        UpstreamCode::Internal => {
            if contains_any(&error.message, OVERLOAD_MARKERS) {
                ErrorClass::Retriable(RetriableKind::Overloaded)
            } else {
                ErrorClass::Unknown
            }
        }
        UpstreamCode::NotFound | UpstreamCode::Cancelled => ErrorClass::Unknown,
        UpstreamCode::Unknown => classify_by_status(error.http_status)
            .unwrap_or_else(|| classify_by_message(&error.message)),
    }
}

fn classify_by_status(status: Option<u16>) -> Option<ErrorClass> {
    match status? {
        401 | 403 => Some(ErrorClass::Fatal(FatalKind::AuthInvalid)),
        400 | 422 => Some(ErrorClass::Fatal(FatalKind::BadInput)),
        429 => Some(ErrorClass::Retriable(RetriableKind::RateLimited)),
        502 | 503 | 504 | 529 => Some(ErrorClass::Retriable(RetriableKind::Overloaded)),
        _ => None,
    }
}

fn classify_by_message(message: &str) -> ErrorClass {
    if contains_any(message, RATE_LIMIT_MARKERS) {
        ErrorClass::Retriable(RetriableKind::RateLimited)
    } else if contains_any(message, OVERLOAD_MARKERS) {
        ErrorClass::Retriable(RetriableKind::Overloaded)
    } else {
        ErrorClass::Unknown
    }
}

fn contains_any(message: &str, markers: &[&str]) -> bool {
    let lowered = message.to_lowercase();
    markers.iter().any(|marker| lowered.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTH: ErrorClass = ErrorClass::Fatal(FatalKind::AuthInvalid);
    const BAD_INPUT: ErrorClass = ErrorClass::Fatal(FatalKind::BadInput);
    const OVERLOADED: ErrorClass = ErrorClass::Retriable(RetriableKind::Overloaded);
    const RATE_LIMITED: ErrorClass = ErrorClass::Retriable(RetriableKind::RateLimited);

    /// Validates the code-driven mapping.
    ///
    /// Assertions:
    /// - Confirms auth, input, throttling and outage codes land in their
    ///   class regardless of message content.
    #[test]
    fn test_classify_by_code() {
        let cases = [
            (UpstreamCode::Unauthenticated, AUTH),
            (UpstreamCode::PermissionDenied, AUTH),
            (UpstreamCode::InvalidArgument, BAD_INPUT),
            (UpstreamCode::FailedPrecondition, BAD_INPUT),
            (UpstreamCode::OutOfRange, BAD_INPUT),
            (UpstreamCode::ResourceExhausted, RATE_LIMITED),
            (UpstreamCode::Unavailable, OVERLOADED),
            (UpstreamCode::DeadlineExceeded, OVERLOADED),
            (UpstreamCode::Aborted, OVERLOADED),
            (UpstreamCode::NotFound, ErrorClass::Unknown),
            (UpstreamCode::Cancelled, ErrorClass::Unknown),
        ];

        for (code, expected) in cases {
            let err = UpstreamError::new(code, "too many requests, try again");
            assert_eq!(classify(&err), expected, "code {code}");
        }
    }

    /// Validates internal errors fail closed unless marked transient.
    ///
    /// Assertions:
    /// - Confirms a plain internal error is `Unknown`.
    /// - Confirms an "overloaded" internal error is retriable.
    #[test]
    fn test_internal_requires_transient_marker() {
        assert_eq!(classify(&UpstreamError::internal("null pointer")), ErrorClass::Unknown);
        assert_eq!(classify(&UpstreamError::internal("Model is Overloaded")), OVERLOADED);
        assert_eq!(classify(&UpstreamError::internal("please try again later")), OVERLOADED);
    }

    /// Validates the HTTP status fallback for uncoded errors.
    #[test]
    fn test_classify_by_status() {
        assert_eq!(classify(&UpstreamError::http(401, "")), AUTH);
        assert_eq!(classify(&UpstreamError::http(422, "")), BAD_INPUT);
        assert_eq!(classify(&UpstreamError::http(429, "")), RATE_LIMITED);
        assert_eq!(classify(&UpstreamError::http(529, "")), OVERLOADED);
        assert_eq!(classify(&UpstreamError::http(500, "boom")), ErrorClass::Unknown);
    }

    /// Validates message markers when neither code nor status decide.
    ///
    /// Assertions:
    /// - Confirms throttling phrases win over outage phrases.
    /// - Confirms an unrecognised message is `Unknown`.
    #[test]
    fn test_classify_by_message() {
        let throttled = UpstreamError::from_code("weird", "Rate limit hit, try again");
        assert_eq!(classify(&throttled), RATE_LIMITED);

        let outage = UpstreamError::from_code("weird", "service temporarily unavailable");
        assert_eq!(classify(&outage), OVERLOADED);

        assert_eq!(classify(&UpstreamError::from_code("weird", "???")), ErrorClass::Unknown);
    }

    #[test]
    fn test_code_takes_precedence_over_status() {
        let err = UpstreamError::unauthenticated("expired").with_status(503);
        assert_eq!(DefaultClassifier.classify(&err), AUTH);
    }
}
