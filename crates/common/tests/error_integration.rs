//! Integration tests for the error module
//!
//! Exercises `CommonError` and the classification macro through the public
//! API, the way downstream crates consume them.

#![cfg(feature = "foundation")]

use std::time::Duration;

use meterguard_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use meterguard_common::impl_error_classification;

#[derive(Debug, thiserror::Error)]
enum StoreError {
    #[error("quota exhausted: {used}/{limit}")]
    Exhausted { used: u32, limit: u32 },
    #[error("cooling down")]
    CoolingDown { retry_in: Duration },
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_classification!(StoreError, Common,
    Self::Exhausted { .. } => {
        retryable: false,
        severity: ErrorSeverity::Warning,
        critical: false,
    },
    Self::CoolingDown { retry_in } => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
        retry_after: Some(*retry_in),
    }
);

/// Validates that a module error composing `CommonError` classifies both its
/// own and embedded variants.
///
/// # Test Steps
/// 1. Build an exhaustion error and an embedded backend error
/// 2. Verify exhaustion is not retryable and carries no retry delay
/// 3. Verify the embedded backend error keeps its retryable flag
#[test]
fn test_module_error_composition() {
    let exhausted = StoreError::Exhausted { used: 100, limit: 100 };
    assert!(!exhausted.is_retryable());
    assert_eq!(exhausted.retry_after(), None);
    assert_eq!(exhausted.to_string(), "quota exhausted: 100/100");

    let backend: StoreError = CommonError::backend("quota_store", "timeout", true).into();
    assert!(backend.is_retryable());
    assert_eq!(backend.severity(), ErrorSeverity::Error);
}

/// Validates cooldown errors surface their countdown through the trait.
#[test]
fn test_retry_after_through_trait_object() {
    let err = StoreError::CoolingDown { retry_in: Duration::from_secs(42) };
    let classified: &dyn ErrorClassification = &err;
    assert!(classified.is_retryable());
    assert_eq!(classified.retry_after(), Some(Duration::from_secs(42)));
}
