//! Operation keys
//!
//! An operation key buckets cooldown state by class of action, such as
//! `"generate"` or `"tune:linkedin"`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    OPERATION_ANALYZE, OPERATION_GENERATE, OPERATION_KEY_SEPARATOR, OPERATION_TUNE,
};

/// Identifier for a class of metered operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationKey(String);

impl OperationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `"generate"`
    pub fn generate() -> Self {
        Self::new(OPERATION_GENERATE)
    }

    /// `"tune:<platform>"`
    pub fn tune(platform: &str) -> Self {
        Self::scoped(OPERATION_TUNE, platform)
    }

    /// `"analyze:<platform>"`
    pub fn analyze(platform: &str) -> Self {
        Self::scoped(OPERATION_ANALYZE, platform)
    }

    fn scoped(action: &str, scope: &str) -> Self {
        Self(format!("{action}{OPERATION_KEY_SEPARATOR}{}", scope.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Action part of the key (before the first `:`)
    pub fn action(&self) -> &str {
        self.0.split(OPERATION_KEY_SEPARATOR).next().unwrap_or_default()
    }

    /// Scope part of the key (after the first `:`), if any
    pub fn scope(&self) -> Option<&str> {
        self.0.split_once(OPERATION_KEY_SEPARATOR).map(|(_, scope)| scope)
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for OperationKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}
