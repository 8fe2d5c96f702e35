//! Upstream error classification

pub mod classifier;

pub use classifier::{classify, DefaultClassifier, ErrorClassifier};
