//! Macro for implementing Display and FromStr for wire-code enums
//!
//! Upstream backends spell the same code several ways
//! (`"invalid-argument"`, `"INVALID_ARGUMENT"`, `"Invalid_Argument"`). The
//! generated `FromStr` lowercases the input and treats `-` and `_` as the
//! same separator, so every spelling maps to one variant. `Display` always
//! produces the canonical kebab-case form.
//!
//! # Example
//!
//! ```rust
//! use meterguard_domain::impl_code_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Signal {
//!     TryLater,
//!     GiveUp,
//! }
//!
//! impl_code_conversions!(Signal {
//!     TryLater => "try-later",
//!     GiveUp => "give-up",
//! });
//!
//! assert_eq!("TRY_LATER".parse::<Signal>(), Ok(Signal::TryLater));
//! assert_eq!(Signal::GiveUp.to_string(), "give-up");
//! ```

/// Implements Display and FromStr traits for code enums
///
/// This macro generates:
/// - Display trait: writes the canonical kebab-case string
/// - FromStr trait: parses case-insensitive strings, `_` and `-` equivalent
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their canonical
///   kebab-case representations
#[macro_export]
macro_rules! impl_code_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_lowercase().replace('_', "-");
                match normalized.as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
