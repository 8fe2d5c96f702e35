//! Exponential backoff arithmetic
//!
//! Computes `initial * 2^(attempt - 1)` for 1-based attempt numbers with
//! saturating arithmetic and an optional upper cap. No jitter is applied: the
//! delay sequence is part of the observable contract (`1s, 2s, 4s, ...`).

use std::time::Duration;

use crate::error::{CommonError, CommonResult};

/// Maximum exponent for exponential backoff calculation to prevent overflow
pub const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Exponential backoff with an optional delay cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Option<Duration>,
}

impl ExponentialBackoff {
    /// Create a backoff schedule
    ///
    /// With `max = None` the schedule doubles without bound (up to
    /// [`MAX_BACKOFF_EXPONENT`] doublings). A cap must not be below `initial`.
    pub fn new(initial: Duration, max: Option<Duration>) -> CommonResult<Self> {
        if initial.is_zero() {
            return Err(CommonError::config_field(
                "initial_backoff",
                "must be greater than zero",
            ));
        }
        if let Some(max) = max {
            if initial > max {
                return Err(CommonError::config_field(
                    "initial_backoff",
                    format!("{initial:?} cannot be greater than max_backoff ({max:?})"),
                ));
            }
        }
        Ok(Self { initial, max })
    }

    /// Delay to wait after the given 1-based attempt failed
    ///
    /// Attempt `0` is treated as attempt `1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Cap exponent to prevent overflow
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let delay = self.initial.saturating_mul(2_u32.saturating_pow(exponent));

        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    /// Initial delay
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Delay cap, if any
    pub fn max(&self) -> Option<Duration> {
        self.max
    }
}
