//! Quota account types
//!
//! A [`QuotaAccount`] is the client's advisory view of one user's monthly
//! usage. The store is authoritative; this struct is what it hands back.

use std::fmt;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// Opaque user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-user usage within one billing cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaAccount {
    pub user_id: UserId,
    /// Units debited in the current cycle
    pub used: u32,
    /// Ceiling for the cycle
    pub limit: u32,
    /// When `used` was last reset to zero
    pub cycle_start: DateTime<Utc>,
}

impl QuotaAccount {
    /// Fresh account with nothing used
    pub fn new(user_id: UserId, limit: u32, cycle_start: DateTime<Utc>) -> Self {
        Self { user_id, used: 0, limit, cycle_start }
    }

    /// Units still available in this cycle
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Whether debiting `cost` would push `used` past `limit`
    pub fn would_exceed(&self, cost: u32) -> bool {
        self.used.checked_add(cost).map_or(true, |total| total > self.limit)
    }

    /// Start of the cycle following the current one
    pub fn next_cycle_start(&self) -> DateTime<Utc> {
        self.cycle_start
            .checked_add_months(Months::new(1))
            .unwrap_or_else(|| self.cycle_start + chrono::Duration::days(31))
    }

    /// Reset usage if `now` has reached the next cycle
    ///
    /// Advances `cycle_start` by whole months so the cycle anchor is kept.
    /// Returns `true` when a rollover happened.
    pub fn roll_over(&mut self, now: DateTime<Utc>) -> bool {
        let mut rolled = false;
        while now >= self.next_cycle_start() {
            self.cycle_start = self.next_cycle_start();
            rolled = true;
        }
        if rolled {
            self.used = 0;
        }
        rolled
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn account(used: u32, limit: u32) -> QuotaAccount {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
        QuotaAccount { user_id: UserId::new("user-1"), used, limit, cycle_start: start }
    }

    /// Validates remaining and exhaustion at the ceiling.
    ///
    /// Assertions:
    /// - Confirms `remaining()` saturates at zero when over the limit.
    /// - Confirms `would_exceed` is strict about the post-increment value.
    #[test]
    fn test_remaining_and_would_exceed() {
        let acc = account(99, 100);
        assert_eq!(acc.remaining(), 1);
        assert!(!acc.is_exhausted());
        assert!(!acc.would_exceed(1));
        assert!(acc.would_exceed(2));

        let full = account(100, 100);
        assert!(full.is_exhausted());
        assert!(full.would_exceed(1));
        assert!(!full.would_exceed(0));

        assert_eq!(account(120, 100).remaining(), 0);
        assert!(account(1, 100).would_exceed(u32::MAX));
    }

    /// Validates monthly rollover keeps the day-of-month anchor.
    ///
    /// Assertions:
    /// - Confirms no rollover before the next cycle.
    /// - Confirms a rollover two months later resets `used` and lands on
    ///   the 15th of the current month.
    #[test]
    fn test_roll_over() {
        let mut acc = account(40, 100);
        let before = Utc.with_ymd_and_hms(2026, 2, 14, 23, 59, 59).unwrap();
        assert!(!acc.roll_over(before));
        assert_eq!(acc.used, 40);

        let later = Utc.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap();
        assert!(acc.roll_over(later));
        assert_eq!(acc.used, 0);
        assert_eq!(acc.cycle_start, Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_user_id_serializes_transparently() {
        let json = serde_json::to_string(&UserId::from("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
