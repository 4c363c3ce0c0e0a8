//! Ban record model.

use serde::{Deserialize, Serialize};

/// Seconds per hour, for expiry math on `duration_hours`.
const HOUR_SECS: i64 = 3600;

/// An active ban. Deleted on unban or on lazy expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanRecord {
    /// Banned username, unique key.
    pub username: String,

    /// Username of the issuer.
    pub banned_by: String,

    /// Unix timestamp when the ban was applied.
    pub banned_at: i64,

    /// Ban length in hours. 0 is the sentinel for a permanent ban.
    pub duration_hours: u32,

    /// Free-form reason, may be empty.
    #[serde(default)]
    pub reason: String,
}

impl BanRecord {
    pub fn new(
        username: impl Into<String>,
        banned_by: impl Into<String>,
        duration_hours: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            banned_by: banned_by.into(),
            banned_at: chrono::Utc::now().timestamp(),
            duration_hours,
            reason: reason.into(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.duration_hours == 0
    }

    /// Whether the ban has run out at `now`. Expiry hits exactly at the
    /// threshold: elapsed >= duration. Permanent bans never expire.
    pub fn is_expired(&self, now: i64) -> bool {
        if self.is_permanent() {
            return false;
        }
        now - self.banned_at >= self.duration_hours as i64 * HOUR_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_hour_ban(banned_at: i64) -> BanRecord {
        BanRecord {
            username: "alice".into(),
            banned_by: "bob".into(),
            banned_at,
            duration_hours: 2,
            reason: String::new(),
        }
    }

    #[test]
    fn test_temporary_ban_active_before_threshold() {
        let ban = two_hour_ban(1_000_000);
        assert!(!ban.is_expired(1_000_000 + 3600)); // +1h
        assert!(!ban.is_expired(1_000_000 + 7199)); // one second short
    }

    #[test]
    fn test_temporary_ban_expires_at_threshold() {
        let ban = two_hour_ban(1_000_000);
        assert!(ban.is_expired(1_000_000 + 7200)); // exactly +2h
        assert!(ban.is_expired(1_000_000 + 86_400)); // long after
    }

    #[test]
    fn test_permanent_ban_never_expires() {
        let mut ban = two_hour_ban(1_000_000);
        ban.duration_hours = 0;
        assert!(ban.is_permanent());
        assert!(!ban.is_expired(i64::MAX));
    }
}
