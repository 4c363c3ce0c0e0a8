//! One-time auth code model.

use serde::{Deserialize, Serialize};

/// A short-lived one-time token bound to a username.
///
/// Lifecycle: created, consumed at most once, purged after expiry or use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCode {
    /// The token itself, unique key.
    pub code: String,

    /// Username this code authenticates.
    pub username: String,

    /// Unix timestamp of issuance.
    pub created_at: i64,

    /// Set once the code has been redeemed.
    #[serde(default)]
    pub used: bool,
}

impl AuthCode {
    pub fn new(code: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            username: username.into(),
            created_at: chrono::Utc::now().timestamp(),
            used: false,
        }
    }

    /// Whether the expiry window has passed at `now`.
    pub fn is_expired(&self, now: i64, ttl_secs: i64) -> bool {
        now - self.created_at >= ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_expiry_window() {
        let code = AuthCode {
            code: "k3yT0k3n".into(),
            username: "alice".into(),
            created_at: 5_000,
            used: false,
        };
        assert!(!code.is_expired(5_000 + 599, 600));
        assert!(code.is_expired(5_000 + 600, 600));
    }
}
