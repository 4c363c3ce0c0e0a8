//! User record model.

use serde::{Deserialize, Serialize};

use super::rank::Rank;

/// A tracked user of the bot network.
///
/// `username` is the unique key, stored lowercase. `rank` is a cached
/// projection of the membership sets and is only ever written together
/// with a membership change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique username, lowercase, without the leading `@`.
    pub username: String,

    /// Identity on the external chat platform.
    pub user_id: i64,

    /// Display name as last seen.
    pub first_name: String,

    /// Cached display rank.
    #[serde(default)]
    pub rank: Rank,

    /// Whether an active ban record exists for this user.
    #[serde(default)]
    pub banned: bool,

    /// Accumulated warnings.
    #[serde(default)]
    pub warns: u32,

    /// Unix timestamp of first registration.
    pub created_at: i64,

    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl UserRecord {
    /// Create a fresh record with default rank and a clean slate.
    pub fn new(username: impl Into<String>, user_id: i64, first_name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            username: username.into(),
            user_id,
            first_name: first_name.into(),
            rank: Rank::User,
            banned: false,
            warns: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
