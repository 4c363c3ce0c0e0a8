//! Configuration module for the Warden service.
//!
//! Loads configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Username with permanent, unremovable operator status.
    /// Stored lowercase, without the leading `@`.
    pub super_operator: String,

    /// Warnings a user may accumulate before the next one escalates to a ban.
    pub max_warns: u32,

    /// Ban duration applied on warn escalation, in hours. 0 means permanent.
    pub default_ban_hours: u32,

    /// Directory holding the managed bot executables.
    pub bots_dir: PathBuf,

    /// Lifetime of a one-time auth code, in seconds.
    pub auth_code_ttl_secs: i64,

    /// Pause between recipients during a mass notification.
    pub broadcast_delay_ms: u64,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if required environment variables are not set or malformed.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let super_operator = env::var("SUPER_OPERATOR").expect("SUPER_OPERATOR must be set");
        let super_operator = crate::utils::extract_username(&super_operator)
            .expect("SUPER_OPERATOR must be a valid username");

        let max_warns = env::var("MAX_WARNS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(3);

        let default_ban_hours = env::var("DEFAULT_BAN_HOURS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);

        let bots_dir = env::var("BOTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("bots"));

        let auth_code_ttl_secs = env::var("AUTH_CODE_TTL_SECS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(600);

        let broadcast_delay_ms = env::var("BROADCAST_DELAY_MS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(100);

        Self {
            super_operator,
            max_warns,
            default_ban_hours,
            bots_dir,
            auth_code_ttl_secs,
            broadcast_delay_ms,
            mongodb_uri: env::var("MONGODB_URI").expect("MONGODB_URI must be set"),
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "warden".to_string()),
        }
    }
}
