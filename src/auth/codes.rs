//! One-time auth code issuance and redemption.

use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info};

use crate::database::{AuthCode, AuthCodeRepo, UserRepo};
use crate::error::{WardenError, WardenResult};

/// Length of a generated code.
const CODE_LEN: usize = 8;

/// Attempts to find a free code before giving up.
const ISSUE_ATTEMPTS: usize = 4;

pub struct AuthCodes {
    repo: Arc<AuthCodeRepo>,
    users: Arc<UserRepo>,
    ttl_secs: i64,
}

impl AuthCodes {
    pub fn new(repo: Arc<AuthCodeRepo>, users: Arc<UserRepo>, ttl_secs: i64) -> Self {
        Self {
            repo,
            users,
            ttl_secs,
        }
    }

    /// Issue a fresh code for an existing user.
    pub async fn issue(&self, username: &str) -> WardenResult<String> {
        if !self.users.exists(username).await {
            return Err(WardenError::NotFound(format!("user @{username}")));
        }

        for _ in 0..ISSUE_ATTEMPTS {
            let code: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(CODE_LEN)
                .map(char::from)
                .collect();

            if self.repo.insert(AuthCode::new(&code, username)).await? {
                debug!("issued auth code for @{}", username);
                return Ok(code);
            }
        }

        Err(WardenError::External(
            "could not allocate a unique auth code".into(),
        ))
    }

    /// Redeem a code, returning the username it was issued for.
    ///
    /// A code redeems at most once; expired codes are deleted on contact.
    pub async fn redeem(&self, code: &str) -> WardenResult<String> {
        let record = self
            .repo
            .get(code)
            .await
            .ok_or_else(|| WardenError::NotFound("auth code".into()))?;

        if record.used {
            return Err(WardenError::InvalidInput("auth code already used".into()));
        }

        if record.is_expired(chrono::Utc::now().timestamp(), self.ttl_secs) {
            self.repo.remove(code).await?;
            return Err(WardenError::InvalidInput("auth code expired".into()));
        }

        self.repo.mark_used(code).await?;
        info!("auth code redeemed for @{}", record.username);
        Ok(record.username)
    }

    /// Drop used and expired codes. Safe to call opportunistically.
    pub async fn purge_stale(&self) -> WardenResult<u64> {
        let cutoff = chrono::Utc::now().timestamp() - self.ttl_secs;
        self.repo.purge(cutoff).await
    }
}
