//! Ban ledger: the record store plus the banned flag, kept in step.
//!
//! The ban record is the source of truth; the `banned` flag on the user
//! record is a projection written in the same unit of work. Expiry of
//! temporary bans is lazy and lives in exactly one place, [`BanLedger::check`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::database::{BanRecord, BanRepo, UserRepo};
use crate::error::WardenResult;

pub struct BanLedger {
    bans: Arc<BanRepo>,
    users: Arc<UserRepo>,
}

impl BanLedger {
    pub fn new(bans: Arc<BanRepo>, users: Arc<UserRepo>) -> Self {
        Self { bans, users }
    }

    /// Current ban state of a username.
    ///
    /// Mutation contract: if the stored ban is temporary and its duration
    /// has elapsed, this call deletes the record, clears the banned flag
    /// and reports the user as not banned. Every internal ban query goes
    /// through here so expiry is evaluated consistently.
    pub async fn check(&self, username: &str) -> Option<BanRecord> {
        let record = self.bans.get(username).await?;

        if record.is_expired(chrono::Utc::now().timestamp()) {
            if let Err(e) = self.bans.remove(username).await {
                warn!("failed to clear expired ban for @{}: {}", username, e);
                // Treat the ban as lifted anyway; the next query retries.
            }
            if let Err(e) = self.users.set_banned(username, false).await {
                warn!("failed to clear banned flag for @{}: {}", username, e);
            }
            info!(
                "temporary ban for @{} expired after {}h",
                username, record.duration_hours
            );
            return None;
        }

        Some(record)
    }

    pub async fn is_banned(&self, username: &str) -> bool {
        self.check(username).await.is_some()
    }

    /// Write a ban record and raise the banned flag.
    pub async fn impose(&self, record: &BanRecord) -> WardenResult<()> {
        self.bans.save(record).await?;
        self.users.set_banned(&record.username, true).await
    }

    /// Delete the ban record and clear the flag. False when no record existed.
    pub async fn lift(&self, username: &str) -> WardenResult<bool> {
        let removed = self.bans.remove(username).await?;
        if removed {
            self.users.set_banned(username, false).await?;
        }
        Ok(removed)
    }

    /// All stored ban records, expired ones included.
    pub async fn all(&self) -> Vec<BanRecord> {
        self.bans.all().await
    }
}
