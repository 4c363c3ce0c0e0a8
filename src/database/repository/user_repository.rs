//! User repository with cache-first lookups.
//!
//! Read paths degrade on storage errors: the failure is logged with context
//! and the caller sees absent/empty data instead of an error. Write paths
//! surface their errors so the command boundary can report them.

use std::time::Duration;

use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::doc;
use tracing::{debug, warn};

use crate::cache::{CacheConfig, TypedCache};
use crate::database::Database;
use crate::database::models::{Rank, UserRecord};
use crate::error::WardenResult;

/// Repository for user records, keyed by lowercase username.
pub struct UserRepo {
    collection: Collection<UserRecord>,
    cache: TypedCache<String, UserRecord>,
}

impl UserRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("users"),
            cache: TypedCache::new(
                "users",
                CacheConfig::with_capacity(10_000).ttl(Duration::from_secs(600)),
            ),
        }
    }

    /// Get a user by username. Returns `None` when absent or unreadable.
    pub async fn get(&self, username: &str) -> Option<UserRecord> {
        if let Some(user) = self.cache.get(&username.to_string()) {
            return Some(user);
        }

        let result = self
            .collection
            .find_one(doc! { "username": username })
            .await;

        match result {
            Ok(Some(user)) => {
                self.cache.insert(username.to_string(), user.clone());
                Some(user)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("user lookup failed for {}: {}", username, e);
                None
            }
        }
    }

    pub async fn exists(&self, username: &str) -> bool {
        self.get(username).await.is_some()
    }

    /// Register a user if not already known. Returns false for duplicates.
    pub async fn register(&self, user: UserRecord) -> WardenResult<bool> {
        if self.get(&user.username).await.is_some() {
            return Ok(false);
        }

        self.collection.insert_one(&user).await?;
        self.cache.insert(user.username.clone(), user.clone());
        debug!("registered user @{}", user.username);
        Ok(true)
    }

    /// Refresh external identity fields of an existing user.
    pub async fn update_identity(
        &self,
        username: &str,
        user_id: i64,
        first_name: &str,
    ) -> WardenResult<()> {
        self.apply(
            username,
            doc! { "user_id": user_id, "first_name": first_name },
        )
        .await
    }

    /// Write the cached rank field. Only called together with the
    /// membership-set mutation it is derived from.
    pub async fn set_rank(&self, username: &str, rank: Rank) -> WardenResult<()> {
        self.apply(username, doc! { "rank": rank.as_str() }).await
    }

    pub async fn set_banned(&self, username: &str, banned: bool) -> WardenResult<()> {
        self.apply(username, doc! { "banned": banned }).await
    }

    pub async fn set_warns(&self, username: &str, warns: u32) -> WardenResult<()> {
        self.apply(username, doc! { "warns": warns as i64 }).await
    }

    /// Ban-time penalty: rank forced to user, warn counter cleared.
    pub async fn apply_ban_penalty(&self, username: &str) -> WardenResult<()> {
        self.apply(
            username,
            doc! { "rank": Rank::User.as_str(), "warns": 0_i64, "banned": true },
        )
        .await
    }

    /// All known users. Empty on storage failure.
    pub async fn all(&self) -> Vec<UserRecord> {
        let cursor = match self.collection.find(doc! {}).await {
            Ok(c) => c,
            Err(e) => {
                warn!("user listing failed: {}", e);
                return Vec::new();
            }
        };

        match cursor.try_collect().await {
            Ok(users) => users,
            Err(e) => {
                warn!("user listing failed mid-stream: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn count(&self) -> u64 {
        self.collection
            .count_documents(doc! {})
            .await
            .unwrap_or_else(|e| {
                warn!("user count failed: {}", e);
                0
            })
    }

    pub async fn banned_count(&self) -> u64 {
        self.collection
            .count_documents(doc! { "banned": true })
            .await
            .unwrap_or_else(|e| {
                warn!("banned count failed: {}", e);
                0
            })
    }

    async fn apply(&self, username: &str, fields: mongodb::bson::Document) -> WardenResult<()> {
        let mut fields = fields;
        fields.insert("updated_at", chrono::Utc::now().timestamp());

        self.collection
            .update_one(doc! { "username": username }, doc! { "$set": fields })
            .await?;

        self.cache.invalidate(&username.to_string());
        Ok(())
    }
}
