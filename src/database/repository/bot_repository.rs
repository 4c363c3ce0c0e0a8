//! Managed-bot repository.

use std::time::Duration;

use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::doc;
use tracing::warn;

use crate::cache::{CacheConfig, TypedCache};
use crate::database::Database;
use crate::database::models::BotRecord;
use crate::error::WardenResult;

/// Repository for bot records, keyed by bot name.
pub struct BotRepo {
    collection: Collection<BotRecord>,
    cache: TypedCache<String, BotRecord>,
}

impl BotRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("bots"),
            cache: TypedCache::new(
                "bots",
                CacheConfig::with_capacity(500).ttl(Duration::from_secs(300)),
            ),
        }
    }

    /// Get a bot by name. `None` when absent or unreadable.
    pub async fn get(&self, name: &str) -> Option<BotRecord> {
        if let Some(bot) = self.cache.get(&name.to_string()) {
            return Some(bot);
        }

        match self.collection.find_one(doc! { "name": name }).await {
            Ok(Some(bot)) => {
                self.cache.insert(name.to_string(), bot.clone());
                Some(bot)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("bot lookup failed for {}: {}", name, e);
                None
            }
        }
    }

    /// Insert a new bot. Returns false if the name is taken.
    pub async fn insert(&self, bot: BotRecord) -> WardenResult<bool> {
        if self.get(&bot.name).await.is_some() {
            return Ok(false);
        }

        self.collection.insert_one(&bot).await?;
        self.cache.insert(bot.name.clone(), bot);
        Ok(true)
    }

    /// Delete a bot and, with it, its local-admin associations.
    pub async fn remove(&self, name: &str) -> WardenResult<bool> {
        let result = self.collection.delete_one(doc! { "name": name }).await?;
        self.cache.invalidate(&name.to_string());
        Ok(result.deleted_count > 0)
    }

    pub async fn set_state(&self, name: &str, running: bool) -> WardenResult<()> {
        self.collection
            .update_one(doc! { "name": name }, doc! { "$set": { "state": running } })
            .await?;
        self.cache.invalidate(&name.to_string());
        Ok(())
    }

    /// Bind a local admin to a bot. Returns false if already bound.
    pub async fn add_ladmin(&self, name: &str, username: &str) -> WardenResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "name": name },
                doc! { "$addToSet": { "ladmins": username } },
            )
            .await?;
        self.cache.invalidate(&name.to_string());
        Ok(result.modified_count > 0)
    }

    /// Unbind a local admin from a bot. Returns false if not bound.
    pub async fn remove_ladmin(&self, name: &str, username: &str) -> WardenResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "name": name },
                doc! { "$pull": { "ladmins": username } },
            )
            .await?;
        self.cache.invalidate(&name.to_string());
        Ok(result.modified_count > 0)
    }

    /// Drop a username from the local-admin list of every bot.
    pub async fn remove_ladmin_everywhere(&self, username: &str) -> WardenResult<u64> {
        let result = self
            .collection
            .update_many(
                doc! { "ladmins": username },
                doc! { "$pull": { "ladmins": username } },
            )
            .await?;
        // The per-name cache may hold stale admin lists for every touched bot.
        self.cache.invalidate_all();
        Ok(result.modified_count)
    }

    /// Number of bots a username is local admin of.
    pub async fn ladmin_binding_count(&self, username: &str) -> u64 {
        self.collection
            .count_documents(doc! { "ladmins": username })
            .await
            .unwrap_or_else(|e| {
                warn!("ladmin binding count failed for {}: {}", username, e);
                0
            })
    }

    /// Distinct usernames holding a local-admin binding on any bot.
    pub async fn all_ladmins(&self) -> Vec<String> {
        match self.collection.distinct("ladmins", doc! {}).await {
            Ok(values) => values
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Err(e) => {
                warn!("ladmin listing failed: {}", e);
                Vec::new()
            }
        }
    }

    /// All registered bots. Empty on storage failure.
    pub async fn all(&self) -> Vec<BotRecord> {
        let cursor = match self.collection.find(doc! {}).await {
            Ok(c) => c,
            Err(e) => {
                warn!("bot listing failed: {}", e);
                return Vec::new();
            }
        };

        match cursor.try_collect().await {
            Ok(bots) => bots,
            Err(e) => {
                warn!("bot listing failed mid-stream: {}", e);
                Vec::new()
            }
        }
    }
}
