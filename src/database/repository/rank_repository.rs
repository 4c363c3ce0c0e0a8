//! Rank membership sets.
//!
//! Two single-column collections, `operators` and `global_admins`. These
//! sets are the source of truth for rank; the cached rank field on user
//! records is derived from them.

use std::time::Duration;

use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::{CacheConfig, TypedCache};
use crate::database::Database;
use crate::error::WardenResult;

/// A row of a membership set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankMember {
    pub username: String,
}

/// Repository over the operator and global-admin sets.
pub struct RankRepo {
    operators: Collection<RankMember>,
    global_admins: Collection<RankMember>,
    /// Membership answers, keyed by ("op"|"ga", username).
    cache: TypedCache<(&'static str, String), bool>,
}

impl RankRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            operators: db.collection("operators"),
            global_admins: db.collection("global_admins"),
            cache: TypedCache::new(
                "rank_memberships",
                CacheConfig::with_capacity(5_000).ttl(Duration::from_secs(300)),
            ),
        }
    }

    pub async fn is_operator_member(&self, username: &str) -> bool {
        self.is_member(&self.operators, "op", username).await
    }

    pub async fn is_gadmin_member(&self, username: &str) -> bool {
        self.is_member(&self.global_admins, "ga", username).await
    }

    /// Add to the operator set. Returns false if already present.
    pub async fn add_operator(&self, username: &str) -> WardenResult<bool> {
        self.add(&self.operators, "op", username).await
    }

    /// Remove from the operator set. Returns false if absent.
    pub async fn remove_operator(&self, username: &str) -> WardenResult<bool> {
        self.remove(&self.operators, "op", username).await
    }

    pub async fn add_global_admin(&self, username: &str) -> WardenResult<bool> {
        self.add(&self.global_admins, "ga", username).await
    }

    pub async fn remove_global_admin(&self, username: &str) -> WardenResult<bool> {
        self.remove(&self.global_admins, "ga", username).await
    }

    /// All operator usernames. Empty on storage failure.
    pub async fn operators(&self) -> Vec<String> {
        self.list(&self.operators).await
    }

    pub async fn global_admins(&self) -> Vec<String> {
        self.list(&self.global_admins).await
    }

    pub async fn operator_count(&self) -> u64 {
        self.operators.count_documents(doc! {}).await.unwrap_or(0)
    }

    pub async fn gadmin_count(&self) -> u64 {
        self.global_admins
            .count_documents(doc! {})
            .await
            .unwrap_or(0)
    }

    async fn is_member(
        &self,
        set: &Collection<RankMember>,
        tag: &'static str,
        username: &str,
    ) -> bool {
        let key = (tag, username.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        let result = set.find_one(doc! { "username": username }).await;
        match result {
            Ok(found) => {
                let member = found.is_some();
                self.cache.insert(key, member);
                member
            }
            Err(e) => {
                warn!("membership lookup failed for {} ({}): {}", username, tag, e);
                false
            }
        }
    }

    async fn add(
        &self,
        set: &Collection<RankMember>,
        tag: &'static str,
        username: &str,
    ) -> WardenResult<bool> {
        if set.find_one(doc! { "username": username }).await?.is_some() {
            return Ok(false);
        }

        set.insert_one(&RankMember {
            username: username.to_string(),
        })
        .await?;
        self.cache.invalidate(&(tag, username.to_string()));
        Ok(true)
    }

    async fn remove(
        &self,
        set: &Collection<RankMember>,
        tag: &'static str,
        username: &str,
    ) -> WardenResult<bool> {
        let result = set.delete_one(doc! { "username": username }).await?;
        self.cache.invalidate(&(tag, username.to_string()));
        Ok(result.deleted_count > 0)
    }

    async fn list(&self, set: &Collection<RankMember>) -> Vec<String> {
        let cursor = match set.find(doc! {}).await {
            Ok(c) => c,
            Err(e) => {
                warn!("membership listing failed: {}", e);
                return Vec::new();
            }
        };

        match cursor.try_collect::<Vec<RankMember>>().await {
            Ok(members) => members.into_iter().map(|m| m.username).collect(),
            Err(e) => {
                warn!("membership listing failed mid-stream: {}", e);
                Vec::new()
            }
        }
    }
}
