//! Ban record repository.
//!
//! Deliberately uncached: ban records mutate on read (lazy expiry), and a
//! stale cached record would resurrect a ban that was already cleared.

use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::doc;
use tracing::warn;

use crate::database::Database;
use crate::database::models::BanRecord;
use crate::error::WardenResult;

pub struct BanRepo {
    collection: Collection<BanRecord>,
}

impl BanRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("bans"),
        }
    }

    /// Get the ban record for a username, expired or not.
    pub async fn get(&self, username: &str) -> Option<BanRecord> {
        match self
            .collection
            .find_one(doc! { "username": username })
            .await
        {
            Ok(record) => record,
            Err(e) => {
                warn!("ban lookup failed for {}: {}", username, e);
                None
            }
        }
    }

    /// Write a ban record, replacing any previous one for the username.
    pub async fn save(&self, record: &BanRecord) -> WardenResult<()> {
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.collection
            .replace_one(doc! { "username": &record.username }, record)
            .with_options(options)
            .await?;
        Ok(())
    }

    /// Delete the ban record. Returns false if none existed.
    pub async fn remove(&self, username: &str) -> WardenResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "username": username })
            .await?;
        Ok(result.deleted_count > 0)
    }

    /// All ban records. Empty on storage failure.
    pub async fn all(&self) -> Vec<BanRecord> {
        let cursor = match self.collection.find(doc! {}).await {
            Ok(c) => c,
            Err(e) => {
                warn!("ban listing failed: {}", e);
                return Vec::new();
            }
        };

        match cursor.try_collect().await {
            Ok(bans) => bans,
            Err(e) => {
                warn!("ban listing failed mid-stream: {}", e);
                Vec::new()
            }
        }
    }
}
