//! One-time auth code repository.

use mongodb::Collection;
use mongodb::bson::doc;
use tracing::warn;

use crate::database::Database;
use crate::database::models::AuthCode;
use crate::error::WardenResult;

pub struct AuthCodeRepo {
    collection: Collection<AuthCode>,
}

impl AuthCodeRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("auth_codes"),
        }
    }

    pub async fn get(&self, code: &str) -> Option<AuthCode> {
        match self.collection.find_one(doc! { "code": code }).await {
            Ok(record) => record,
            Err(e) => {
                warn!("auth code lookup failed: {}", e);
                None
            }
        }
    }

    /// Insert a freshly issued code. Returns false on a code collision.
    pub async fn insert(&self, code: AuthCode) -> WardenResult<bool> {
        if self.get(&code.code).await.is_some() {
            return Ok(false);
        }
        self.collection.insert_one(&code).await?;
        Ok(true)
    }

    /// Flag a code as consumed.
    pub async fn mark_used(&self, code: &str) -> WardenResult<()> {
        self.collection
            .update_one(doc! { "code": code }, doc! { "$set": { "used": true } })
            .await?;
        Ok(())
    }

    /// Delete a single code, used or not.
    pub async fn remove(&self, code: &str) -> WardenResult<bool> {
        let result = self.collection.delete_one(doc! { "code": code }).await?;
        Ok(result.deleted_count > 0)
    }

    /// Drop every code that is used or was created before `cutoff`.
    pub async fn purge(&self, cutoff: i64) -> WardenResult<u64> {
        let result = self
            .collection
            .delete_many(doc! {
                "$or": [
                    { "used": true },
                    { "created_at": { "$lt": cutoff } },
                ]
            })
            .await?;
        Ok(result.deleted_count)
    }
}
