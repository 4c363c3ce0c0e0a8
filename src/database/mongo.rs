//! MongoDB database wrapper.

use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::info;

/// Database wrapper for MongoDB operations.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if connection fails.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        let db = client.database(db_name);

        Ok(Self { db })
    }

    /// Create the unique indexes every collection relies on.
    ///
    /// Called once at startup; a failure here aborts the process, since
    /// running without the uniqueness guarantees corrupts the data model.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        let unique = |key: &str| {
            IndexModel::builder()
                .keys(doc! { key: 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };

        self.db
            .collection::<mongodb::bson::Document>("users")
            .create_index(unique("username"))
            .await?;
        self.db
            .collection::<mongodb::bson::Document>("bots")
            .create_index(unique("name"))
            .await?;
        self.db
            .collection::<mongodb::bson::Document>("bans")
            .create_index(unique("username"))
            .await?;
        self.db
            .collection::<mongodb::bson::Document>("global_admins")
            .create_index(unique("username"))
            .await?;
        self.db
            .collection::<mongodb::bson::Document>("operators")
            .create_index(unique("username"))
            .await?;
        self.db
            .collection::<mongodb::bson::Document>("auth_codes")
            .create_index(unique("code"))
            .await?;

        info!("Database schema initialized");
        Ok(())
    }

    /// Get a typed collection from the database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}
