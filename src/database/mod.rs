use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;
use std::time::Duration;

use crate::models::{BOOTCAMPS, COURSES, REVIEWS, USERS};

const DEFAULT_DB_NAME: &str = "devcamper";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    /// Connects, pings the server and makes sure the indexes the API relies on exist.
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mongodb = Self::connect_lazy(uri).await?;

        mongodb.db.run_command(doc! { "ping": 1 }).await?;
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Builds the client without touching the server; the driver connects on first use.
    pub async fn connect_lazy(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(Duration::from_secs(300));
        client_options.connect_timeout = Some(Duration::from_secs(5));
        client_options.server_selection_timeout = Some(Duration::from_secs(5));

        let db_name = client_options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DB_NAME.to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        Ok(Self { db })
    }

    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        self.create_index(USERS, doc! { "email": 1 }, Some(unique())).await?;
        self.create_index(BOOTCAMPS, doc! { "name": 1 }, Some(unique())).await?;
        self.create_index(BOOTCAMPS, doc! { "location": "2dsphere" }, None).await?;

        // One bootcamp per non-admin owner. Admin-created bootcamps are not flagged
        // and fall outside the partial filter.
        let one_per_owner = IndexOptions::builder()
            .unique(true)
            .partial_filter_expression(doc! { "exclusiveOwner": true })
            .name("user_exclusive_owner".to_string())
            .build();
        self.create_index(BOOTCAMPS, doc! { "user": 1 }, Some(one_per_owner)).await?;

        self.create_index(COURSES, doc! { "bootcamp": 1 }, None).await?;
        self.create_index(REVIEWS, doc! { "bootcamp": 1, "user": 1 }, Some(unique())).await?;

        log::info!("✅ Database indexes ready");
        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        keys: Document,
        options: Option<IndexOptions>,
    ) -> Result<(), Box<dyn Error>> {
        let description = format!("{}({})", collection, keys);
        let model = IndexModel::builder().keys(keys).options(options).build();

        self.collection::<Document>(collection).create_index(model).await?;
        log::info!("   ✅ Index ready: {}", description);
        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn health_check(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn lazy_connection_uses_database_from_uri() {
        let db = MongoDB::connect_lazy("mongodb://localhost:27017/devcamper_test")
            .await
            .unwrap();
        assert_eq!(db.db.name(), "devcamper_test");
    }

    #[actix_web::test]
    async fn lazy_connection_falls_back_to_default_name() {
        let db = MongoDB::connect_lazy("mongodb://localhost:27017").await.unwrap();
        assert_eq!(db.db.name(), DEFAULT_DB_NAME);
    }

    #[actix_web::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/devcamper_test".to_string());
        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
        assert!(db.unwrap().health_check().await);
    }
}
