use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    config::{AppConfig, StoreBackend},
    store::{
        Store,
        memory::MemoryStore,
        mongo::{MongoStore, StoreTimeouts},
    },
};

/// Connect to MongoDB using the configured timeouts.
pub async fn connect_mongo(config: &AppConfig) -> Result<MongoStore> {
    let timeouts = StoreTimeouts {
        cart: config.cart_timeout,
        query: config.query_timeout,
    };
    MongoStore::connect(&config.mongodb_uri, &config.database_name, timeouts)
        .await
        .context("failed to connect to mongodb")
}

/// Build the store handle shared by every request for the process lifetime.
pub async fn create_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Mongo => Ok(Arc::new(connect_mongo(config).await?)),
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
