//! Storage implementations.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::StorageConfig;

pub mod schema;
pub mod sqlite;

pub use sqlite::{
    SqliteInventoryDirectory, SqliteNotificationStore, SqliteStockTakingStore, SqliteUserDirectory,
};

/// The full set of SQLite-backed stores sharing one pool.
pub struct Stores {
    pub stock_takings: Arc<SqliteStockTakingStore>,
    pub notifications: Arc<SqliteNotificationStore>,
    pub inventory: Arc<SqliteInventoryDirectory>,
    pub users: Arc<SqliteUserDirectory>,
}

/// Initialize storage based on configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<Stores, Box<dyn std::error::Error + Send + Sync>> {
    info!("Storage: {} at {}", config.storage_type, config.path);

    match config.storage_type.as_str() {
        "sqlite" => {
            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                std::fs::create_dir_all(parent)?;
            }

            let pool =
                sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", config.path)).await?;

            init_stores(pool).await
        }
        other => {
            error!("Unknown storage type: {}", other);
            Err(format!("Unknown storage type: {}", other).into())
        }
    }
}

/// Build and initialize all stores over an existing pool.
pub async fn init_stores(
    pool: sqlx::SqlitePool,
) -> Result<Stores, Box<dyn std::error::Error + Send + Sync>> {
    let stock_takings = Arc::new(SqliteStockTakingStore::new(pool.clone()));
    stock_takings.init().await?;

    let notifications = Arc::new(SqliteNotificationStore::new(pool.clone()));
    notifications.init().await?;

    let inventory = Arc::new(SqliteInventoryDirectory::new(pool.clone()));
    inventory.init().await?;

    let users = Arc::new(SqliteUserDirectory::new(pool));
    users.init().await?;

    Ok(Stores {
        stock_takings,
        notifications,
        inventory,
        users,
    })
}
