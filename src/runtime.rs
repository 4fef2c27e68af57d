//! Runtime wiring.
//!
//! Builds the full service graph - storage, hub, notification and
//! lifecycle services - from a [`Config`]. Embedding applications hold a
//! [`Runtime`] and expose its services through whatever transport they
//! choose; per-connection feeds come from [`crate::feed`].

use std::sync::Arc;

use crate::config::Config;
use crate::hub::NotificationHub;
use crate::services::{NotificationService, StockTakingService};
use crate::storage::{self, SqliteInventoryDirectory, SqliteUserDirectory};

/// A fully wired service graph.
pub struct Runtime {
    pub config: Config,
    pub hub: Arc<NotificationHub>,
    pub notifications: Arc<NotificationService>,
    pub stock_takings: Arc<StockTakingService>,
    /// Directory write access for the surrounding CRUD layer.
    pub inventory: Arc<SqliteInventoryDirectory>,
    pub users: Arc<SqliteUserDirectory>,
}

impl Runtime {
    /// Initialize storage from configuration and wire the services.
    pub async fn init(config: Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let stores = storage::init_storage(&config.storage).await?;
        Ok(Self::wire(config, stores))
    }

    /// Wire services over an in-memory database. Intended for tests and
    /// local experiments.
    pub async fn in_memory() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        // A second pooled connection would see a different empty
        // database; in-memory SQLite is per-connection.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let stores = storage::init_stores(pool).await?;
        Ok(Self::wire(Config::default(), stores))
    }

    fn wire(config: Config, stores: storage::Stores) -> Self {
        let hub = Arc::new(NotificationHub::new());
        let notifications = Arc::new(NotificationService::new(
            stores.notifications.clone(),
            hub.clone(),
        ));
        let stock_takings = Arc::new(
            StockTakingService::new(
                stores.stock_takings.clone(),
                stores.inventory.clone(),
                stores.users.clone(),
                notifications.clone(),
            )
            .with_variance_decimals(config.reporting.variance_decimals),
        );

        Self {
            config,
            hub,
            notifications,
            stock_takings,
            inventory: stores.inventory,
            users: stores.users,
        }
    }
}
