//! Directory interfaces onto the surrounding CRUD layer.
//!
//! The lifecycle core does not own locations, products, stock levels or
//! user accounts; it reads them (and writes stock quantities back during
//! count acceptance) through these seams.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::stock_taking_store::Result;
use crate::domain::{LocationInfo, ProductInfo, StockSnapshot};

/// Read access to locations, products and stock levels, plus the one
/// write path the core needs: committing accepted counts.
#[async_trait]
pub trait InventoryDirectory: Send + Sync {
    /// Resolve a location id.
    async fn location(&self, id: Uuid) -> Result<Option<LocationInfo>>;

    /// Resolve a product id.
    async fn product(&self, id: Uuid) -> Result<Option<ProductInfo>>;

    /// Current stock levels at a location, read at snapshot time.
    async fn stock_levels(&self, location_id: Uuid) -> Result<Vec<StockSnapshot>>;

    /// Overwrite the quantity of one (product, location) stock row.
    /// Returns false when no such row exists; the caller skips silently.
    async fn update_stock(
        &self,
        location_id: Uuid,
        product_id: Uuid,
        quantity: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Display-name resolution for read-model projections.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve one user id to a display name.
    async fn display_name(&self, id: Uuid) -> Result<Option<String>>;

    /// Resolve a batch of user ids. Unknown ids are absent from the map.
    async fn display_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>>;
}
