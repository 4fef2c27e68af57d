//! Stock-taking persistence interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Assignment, DiscrepantItem, StockTaking, StockTakingItem};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid enum value: {0}")]
    InvalidValue(String),
}

/// Interface for stock-taking persistence.
///
/// Lifecycle flips (`mark_started`, `mark_completed`) are conditional on
/// the current status and report whether a row actually changed, so that
/// concurrent transitions resolve to exactly one winner without any
/// locking above the storage layer.
#[async_trait]
pub trait StockTakingStore: Send + Sync {
    /// Persist a new stock taking with its assignments and item snapshot
    /// as one atomic write.
    async fn insert(
        &self,
        taking: &StockTaking,
        assignments: &[Assignment],
        items: &[StockTakingItem],
    ) -> Result<()>;

    /// Fetch one stock taking by id.
    async fn get(&self, id: Uuid) -> Result<Option<StockTaking>>;

    /// Flip Requested -> InProgress. Returns false when the taking is
    /// missing or not in Requested status.
    async fn mark_started(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// Flip InProgress -> Completed. Returns false when the taking is
    /// missing or not in InProgress status.
    async fn mark_completed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// All assignments for a stock taking.
    async fn assignments(&self, stock_taking_id: Uuid) -> Result<Vec<Assignment>>;

    /// All items for a stock taking.
    async fn items(&self, stock_taking_id: Uuid) -> Result<Vec<StockTakingItem>>;

    /// Fetch one item by id.
    async fn item(&self, item_id: Uuid) -> Result<Option<StockTakingItem>>;

    /// Overwrite an item's counted fields. Returns false when the item
    /// is missing. Last write wins; no count history is retained.
    async fn record_count(
        &self,
        item_id: Uuid,
        counted_quantity: i64,
        counted_by: Uuid,
        counted_at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<bool>;

    /// Most recently created stock takings, newest first.
    async fn recent(&self, take: u64) -> Result<Vec<StockTaking>>;

    /// A worker's non-completed stock takings, newest first.
    async fn for_worker(&self, user_id: Uuid) -> Result<Vec<StockTaking>>;

    /// Most recently counted discrepant items across completed stock
    /// takings, newest first.
    async fn discrepant_items(&self, take: u64) -> Result<Vec<DiscrepantItem>>;

    /// Whether the user is assigned to the stock taking.
    async fn is_assigned(&self, stock_taking_id: Uuid, user_id: Uuid) -> Result<bool>;
}
