//! SQLite store implementations.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::interfaces::stock_taking_store::{Result, StorageError};

pub mod inventory;
pub mod notification_store;
pub mod stock_taking_store;

pub use inventory::{SqliteInventoryDirectory, SqliteUserDirectory};
pub use notification_store::SqliteNotificationStore;
pub use stock_taking_store::SqliteStockTakingStore;

/// Render a timestamp for storage. RFC 3339 with fixed nanosecond
/// precision and a `Z` suffix keeps lexicographic order equal to
/// chronological order and round-trips without loss.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp(format!("{}: {}", value, e)))
}

pub(crate) fn parse_opt_ts(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_ts).transpose()
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Ok(Uuid::parse_str(value)?)
}

pub(crate) fn parse_opt_uuid(value: Option<String>) -> Result<Option<Uuid>> {
    value.as_deref().map(parse_uuid).transpose()
}
