//! Domain records for the stock-taking lifecycle.
//!
//! Entities are plain data; derived figures (variance, progress) are
//! computed on demand and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a stock taking.
///
/// Moves strictly forward: Requested -> InProgress -> Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockTakingStatus {
    Requested,
    InProgress,
    Completed,
}

impl StockTakingStatus {
    /// Stable string form used for persistence and projections.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "requested" => Some(Self::Requested),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for StockTakingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    StockTakingRequested,
    StockTakingStarted,
    StockTakingCompleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StockTakingRequested => "stock_taking_requested",
            Self::StockTakingStarted => "stock_taking_started",
            Self::StockTakingCompleted => "stock_taking_completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stock_taking_requested" => Some(Self::StockTakingRequested),
            "stock_taking_started" => Some(Self::StockTakingStarted),
            "stock_taking_completed" => Some(Self::StockTakingCompleted),
            _ => None,
        }
    }
}

/// One inventory-count task scoped to a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTaking {
    pub id: Uuid,
    pub location_id: Uuid,
    pub status: StockTakingStatus,
    pub requested_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Binds one worker to one stock taking. Unique per pair, immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub stock_taking_id: Uuid,
    pub user_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

/// Expected-vs-counted record for one product within a stock taking.
///
/// `expected_quantity` is snapshotted from stock at creation time; later
/// stock changes never alter an in-flight taking. Counted fields are set
/// together by the counting operation, last write wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTakingItem {
    pub id: Uuid,
    pub stock_taking_id: Uuid,
    pub product_id: Uuid,
    pub expected_quantity: i64,
    pub counted_quantity: Option<i64>,
    pub counted_at: Option<DateTime<Utc>>,
    pub counted_by: Option<Uuid>,
    pub notes: Option<String>,
}

impl StockTakingItem {
    pub fn is_counted(&self) -> bool {
        self.counted_quantity.is_some()
    }

    /// Counted minus expected; `None` until counted.
    pub fn variance(&self) -> Option<i64> {
        self.counted_quantity.map(|c| c - self.expected_quantity)
    }

    /// Variance as a percentage of the expected quantity, rounded to
    /// `decimals` places. `None` until counted or when the expected
    /// quantity is zero (no division by zero; callers decide how to
    /// present the zero-expected case).
    pub fn variance_percent(&self, decimals: u32) -> Option<f64> {
        let counted = self.counted_quantity?;
        if self.expected_quantity <= 0 {
            return None;
        }
        let percent =
            (counted - self.expected_quantity) as f64 / self.expected_quantity as f64 * 100.0;
        Some(round_to(percent, decimals))
    }

    pub fn is_discrepant(&self) -> bool {
        self.counted_quantity
            .is_some_and(|c| c != self.expected_quantity)
    }
}

/// One delivered-or-pending message to one user.
///
/// Immutable once created, except the read flag (false -> true only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub kind: NotificationKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, draft: NotificationDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: draft.title,
            message: draft.message,
            link: draft.link,
            kind: draft.kind,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// Content of a notification before it is addressed and persisted.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
}

/// A location as seen through the inventory directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

/// A product as seen through the inventory directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
}

/// Current quantity of one product at one location, read at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// List-view projection of a stock taking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockTakingSummary {
    pub id: Uuid,
    pub location_code: String,
    pub location_name: String,
    pub status: StockTakingStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub requested_by_name: String,
    pub assigned_workers: Vec<String>,
    pub total_items: usize,
    pub counted_items: usize,
    pub discrepancy_count: usize,
}

impl StockTakingSummary {
    /// Counted items as a whole percentage of the total; 0 when empty.
    pub fn progress_percent(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        round_to(
            self.counted_items as f64 / self.total_items as f64 * 100.0,
            0,
        )
    }
}

/// Fully hydrated view of one stock taking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockTakingDetail {
    pub summary: StockTakingSummary,
    pub notes: Option<String>,
    pub items: Vec<ItemDetail>,
}

/// One item inside a [`StockTakingDetail`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_sku: String,
    pub product_name: String,
    pub expected_quantity: i64,
    pub counted_quantity: Option<i64>,
    pub counted_at: Option<DateTime<Utc>>,
    pub counted_by_name: Option<String>,
    pub notes: Option<String>,
    pub variance: Option<i64>,
    pub variance_percent: Option<f64>,
}

/// Dashboard alert for a discrepant item in a completed taking.
///
/// `variance_percent` is 0 when the expected quantity was 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscrepancyAlert {
    pub stock_taking_id: Uuid,
    pub product_sku: String,
    pub product_name: String,
    pub location_name: String,
    pub expected_quantity: i64,
    pub counted_quantity: i64,
    pub variance: i64,
    pub variance_percent: f64,
}

/// Storage-level row backing a [`DiscrepancyAlert`]: the discrepant item
/// plus the parent taking's location.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscrepantItem {
    pub item: StockTakingItem,
    pub location_id: Uuid,
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(expected: i64, counted: Option<i64>) -> StockTakingItem {
        StockTakingItem {
            id: Uuid::new_v4(),
            stock_taking_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            expected_quantity: expected,
            counted_quantity: counted,
            counted_at: counted.map(|_| Utc::now()),
            counted_by: counted.map(|_| Uuid::new_v4()),
            notes: None,
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            StockTakingStatus::Requested,
            StockTakingStatus::InProgress,
            StockTakingStatus::Completed,
        ] {
            assert_eq!(StockTakingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(StockTakingStatus::parse("bogus"), None);
    }

    #[test]
    fn test_variance_requires_count() {
        assert_eq!(item(100, None).variance(), None);
        assert_eq!(item(100, Some(95)).variance(), Some(-5));
        assert_eq!(item(100, Some(100)).variance(), Some(0));
    }

    #[test]
    fn test_variance_percent_rounding() {
        assert_eq!(item(100, Some(95)).variance_percent(1), Some(-5.0));
        // 1/3 over 3 expected = 33.333...%
        assert_eq!(item(3, Some(4)).variance_percent(1), Some(33.3));
        assert_eq!(item(3, Some(4)).variance_percent(2), Some(33.33));
    }

    #[test]
    fn test_variance_percent_zero_expected() {
        // Deliberate policy: undefined rather than a division error.
        assert_eq!(item(0, Some(5)).variance_percent(1), None);
    }

    #[test]
    fn test_discrepancy_flag() {
        assert!(!item(50, None).is_discrepant());
        assert!(!item(50, Some(50)).is_discrepant());
        assert!(item(50, Some(49)).is_discrepant());
    }

    #[test]
    fn test_progress_percent() {
        let mut summary = StockTakingSummary {
            id: Uuid::new_v4(),
            location_code: "WH-A".into(),
            location_name: "Warehouse A".into(),
            status: StockTakingStatus::InProgress,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            requested_by_name: "Admin".into(),
            assigned_workers: vec![],
            total_items: 3,
            counted_items: 2,
            discrepancy_count: 0,
        };
        assert_eq!(summary.progress_percent(), 67.0);

        summary.total_items = 0;
        summary.counted_items = 0;
        assert_eq!(summary.progress_percent(), 0.0);
    }
}
