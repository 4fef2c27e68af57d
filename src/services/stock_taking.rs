//! Stock-taking lifecycle service.
//!
//! Owns the state machine Requested -> InProgress -> Completed plus the
//! count-acceptance side effect, and emits lifecycle notifications. The
//! status flips go through conditional updates in the store, so two
//! concurrent transition attempts resolve to one winner and one
//! notification.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    Assignment, DiscrepancyAlert, ItemDetail, NotificationDraft, NotificationKind, StockTaking,
    StockTakingDetail, StockTakingItem, StockTakingStatus, StockTakingSummary,
};
use crate::interfaces::{InventoryDirectory, StockTakingStore, StorageError, UserDirectory};
use crate::services::NotificationService;

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Business-flow rejections and storage failures of lifecycle operations.
///
/// Rejections (wrong status, unassigned user, uncounted items) are
/// ordinary `Err` values, not panics: callers check and react. Storage
/// failures pass through untouched in the `Storage` variant.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Stock taking not found: {0}")]
    NotFound(Uuid),

    #[error("Stock taking item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Location not found: {0}")]
    LocationNotFound(Uuid),

    #[error("Stock taking is {actual}, operation requires {expected}")]
    InvalidStatus {
        expected: StockTakingStatus,
        actual: StockTakingStatus,
    },

    #[error("User {user_id} is not assigned to stock taking {stock_taking_id}")]
    NotAssigned {
        stock_taking_id: Uuid,
        user_id: Uuid,
    },

    #[error("{remaining} items still uncounted")]
    ItemsUncounted { remaining: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Input for [`StockTakingService::create`].
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub location_id: Uuid,
    pub requested_by: Uuid,
    /// Callers deduplicate; assignments are unique per (taking, user).
    pub worker_ids: Vec<Uuid>,
    pub notes: Option<String>,
}

/// The lifecycle state machine and its read models.
pub struct StockTakingService {
    store: Arc<dyn StockTakingStore>,
    inventory: Arc<dyn InventoryDirectory>,
    users: Arc<dyn UserDirectory>,
    notifications: Arc<NotificationService>,
    variance_decimals: u32,
}

impl StockTakingService {
    /// Create a new lifecycle service with the default variance rounding
    /// of one decimal place.
    pub fn new(
        store: Arc<dyn StockTakingStore>,
        inventory: Arc<dyn InventoryDirectory>,
        users: Arc<dyn UserDirectory>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            store,
            inventory,
            users,
            notifications,
            variance_decimals: 1,
        }
    }

    /// Override the rounding policy for variance percentages.
    pub fn with_variance_decimals(mut self, decimals: u32) -> Self {
        self.variance_decimals = decimals;
        self
    }

    /// Request a count: snapshot current stock at the location into
    /// per-item expected quantities, persist assignments, and notify the
    /// assigned workers.
    pub async fn create(&self, request: CreateRequest) -> Result<StockTaking> {
        let location = self
            .inventory
            .location(request.location_id)
            .await?
            .ok_or(LifecycleError::LocationNotFound(request.location_id))?;

        // Copy, not reference: later stock changes must not alter this
        // taking's expectations.
        let stocks = self.inventory.stock_levels(request.location_id).await?;

        let now = Utc::now();
        let taking = StockTaking {
            id: Uuid::new_v4(),
            location_id: request.location_id,
            status: StockTakingStatus::Requested,
            requested_by: request.requested_by,
            created_at: now,
            started_at: None,
            completed_at: None,
            notes: request.notes,
        };

        let assignments: Vec<Assignment> = request
            .worker_ids
            .iter()
            .map(|&user_id| Assignment {
                stock_taking_id: taking.id,
                user_id,
                assigned_at: now,
            })
            .collect();

        let items: Vec<StockTakingItem> = stocks
            .iter()
            .map(|stock| StockTakingItem {
                id: Uuid::new_v4(),
                stock_taking_id: taking.id,
                product_id: stock.product_id,
                expected_quantity: stock.quantity,
                counted_quantity: None,
                counted_at: None,
                counted_by: None,
                notes: None,
            })
            .collect();

        self.store.insert(&taking, &assignments, &items).await?;

        info!(
            stock_taking_id = %taking.id,
            location = %location.code,
            workers = request.worker_ids.len(),
            items = items.len(),
            "Stock taking requested"
        );

        if !request.worker_ids.is_empty() {
            self.notifications
                .notify_many(
                    &request.worker_ids,
                    NotificationDraft {
                        title: "Stock Taking Requested".to_string(),
                        message: format!(
                            "You have been assigned to count stock at {}",
                            location.name
                        ),
                        kind: NotificationKind::StockTakingRequested,
                        link: Some(format!("/stocktaking/perform/{}", taking.id)),
                    },
                )
                .await?;
        }

        Ok(taking)
    }

    /// Start a requested taking. The caller must be one of its assigned
    /// workers; the requester is notified on success.
    pub async fn start(&self, id: Uuid, user_id: Uuid) -> Result<StockTaking> {
        let mut taking = self
            .store
            .get(id)
            .await?
            .ok_or(LifecycleError::NotFound(id))?;

        if taking.status != StockTakingStatus::Requested {
            return Err(LifecycleError::InvalidStatus {
                expected: StockTakingStatus::Requested,
                actual: taking.status,
            });
        }

        if !self.store.is_assigned(id, user_id).await? {
            return Err(LifecycleError::NotAssigned {
                stock_taking_id: id,
                user_id,
            });
        }

        let now = Utc::now();
        if !self.store.mark_started(id, now).await? {
            // Lost a race: someone else flipped the status first.
            return Err(self.stale_status(id, StockTakingStatus::Requested).await?);
        }
        taking.status = StockTakingStatus::InProgress;
        taking.started_at = Some(now);

        info!(stock_taking_id = %id, user_id = %user_id, "Stock taking started");

        let location = self.location_label(taking.location_id).await?;
        self.notifications
            .notify(
                taking.requested_by,
                NotificationDraft {
                    title: "Stock Taking Started".to_string(),
                    message: format!("Stock taking at {} has been started", location),
                    kind: NotificationKind::StockTakingStarted,
                    link: Some(format!("/stocktaking/details/{}", taking.id)),
                },
            )
            .await?;

        Ok(taking)
    }

    /// Record a counted quantity against one item. The parent taking
    /// must be in progress. Overwrite semantics: re-counting before
    /// completion replaces the previous count, whoever made it. No
    /// notification fires per count.
    pub async fn record_count(
        &self,
        item_id: Uuid,
        counted_quantity: i64,
        counted_by: Uuid,
        notes: Option<String>,
    ) -> Result<()> {
        let item = self
            .store
            .item(item_id)
            .await?
            .ok_or(LifecycleError::ItemNotFound(item_id))?;

        let taking = self
            .store
            .get(item.stock_taking_id)
            .await?
            .ok_or(LifecycleError::NotFound(item.stock_taking_id))?;

        if taking.status != StockTakingStatus::InProgress {
            return Err(LifecycleError::InvalidStatus {
                expected: StockTakingStatus::InProgress,
                actual: taking.status,
            });
        }

        let updated = self
            .store
            .record_count(item_id, counted_quantity, counted_by, Utc::now(), notes.as_deref())
            .await?;
        if !updated {
            return Err(LifecycleError::ItemNotFound(item_id));
        }

        debug!(
            item_id = %item_id,
            counted_by = %counted_by,
            counted_quantity,
            "Item counted"
        );

        Ok(())
    }

    /// Complete an in-progress taking. Every item must be counted; the
    /// requester is notified with an at-a-glance discrepancy signal.
    pub async fn complete(&self, id: Uuid) -> Result<StockTaking> {
        let mut taking = self
            .store
            .get(id)
            .await?
            .ok_or(LifecycleError::NotFound(id))?;

        if taking.status != StockTakingStatus::InProgress {
            return Err(LifecycleError::InvalidStatus {
                expected: StockTakingStatus::InProgress,
                actual: taking.status,
            });
        }

        let items = self.store.items(id).await?;
        let remaining = items.iter().filter(|i| !i.is_counted()).count();
        if remaining > 0 {
            return Err(LifecycleError::ItemsUncounted { remaining });
        }

        let now = Utc::now();
        if !self.store.mark_completed(id, now).await? {
            return Err(self.stale_status(id, StockTakingStatus::InProgress).await?);
        }
        taking.status = StockTakingStatus::Completed;
        taking.completed_at = Some(now);

        let discrepancies = items.iter().filter(|i| i.is_discrepant()).count();
        info!(
            stock_taking_id = %id,
            discrepancies,
            "Stock taking completed"
        );

        let location = self.location_label(taking.location_id).await?;
        let message = if discrepancies > 0 {
            format!(
                "Stock taking at {} completed with {} discrepancies",
                location, discrepancies
            )
        } else {
            format!("Stock taking at {} completed with no discrepancies", location)
        };

        self.notifications
            .notify(
                taking.requested_by,
                NotificationDraft {
                    title: "Stock Taking Completed".to_string(),
                    message,
                    kind: NotificationKind::StockTakingCompleted,
                    link: Some(format!("/stocktaking/review/{}", taking.id)),
                },
            )
            .await?;

        Ok(taking)
    }

    /// Commit counted quantities of a completed taking back into the
    /// live stock records. Items whose stock row no longer exists are
    /// skipped. Re-applying is harmless and not guarded.
    pub async fn accept_counts(&self, id: Uuid) -> Result<()> {
        let taking = self
            .store
            .get(id)
            .await?
            .ok_or(LifecycleError::NotFound(id))?;

        if taking.status != StockTakingStatus::Completed {
            return Err(LifecycleError::InvalidStatus {
                expected: StockTakingStatus::Completed,
                actual: taking.status,
            });
        }

        let now = Utc::now();
        let mut applied = 0usize;
        for item in self.store.items(id).await? {
            let Some(counted) = item.counted_quantity else {
                continue;
            };
            let written = self
                .inventory
                .update_stock(taking.location_id, item.product_id, counted, now)
                .await?;
            if written {
                applied += 1;
            } else {
                debug!(
                    stock_taking_id = %id,
                    product_id = %item.product_id,
                    "No stock row for counted item, skipped"
                );
            }
        }

        info!(stock_taking_id = %id, applied, "Counts accepted into stock");
        Ok(())
    }

    /// Fetch one taking fully hydrated with location, names and items.
    pub async fn get(&self, id: Uuid) -> Result<StockTakingDetail> {
        let taking = self
            .store
            .get(id)
            .await?
            .ok_or(LifecycleError::NotFound(id))?;

        let items = self.store.items(id).await?;
        let summary = self.summarize(&taking, &items).await?;

        let counter_ids: Vec<Uuid> = items.iter().filter_map(|i| i.counted_by).collect();
        let counter_names = self.users.display_names(&counter_ids).await?;

        let mut details = Vec::with_capacity(items.len());
        for item in items {
            let product = self.inventory.product(item.product_id).await?;
            let (sku, name) = match product {
                Some(p) => (p.sku, p.name),
                None => (item.product_id.to_string(), item.product_id.to_string()),
            };
            details.push(ItemDetail {
                id: item.id,
                product_id: item.product_id,
                product_sku: sku,
                product_name: name,
                expected_quantity: item.expected_quantity,
                counted_quantity: item.counted_quantity,
                counted_at: item.counted_at,
                counted_by_name: item
                    .counted_by
                    .map(|id| counter_names.get(&id).cloned().unwrap_or_else(|| id.to_string())),
                notes: item.notes.clone(),
                variance: item.variance(),
                variance_percent: item.variance_percent(self.variance_decimals),
            });
        }

        Ok(StockTakingDetail {
            summary,
            notes: taking.notes,
            items: details,
        })
    }

    /// Most recently created takings as list summaries.
    pub async fn recent(&self, take: u64) -> Result<Vec<StockTakingSummary>> {
        let takings = self.store.recent(take).await?;
        self.summarize_all(takings).await
    }

    /// A worker's non-completed takings as list summaries.
    pub async fn for_worker(&self, user_id: Uuid) -> Result<Vec<StockTakingSummary>> {
        let takings = self.store.for_worker(user_id).await?;
        self.summarize_all(takings).await
    }

    /// Most recent discrepant items across completed takings.
    pub async fn discrepancy_alerts(&self, take: u64) -> Result<Vec<DiscrepancyAlert>> {
        let rows = self.store.discrepant_items(take).await?;

        let mut alerts = Vec::with_capacity(rows.len());
        for row in rows {
            let item = &row.item;
            let Some(counted) = item.counted_quantity else {
                continue;
            };
            let (sku, name) = match self.inventory.product(item.product_id).await? {
                Some(p) => (p.sku, p.name),
                None => (item.product_id.to_string(), item.product_id.to_string()),
            };
            alerts.push(DiscrepancyAlert {
                stock_taking_id: item.stock_taking_id,
                product_sku: sku,
                product_name: name,
                location_name: self.location_label(row.location_id).await?,
                expected_quantity: item.expected_quantity,
                counted_quantity: counted,
                variance: counted - item.expected_quantity,
                // Zero expected reports 0, never a division error.
                variance_percent: item.variance_percent(self.variance_decimals).unwrap_or(0.0),
            });
        }

        Ok(alerts)
    }

    /// Whether the user is assigned to the taking.
    pub async fn is_assigned(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self.store.is_assigned(id, user_id).await?)
    }

    async fn summarize_all(
        &self,
        takings: Vec<StockTaking>,
    ) -> Result<Vec<StockTakingSummary>> {
        let mut summaries = Vec::with_capacity(takings.len());
        for taking in takings {
            let items = self.store.items(taking.id).await?;
            summaries.push(self.summarize(&taking, &items).await?);
        }
        Ok(summaries)
    }

    async fn summarize(
        &self,
        taking: &StockTaking,
        items: &[StockTakingItem],
    ) -> Result<StockTakingSummary> {
        let location = self.inventory.location(taking.location_id).await?;
        let assignments = self.store.assignments(taking.id).await?;

        let mut user_ids: Vec<Uuid> = vec![taking.requested_by];
        user_ids.extend(assignments.iter().map(|a| a.user_id));
        let names = self.users.display_names(&user_ids).await?;
        let name_of =
            |id: Uuid, names: &HashMap<Uuid, String>| names.get(&id).cloned().unwrap_or_else(|| id.to_string());

        let (location_code, location_name) = match location {
            Some(l) => (l.code, l.name),
            None => (taking.location_id.to_string(), taking.location_id.to_string()),
        };

        Ok(StockTakingSummary {
            id: taking.id,
            location_code,
            location_name,
            status: taking.status,
            created_at: taking.created_at,
            started_at: taking.started_at,
            completed_at: taking.completed_at,
            requested_by_name: name_of(taking.requested_by, &names),
            assigned_workers: assignments
                .iter()
                .map(|a| name_of(a.user_id, &names))
                .collect(),
            total_items: items.len(),
            counted_items: items.iter().filter(|i| i.is_counted()).count(),
            discrepancy_count: items.iter().filter(|i| i.is_discrepant()).count(),
        })
    }

    async fn location_label(&self, id: Uuid) -> std::result::Result<String, StorageError> {
        Ok(self
            .inventory
            .location(id)
            .await?
            .map(|l| l.name)
            .unwrap_or_else(|| id.to_string()))
    }

    /// Re-read the status after a lost conditional update to report the
    /// actual state in the rejection.
    async fn stale_status(
        &self,
        id: Uuid,
        expected: StockTakingStatus,
    ) -> std::result::Result<LifecycleError, StorageError> {
        Ok(match self.store.get(id).await? {
            Some(current) => LifecycleError::InvalidStatus {
                expected,
                actual: current.status,
            },
            None => LifecycleError::NotFound(id),
        })
    }
}
