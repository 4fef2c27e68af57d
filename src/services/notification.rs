//! Notification service.
//!
//! One logical "notify" operation is two steps: persist the record
//! (durable source of truth), then push it through the hub (best-effort
//! convenience). Hub delivery can silently drop - a user with no live
//! connection simply re-reads unread state on reconnect - and a delivery
//! failure never rolls back the persisted record.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::domain::{Notification, NotificationDraft};
use crate::hub::NotificationHub;
use crate::interfaces::{NotificationStore, StorageError};

/// Persistence plus hub delivery as one operation, and the read side of
/// the per-user notification feed.
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    hub: Arc<NotificationHub>,
}

impl NotificationService {
    /// Create a new notification service.
    pub fn new(store: Arc<dyn NotificationStore>, hub: Arc<NotificationHub>) -> Self {
        Self { store, hub }
    }

    /// The hub this service delivers through.
    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    /// Persist one notification, then deliver it to the user's live
    /// connections.
    pub async fn notify(
        &self,
        user_id: Uuid,
        draft: NotificationDraft,
    ) -> Result<Notification, StorageError> {
        let notification = Notification::new(user_id, draft);
        self.store.insert(&notification).await?;

        debug!(
            user_id = %user_id,
            kind = notification.kind.as_str(),
            "Notification persisted, pushing to hub"
        );
        self.hub
            .send_to_user(user_id, Arc::new(notification.clone()))
            .await;

        Ok(notification)
    }

    /// Bulk variant: one batch write, then per-user delivery.
    pub async fn notify_many(
        &self,
        user_ids: &[Uuid],
        draft: NotificationDraft,
    ) -> Result<Vec<Notification>, StorageError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let notifications: Vec<Notification> = user_ids
            .iter()
            .map(|&user_id| Notification::new(user_id, draft.clone()))
            .collect();
        self.store.insert_batch(&notifications).await?;

        for notification in &notifications {
            self.hub
                .send_to_user(notification.user_id, Arc::new(notification.clone()))
                .await;
        }

        Ok(notifications)
    }

    /// Most recent notifications for a user, newest first.
    pub async fn recent(&self, user_id: Uuid, take: u64) -> Result<Vec<Notification>, StorageError> {
        self.store.for_user(user_id, take).await
    }

    /// Count of unread notifications for a user.
    pub async fn unread_count(&self, user_id: Uuid) -> Result<u64, StorageError> {
        self.store.unread_count(user_id).await
    }

    /// Mark one notification read. A notification owned by another user
    /// is left untouched without an error, so callers cannot probe for
    /// the existence of other users' notifications.
    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<(), StorageError> {
        self.store.mark_read(notification_id, user_id).await
    }

    /// Mark every unread notification owned by the user as read.
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<(), StorageError> {
        self.store.mark_all_read(user_id).await
    }
}
