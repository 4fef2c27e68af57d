//! Notification persistence interface.

use async_trait::async_trait;
use uuid::Uuid;

use super::stock_taking_store::Result;
use crate::domain::Notification;

/// Interface for notification persistence.
///
/// Records are append-only apart from the read flag, which only ever
/// moves false -> true.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist one notification.
    async fn insert(&self, notification: &Notification) -> Result<()>;

    /// Persist a batch of notifications as one atomic write.
    async fn insert_batch(&self, notifications: &[Notification]) -> Result<()>;

    /// Most recent notifications for a user, newest first.
    async fn for_user(&self, user_id: Uuid, take: u64) -> Result<Vec<Notification>>;

    /// Count of unread notifications for a user.
    async fn unread_count(&self, user_id: Uuid) -> Result<u64>;

    /// Set the read flag, but only if the notification belongs to the
    /// user; otherwise a silent no-op. Idempotent on already-read rows.
    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<()>;

    /// Set the read flag on every unread notification owned by the user.
    async fn mark_all_read(&self, user_id: Uuid) -> Result<()>;
}
