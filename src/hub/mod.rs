//! In-memory notification hub.
//!
//! Process-wide registry mapping a user id to the delivery channels of
//! that user's live connections (one per open client). Delivery is
//! best-effort and non-durable: no acknowledgement, no retry, and no
//! replay for clients that were disconnected at publish time. Durable
//! state lives in the notification store; the hub is a convenience layer.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::Notification;


/// Sending half of one connection's delivery channel.
pub type NotificationSender = mpsc::UnboundedSender<Arc<Notification>>;

/// Process-wide user -> channels registry.
///
/// Safe under concurrent subscribe/unsubscribe/send from unrelated
/// request tasks; the critical sections only touch the map, delivery
/// happens outside the lock.
#[derive(Default)]
pub struct NotificationHub {
    connections: RwLock<HashMap<Uuid, Vec<NotificationSender>>>,
}

impl NotificationHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delivery channel under a user id. Multiple channels
    /// per user are expected (multiple open tabs/devices).
    pub fn subscribe(&self, user_id: Uuid, sender: NotificationSender) {
        self.write_map().entry(user_id).or_default().push(sender);
    }

    /// Remove exactly that channel from the user's registration. When no
    /// channels remain the user entry is dropped entirely, so the map
    /// never accumulates empty entries.
    pub fn unsubscribe(&self, user_id: Uuid, sender: &NotificationSender) {
        let mut map = self.write_map();
        if let Some(channels) = map.get_mut(&user_id) {
            channels.retain(|c| !c.same_channel(sender));
            if channels.is_empty() {
                map.remove(&user_id);
            }
        }
    }

    /// Deliver to every channel currently registered for the user.
    /// Closed channels are ignored and never block delivery to others.
    pub async fn send_to_user(&self, user_id: Uuid, notification: Arc<Notification>) {
        let channels: Vec<NotificationSender> = {
            let map = self.read_map();
            match map.get(&user_id) {
                Some(channels) => channels.clone(),
                None => return,
            }
        };

        for channel in channels {
            if channel.send(Arc::clone(&notification)).is_err() {
                debug!(user_id = %user_id, "Dropped notification for closed channel");
            }
        }
    }

    /// Fan [`send_to_user`](Self::send_to_user) out across users.
    pub async fn send_to_users(&self, user_ids: &[Uuid], notification: Arc<Notification>) {
        for user_id in user_ids {
            self.send_to_user(*user_id, Arc::clone(&notification)).await;
        }
    }

    /// Scoped registration: the returned [`Subscription`] receives the
    /// user's notifications and deregisters its channel when dropped,
    /// on every exit path.
    pub fn attach(self: &Arc<Self>, user_id: Uuid) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribe(user_id, sender.clone());
        Subscription {
            hub: Arc::clone(self),
            user_id,
            sender,
            receiver,
        }
    }

    /// Number of channels currently registered for a user.
    pub fn connection_count(&self, user_id: Uuid) -> usize {
        self.read_map().get(&user_id).map_or(0, Vec::len)
    }

    // A poisoned lock still holds a valid map; recover the guard.
    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Vec<NotificationSender>>> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Vec<NotificationSender>>> {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// One connection's registration with the hub.
///
/// Holds the receiving half of the channel; dropping the subscription
/// unsubscribes the channel, which is what keeps the hub from fanning
/// out to dead receivers after a client disconnects.
pub struct Subscription {
    hub: Arc<NotificationHub>,
    user_id: Uuid,
    sender: NotificationSender,
    receiver: mpsc::UnboundedReceiver<Arc<Notification>>,
}

impl Subscription {
    /// Wait for the next notification published to this user. Returns
    /// `None` once the hub side is gone.
    pub async fn recv(&mut self) -> Option<Arc<Notification>> {
        self.receiver.recv().await
    }

    /// Non-blocking receive, used by stream adapters.
    pub fn poll_recv(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Arc<Notification>>> {
        self.receiver.poll_recv(cx)
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.user_id, &self.sender);
    }
}
