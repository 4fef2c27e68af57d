//! Per-user notification feed.
//!
//! Exposes a hub subscription as a long-lived stream of
//! text-event-stream-shaped frames. The stream lives until the consumer
//! drops it (client disconnect); dropping deregisters the underlying
//! channel, so a dropped connection never leaves a dead receiver behind
//! in the hub.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use uuid::Uuid;

use crate::domain::Notification;
use crate::hub::{NotificationHub, Subscription};

/// Stream of notifications published to one user.
///
/// Yields each notification delivered through the hub while the
/// subscription is live. Pending until the next event arrives; ends only
/// if the hub is dropped.
pub struct NotificationStream {
    subscription: Subscription,
}

impl NotificationStream {
    /// Attach a new stream for the user.
    pub fn attach(hub: &Arc<NotificationHub>, user_id: Uuid) -> Self {
        Self {
            subscription: hub.attach(user_id),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.subscription.user_id()
    }

    /// The same stream rendered as SSE frames.
    pub fn into_frames(self) -> impl Stream<Item = String> {
        futures::StreamExt::map(self, |notification| render_frame(&notification))
    }
}

impl Stream for NotificationStream {
    type Item = Arc<Notification>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().subscription.poll_recv(cx)
    }
}

/// Render one notification as a text-event-stream frame.
///
/// The data line carries the notification as JSON; presentation is the
/// consumer's concern.
pub fn render_frame(notification: &Notification) -> String {
    // Serialization of a plain record with string/number fields cannot
    // fail; fall back to an empty object rather than panicking mid-feed.
    let data = serde_json::to_string(notification).unwrap_or_else(|_| "{}".to_string());
    format!("event: notification\ndata: {}\n\n", data)
}
