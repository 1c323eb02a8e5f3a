use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use skillswap_types::events::GatewayEvent;

/// Tracks connected users and delivers targeted events to their live
/// session. Delivery is at-most-once, fire-and-forget; callers that need a
/// fallback (push notifications) key off the bool `send_to_user` returns.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    /// A newer connection for the same user takes over the slot.
    pub async fn register_user_channel(
        &self,
        user_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .user_channels
            .write()
            .await
            .insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches.
    /// A stale disconnect must not tear down a newer connection's channel.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&user_id);
            }
        }
    }

    /// Send a targeted event to a specific user. Returns whether a live
    /// channel accepted the event.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> bool {
        let channels = self.inner.user_channels.read().await;
        match channels.get(&user_id) {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub async fn is_connected(&self, user_id: Uuid) -> bool {
        self.inner.user_channels.read().await.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillswap_types::events::GatewayEvent;

    #[tokio::test]
    async fn undelivered_when_not_connected() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let event = GatewayEvent::ConversationDeleted {
            conversation_id: Uuid::new_v4(),
        };
        assert!(!dispatcher.send_to_user(user, event).await);
    }

    #[tokio::test]
    async fn delivered_to_registered_channel() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let (_conn, mut rx) = dispatcher.register_user_channel(user).await;

        let conversation_id = Uuid::new_v4();
        let delivered = dispatcher
            .send_to_user(user, GatewayEvent::ConversationDeleted { conversation_id })
            .await;
        assert!(delivered);

        match rx.recv().await {
            Some(GatewayEvent::ConversationDeleted { conversation_id: got }) => {
                assert_eq!(got, conversation_id)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn stale_conn_cannot_unregister_newer_one() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        let (old_conn, _old_rx) = dispatcher.register_user_channel(user).await;
        let (_new_conn, mut new_rx) = dispatcher.register_user_channel(user).await;

        // The old connection disconnecting must not tear down the new channel.
        dispatcher.unregister_user_channel(user, old_conn).await;
        assert!(dispatcher.is_connected(user).await);

        let delivered = dispatcher
            .send_to_user(
                user,
                GatewayEvent::ConversationDeleted {
                    conversation_id: Uuid::new_v4(),
                },
            )
            .await;
        assert!(delivered);
        assert!(new_rx.recv().await.is_some());
    }
}
