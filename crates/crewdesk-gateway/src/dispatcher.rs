use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

use crewdesk_types::events::GatewayEvent;

/// Manages all connected clients and fans out new-message events.
///
/// Delivery is at-most-once and best-effort: nothing is retried or replayed,
/// a disconnected subscriber just misses the push and catches up by paging.
/// Durability lives in the message store, never here.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast bus for project-room events; each connection filters
    /// against its own authorized subscription set.
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Per-user targeted send channels for private delivery:
    /// member_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<i64, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                user_channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to the room-event bus. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish a room event to every connection. Send errors (no receivers)
    /// are ignored: the message is already durable.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    pub async fn register_user_channel(
        &self,
        member_id: i64,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .user_channels
            .write()
            .await
            .insert(member_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user channel, but only if conn_id matches — a
    /// reconnect must not tear down its successor.
    pub async fn unregister_user_channel(&self, member_id: i64, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&member_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&member_id);
            }
        }
    }

    /// Send a targeted event to a specific member. A member without a live
    /// connection simply misses the push.
    pub async fn send_to_user(&self, member_id: i64, event: GatewayEvent) {
        let channels = self.inner.user_channels.read().await;
        if let Some((_, tx)) = channels.get(&member_id) {
            let _ = tx.send(event);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
