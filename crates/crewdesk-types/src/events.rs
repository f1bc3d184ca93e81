use serde::{Deserialize, Serialize};

use crate::api::{PrivateMessageView, RoomMessageView};

/// Events pushed over the WebSocket gateway. The payload shape matches the
/// REST response for the same message; the event is a notification hint,
/// never the source of truth — a disconnected client catches up by paging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { member_id: i64 },

    /// A new message was posted to a project room
    RoomMessageCreate {
        project_id: i64,
        message: RoomMessageView,
    },

    /// A new private message addressed to this connection's user
    PrivateMessageCreate { message: PrivateMessageView },
}

impl GatewayEvent {
    /// Returns the project id if this event is scoped to a project room.
    /// Room events go over the broadcast bus and are filtered against each
    /// connection's subscription set; everything else is delivered over the
    /// per-user channel.
    pub fn project_id(&self) -> Option<i64> {
        match self {
            Self::RoomMessageCreate { project_id, .. } => Some(*project_id),
            Self::Ready { .. } | Self::PrivateMessageCreate { .. } => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Subscribe to room events for specific projects. Membership is
    /// re-checked against the database for every id at subscribe time.
    Subscribe { project_ids: Vec<i64> },

    /// Drop room subscriptions.
    Unsubscribe { project_ids: Vec<i64> },
}
