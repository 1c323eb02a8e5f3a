use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Notification};

/// Events sent over the WebSocket gateway. All of these are targeted at a
/// single user's live session; there is no broadcast fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, username: String },

    /// A new message arrived in one of your conversations
    #[serde(rename = "newMessage")]
    NewMessage { message: Message },

    /// The sender deleted a message you could see
    #[serde(rename = "messageDeleted")]
    MessageDeleted {
        conversation_id: Uuid,
        message_id: Uuid,
    },

    /// A conversation you were part of was deleted
    #[serde(rename = "conversationDeleted")]
    ConversationDeleted { conversation_id: Uuid },

    /// Something happened that produced a persistent notification
    #[serde(rename = "new_notification")]
    NewNotification { notification: Notification },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}
