//! Real-time event surface.
//!
//! Two logical channels connect the relay to the outside world:
//! - the producer side (the messaging client bridging the external chat), and
//! - the reviewer side (the operator picking a reply).
//!
//! Every frame on the wire is `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{CandidateList, Timestamp};

// =============================================================================
// Producer side
// =============================================================================

/// Events sent by the messaging client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
#[non_exhaustive]
pub enum ProducerEvent {
    /// A message arrived in the active external conversation.
    NewMessage(NewMessage),

    /// The operator switched to another external conversation.
    #[serde(alias = "chatChanged")]
    ConversationChanged {
        #[serde(alias = "new_chat_id")]
        new_conversation_id: String,
    },

    /// Workspace metadata (channel list, members); forwarded to the reviewer.
    WorkspaceUpdate(Value),

    /// The producer switched conversations itself; forwarded to the reviewer.
    SelectConversation(Value),

    /// Delivery status of a relayed reply; forwarded to the reviewer.
    MessageSent(Value),
}

impl ProducerEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ProducerEvent::NewMessage(_) => "newMessage",
            ProducerEvent::ConversationChanged { .. } => "conversationChanged",
            ProducerEvent::WorkspaceUpdate(_) => "workspaceUpdate",
            ProducerEvent::SelectConversation(_) => "selectConversation",
            ProducerEvent::MessageSent(_) => "messageSent",
        }
    }
}

/// Payload of a `newMessage` event.
///
/// Every field is optional on the wire so that missing fields surface as a
/// validation error to the sender rather than as an unparseable frame.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, alias = "hashed_sender_name")]
    pub sender_key: Option<String>,
}

/// Events sent to the messaging client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
#[non_exhaustive]
pub enum ProducerOutbound {
    /// The reviewer picked a reply; the producer posts it to the external chat.
    SendSelectedResponse {
        selected_reply: String,
        #[serde(default)]
        original_content: Option<String>,
        #[serde(default)]
        original_timestamp: Option<Timestamp>,
    },

    Ack { message: String },

    Error { message: String },

    /// The reviewer switched conversations.
    SelectConversation(Value),
}

impl ProducerOutbound {
    pub fn event_name(&self) -> &'static str {
        match self {
            ProducerOutbound::SendSelectedResponse { .. } => "sendSelectedResponse",
            ProducerOutbound::Ack { .. } => "ack",
            ProducerOutbound::Error { .. } => "error",
            ProducerOutbound::SelectConversation(_) => "selectConversation",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProducerOutbound::Error {
            message: message.into(),
        }
    }
}

// =============================================================================
// Reviewer side
// =============================================================================

/// Events sent by the reviewing surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
#[non_exhaustive]
pub enum ReviewerEvent {
    /// The reviewer picked (or edited) a reply.
    #[serde(alias = "submitSelectedResponse")]
    SelectionSubmitted(SelectionSubmitted),

    /// The reviewer switched conversations; forwarded to the producer.
    SelectConversation(Value),

    /// Receipt of a previously delivered event. Logged only.
    Ack(Value),
}

impl ReviewerEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ReviewerEvent::SelectionSubmitted(_) => "selectionSubmitted",
            ReviewerEvent::SelectConversation(_) => "selectConversation",
            ReviewerEvent::Ack(_) => "ack",
        }
    }
}

/// Payload of a `selectionSubmitted` event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSubmitted {
    #[serde(default, alias = "selected_response")]
    pub selected_reply: Option<String>,
    #[serde(default, alias = "currMessage")]
    pub original_content: Option<String>,
    #[serde(default, alias = "messageTimestamp")]
    pub original_timestamp: Option<Timestamp>,
    /// Narrows the lookup to the `(sender_key, timestamp)` pair when present.
    #[serde(default)]
    pub sender_key: Option<String>,
}

/// Events sent to the reviewing surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
#[non_exhaustive]
pub enum ReviewerOutbound {
    /// Drafted replies for an inbound message are ready for review.
    CandidatesReady {
        content: String,
        timestamp: Timestamp,
        candidates: CandidateList,
        sender_key: String,
    },

    /// Pending candidates are stale; the reviewer should discard them.
    ConversationChanged { new_conversation_id: String },

    SelectionAck { message: String },

    Error { message: String },

    WorkspaceUpdate(Value),

    SelectConversation(Value),

    MessageSent(Value),
}

impl ReviewerOutbound {
    pub fn event_name(&self) -> &'static str {
        match self {
            ReviewerOutbound::CandidatesReady { .. } => "candidatesReady",
            ReviewerOutbound::ConversationChanged { .. } => "conversationChanged",
            ReviewerOutbound::SelectionAck { .. } => "selectionAck",
            ReviewerOutbound::Error { .. } => "error",
            ReviewerOutbound::WorkspaceUpdate(_) => "workspaceUpdate",
            ReviewerOutbound::SelectConversation(_) => "selectConversation",
            ReviewerOutbound::MessageSent(_) => "messageSent",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ReviewerOutbound::Error {
            message: message.into(),
        }
    }
}
