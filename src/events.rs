use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Author of a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Bot => "Assistant",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Role::User => "👤",
            Role::Bot => "🤖",
        }
    }
}

/// Identifier derived from the creation time in milliseconds.
///
/// Ids are strictly increasing within a conversation: a message created in
/// the same millisecond as its predecessor gets `previous + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(i64);

impl MessageId {
    pub fn next(previous: Option<MessageId>, now: DateTime<Utc>) -> Self {
        let millis = now.timestamp_millis();
        match previous {
            Some(MessageId(last)) if last >= millis => MessageId(last + 1),
            _ => MessageId(millis),
        }
    }
}

/// A single message shown in the chat panel
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Prior message as sent to the backend, without its identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub role: Role,
    pub text: String,
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            text: message.text.clone(),
        }
    }
}
