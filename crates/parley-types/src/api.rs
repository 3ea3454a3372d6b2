use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Checkmark, ConversationPeer};

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: String,
    /// `true` the first time this identifier is seen.
    pub created: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetNicknameRequest {
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetPhotoRequest {
    pub photo_ref: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoResponse {
    pub photo_ref: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForwardMessageRequest {
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub sender: String,
    /// The user id for direct chats, `g-<id>` for groups.
    pub conversation: ConversationPeer,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<ReactionResponse>,
    /// Only present on messages the requester sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkmark: Option<Checkmark>,
}

/// Wrapped in an object rather than returned as a top-level array.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageResponse>,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetReactionRequest {
    pub reaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub user_id: String,
    pub reaction: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReactionsResponse {
    pub reactions: Vec<ReactionResponse>,
}

// -- Receipts --

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckmarkResponse {
    pub checkmark: Checkmark,
    pub ticks: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub marked: usize,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGroupResponse {
    pub group_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameGroupRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupResponse {
    pub id: i64,
    pub name: String,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub members: Vec<String>,
}

// -- Conversations --

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub peer: ConversationPeer,
    pub is_group: bool,
    pub name: String,
    pub photo_url: String,
    pub last_message_at: DateTime<Utc>,
    pub last_message_preview: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationResponse>,
}
