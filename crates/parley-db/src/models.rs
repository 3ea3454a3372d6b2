//! Database row types, mapped directly from SQLite rows.
//! Distinct from parley-types API models to keep the DB layer independent.
use chrono::{DateTime, Utc};
use parley_types::models::ConversationPeer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessageRow {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMessageRow {
    pub id: i64,
    pub group_id: i64,
    pub sender_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub id: i64,
    pub name: String,
    /// Empty until a photo is set.
    pub photo_ref: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRow {
    pub message_id: i64,
    pub user_id: String,
    pub reaction: String,
    pub created_at: DateTime<Utc>,
}

/// One entry of the unified conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub peer: ConversationPeer,
    pub is_group: bool,
    pub name: String,
    pub photo_ref: Option<String>,
    pub last_activity: DateTime<Utc>,
    pub preview: String,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}
