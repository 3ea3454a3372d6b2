//! Component interfaces. `Database` implements all of them; callers depend
//! on the traits so alternative stores can be injected.

use parley_types::models::Checkmark;

use crate::error::Result;
use crate::models::{
    ConversationSummary, DirectMessageRow, GroupMessageRow, GroupRow, Page, ReactionRow,
};

/// Message creation, listing, lookup and soft deletion.
pub trait MessageStore: Send + Sync {
    /// Store a direct message and its unread receipt atomically.
    fn create_direct_message(&self, sender: &str, receiver: &str, body: &str) -> Result<i64>;

    /// Non-deleted messages between `a` and `b`, newest first.
    fn list_direct_messages(&self, a: &str, b: &str, page: Page) -> Result<Vec<DirectMessageRow>>;

    /// The message, if it was exchanged between exactly `a` and `b`.
    fn get_direct_message_in_conversation(
        &self,
        a: &str,
        b: &str,
        message_id: i64,
    ) -> Result<DirectMessageRow>;

    /// Tombstone a message. Only its sender may do so; repeating it is a no-op.
    fn delete_direct_message(&self, message_id: i64, requester: &str) -> Result<()>;

    /// Store a group message and one unread receipt per other member atomically.
    fn create_group_message(&self, group_id: i64, sender: &str, body: &str) -> Result<i64>;

    fn list_group_messages(&self, group_id: i64, page: Page) -> Result<Vec<GroupMessageRow>>;

    fn get_group_message_in_group(&self, group_id: i64, message_id: i64) -> Result<GroupMessageRow>;

    fn delete_group_message(&self, group_id: i64, message_id: i64, requester: &str) -> Result<()>;
}

/// One reaction per user per message; the latest one wins.
pub trait ReactionStore: Send + Sync {
    fn set_direct_reaction(&self, message_id: i64, user_id: &str, reaction: &str) -> Result<()>;
    fn remove_direct_reaction(&self, message_id: i64, user_id: &str) -> Result<()>;
    fn list_direct_reactions(&self, message_id: i64) -> Result<Vec<ReactionRow>>;
    fn direct_reactions_for_messages(&self, message_ids: &[i64]) -> Result<Vec<ReactionRow>>;

    fn set_group_reaction(
        &self,
        group_id: i64,
        message_id: i64,
        user_id: &str,
        reaction: &str,
    ) -> Result<()>;
    fn remove_group_reaction(&self, group_id: i64, message_id: i64, user_id: &str) -> Result<()>;
    fn list_group_reactions(&self, group_id: i64, message_id: i64) -> Result<Vec<ReactionRow>>;
    fn group_reactions_for_messages(&self, message_ids: &[i64]) -> Result<Vec<ReactionRow>>;
}

/// Delivery and read state per recipient.
pub trait ReceiptStore: Send + Sync {
    /// Mark everything `peer` sent to `reader` as read. Returns how many
    /// receipts changed.
    fn mark_direct_conversation_read(&self, reader: &str, peer: &str) -> Result<usize>;
    fn mark_group_conversation_read(&self, group_id: i64, reader: &str) -> Result<usize>;
    fn direct_checkmark(&self, message_id: i64) -> Result<Checkmark>;
    fn group_checkmark(&self, group_id: i64, message_id: i64) -> Result<Checkmark>;
}

pub trait MembershipStore: Send + Sync {
    fn create_group(&self, creator: &str, name: &str, members: &[String]) -> Result<i64>;
    fn add_member(&self, group_id: i64, user_id: &str) -> Result<()>;
    fn remove_member(&self, group_id: i64, user_id: &str) -> Result<()>;
    fn rename_group(&self, group_id: i64, name: &str) -> Result<()>;
    fn set_group_photo(&self, group_id: i64, photo_ref: &str) -> Result<()>;
    fn is_member(&self, group_id: i64, user_id: &str) -> Result<bool>;
    fn get_group(&self, group_id: i64) -> Result<GroupRow>;
    fn list_groups_for_user(&self, user_id: &str) -> Result<Vec<GroupRow>>;
    fn list_members(&self, group_id: i64) -> Result<Vec<String>>;
    fn group_photo(&self, group_id: i64) -> Result<String>;
}

/// The slice of user data this service keeps: display names and photo
/// references. Users themselves are created elsewhere.
pub trait DirectoryStore: Send + Sync {
    /// Returns `false` if the user was already known.
    fn register_user(&self, user_id: &str) -> Result<bool>;
    fn set_nickname(&self, user_id: &str, nickname: &str) -> Result<()>;
    fn nickname(&self, user_id: &str) -> Result<String>;
    fn user_exists(&self, user_id: &str) -> Result<bool>;
    fn set_user_photo(&self, user_id: &str, photo_ref: &str) -> Result<()>;
    fn user_photo(&self, user_id: &str) -> Result<String>;
}

pub trait ConversationStore: Send + Sync {
    /// Direct peers and groups of `viewer`, most recent activity first.
    fn list_conversations(&self, viewer: &str) -> Result<Vec<ConversationSummary>>;
}

/// Display-name lookup used when building the conversation list.
pub trait NicknameResolver: Send + Sync {
    fn nickname(&self, user_id: &str) -> Result<String>;
}

pub trait ChatStore:
    MessageStore + ReactionStore + ReceiptStore + MembershipStore + DirectoryStore + ConversationStore
{
    fn ping(&self) -> Result<()>;
}

impl ChatStore for crate::Database {
    fn ping(&self) -> Result<()> {
        crate::Database::ping(self)
    }
}
