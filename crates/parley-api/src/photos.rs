//! Photo bytes live in external blob storage; only references are kept.
//! These are the URLs clients fetch them through.

use parley_types::models::ConversationPeer;

pub fn user_photo_url(user_id: &str) -> String {
    format!("/users/{user_id}/photo")
}

pub fn group_photo_url(group_id: i64) -> String {
    format!("/groups/{group_id}/photo")
}

pub fn peer_photo_url(peer: &ConversationPeer) -> String {
    match peer {
        ConversationPeer::Direct(user_id) => user_photo_url(user_id),
        ConversationPeer::Group(group_id) => group_photo_url(*group_id),
    }
}
