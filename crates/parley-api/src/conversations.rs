use axum::{
    Extension, Json,
    extract::State,
};
use parley_types::api::{ConversationResponse, ConversationsResponse};

use crate::error::ApiResult;
use crate::middleware::Identity;
use crate::photos::peer_photo_url;
use crate::state::AppState;

/// Direct chats and groups of the requester, most recent first.
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<Json<ConversationsResponse>> {
    let summaries = state
        .run(move |db| Ok(db.list_conversations(&me)?))
        .await?;

    let conversations = summaries
        .into_iter()
        .map(|c| ConversationResponse {
            photo_url: peer_photo_url(&c.peer),
            peer: c.peer,
            is_group: c.is_group,
            name: c.name,
            last_message_at: c.last_activity,
            last_message_preview: c.preview,
        })
        .collect();

    Ok(Json(ConversationsResponse { conversations }))
}
