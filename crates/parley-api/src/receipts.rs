use axum::{
    Extension, Json,
    extract::{Path, State},
};
use parley_types::api::{CheckmarkResponse, MarkReadResponse};
use parley_types::models::ConversationPeer;

use crate::error::ApiResult;
use crate::messages::{ensure_access, ensure_message};
use crate::middleware::Identity;
use crate::state::AppState;

pub async fn get_checkmark(
    State(state): State<AppState>,
    Path((peer, message_id)): Path<(ConversationPeer, i64)>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<Json<CheckmarkResponse>> {
    let checkmark = state
        .run(move |db| {
            ensure_message(db, &me, &peer, message_id)?;
            let checkmark = match peer {
                ConversationPeer::Direct(_) => db.direct_checkmark(message_id)?,
                ConversationPeer::Group(group_id) => db.group_checkmark(group_id, message_id)?,
            };
            Ok(checkmark)
        })
        .await?;

    Ok(Json(CheckmarkResponse {
        checkmark,
        ticks: checkmark.ticks(),
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(peer): Path<ConversationPeer>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<Json<MarkReadResponse>> {
    let marked = state
        .run(move |db| {
            ensure_access(db, &me, &peer)?;
            let marked = match &peer {
                ConversationPeer::Direct(other) => db.mark_direct_conversation_read(&me, other)?,
                ConversationPeer::Group(group_id) => {
                    db.mark_group_conversation_read(*group_id, &me)?
                }
            };
            Ok(marked)
        })
        .await?;

    Ok(Json(MarkReadResponse { marked }))
}
