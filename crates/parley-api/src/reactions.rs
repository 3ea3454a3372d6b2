use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use parley_types::api::{ReactionResponse, ReactionsResponse, SetReactionRequest};
use parley_types::models::ConversationPeer;

use crate::error::{ApiError, ApiResult};
use crate::messages::ensure_message;
use crate::middleware::Identity;
use crate::state::AppState;

const MAX_REACTION_BYTES: usize = 16;

fn validate_reaction(raw: &str) -> ApiResult<String> {
    let reaction = raw.trim();
    if reaction.is_empty() || reaction.len() > MAX_REACTION_BYTES {
        return Err(ApiError::BadRequest("reaction must be 1 to 16 bytes"));
    }
    Ok(reaction.to_string())
}

/// Set or replace the requester's reaction.
pub async fn set_reaction(
    State(state): State<AppState>,
    Path((peer, message_id)): Path<(ConversationPeer, i64)>,
    Extension(Identity(me)): Extension<Identity>,
    Json(req): Json<SetReactionRequest>,
) -> ApiResult<StatusCode> {
    let reaction = validate_reaction(&req.reaction)?;

    state
        .run(move |db| {
            ensure_message(db, &me, &peer, message_id)?;
            match peer {
                ConversationPeer::Direct(_) => db.set_direct_reaction(message_id, &me, &reaction)?,
                ConversationPeer::Group(group_id) => {
                    db.set_group_reaction(group_id, message_id, &me, &reaction)?
                }
            }
            Ok(())
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    Path((peer, message_id)): Path<(ConversationPeer, i64)>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<StatusCode> {
    state
        .run(move |db| {
            ensure_message(db, &me, &peer, message_id)?;
            match peer {
                ConversationPeer::Direct(_) => db.remove_direct_reaction(message_id, &me)?,
                ConversationPeer::Group(group_id) => {
                    db.remove_group_reaction(group_id, message_id, &me)?
                }
            }
            Ok(())
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_reactions(
    State(state): State<AppState>,
    Path((peer, message_id)): Path<(ConversationPeer, i64)>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<Json<ReactionsResponse>> {
    let rows = state
        .run(move |db| {
            ensure_message(db, &me, &peer, message_id)?;
            let rows = match peer {
                ConversationPeer::Direct(_) => db.list_direct_reactions(message_id)?,
                ConversationPeer::Group(group_id) => db.list_group_reactions(group_id, message_id)?,
            };
            Ok(rows)
        })
        .await?;

    let reactions = rows
        .into_iter()
        .map(|r| ReactionResponse {
            user_id: r.user_id,
            reaction: r.reaction,
        })
        .collect();

    Ok(Json(ReactionsResponse { reactions }))
}
