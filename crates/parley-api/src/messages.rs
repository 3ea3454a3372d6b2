use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use parley_db::ChatStore;
use parley_db::models::{DEFAULT_PAGE_LIMIT, Page, ReactionRow};
use parley_types::api::{
    ForwardMessageRequest, MessageResponse, MessagesResponse, ReactionResponse,
    SendMessageRequest, SendMessageResponse,
};
use parley_types::models::{ConversationPeer, is_valid_identifier};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::middleware::Identity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageQuery {
    fn page(&self, max: u32) -> Page {
        Page::new(
            self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(max),
            self.offset.unwrap_or(0),
        )
    }
}

/// Listing a conversation also marks it read for the requester.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(peer): Path<ConversationPeer>,
    Query(query): Query<PageQuery>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<Json<MessagesResponse>> {
    let page = query.page(state.page_limit_max);

    let messages = state
        .run(move |db| {
            ensure_access(db, &me, &peer)?;
            match &peer {
                ConversationPeer::Direct(other) => {
                    db.mark_direct_conversation_read(&me, other)?;
                    let rows = db.list_direct_messages(&me, other, page)?;
                    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
                    let mut reactions = group_reactions(db.direct_reactions_for_messages(&ids)?);

                    rows.into_iter()
                        .map(|row| -> ApiResult<MessageResponse> {
                            let checkmark = if row.sender_id == me {
                                Some(db.direct_checkmark(row.id)?)
                            } else {
                                None
                            };
                            Ok(MessageResponse {
                                id: row.id,
                                sender: row.sender_id,
                                conversation: peer.clone(),
                                body: row.body,
                                created_at: row.created_at,
                                reactions: reactions.remove(&row.id).unwrap_or_default(),
                                checkmark,
                            })
                        })
                        .collect::<ApiResult<Vec<_>>>()
                }
                ConversationPeer::Group(group_id) => {
                    db.mark_group_conversation_read(*group_id, &me)?;
                    let rows = db.list_group_messages(*group_id, page)?;
                    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
                    let mut reactions = group_reactions(db.group_reactions_for_messages(&ids)?);

                    rows.into_iter()
                        .map(|row| -> ApiResult<MessageResponse> {
                            let checkmark = if row.sender_id == me {
                                Some(db.group_checkmark(row.group_id, row.id)?)
                            } else {
                                None
                            };
                            Ok(MessageResponse {
                                id: row.id,
                                sender: row.sender_id,
                                conversation: peer.clone(),
                                body: row.body,
                                created_at: row.created_at,
                                reactions: reactions.remove(&row.id).unwrap_or_default(),
                                checkmark,
                            })
                        })
                        .collect::<ApiResult<Vec<_>>>()
                }
            }
        })
        .await?;

    Ok(Json(MessagesResponse { messages }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(peer): Path<ConversationPeer>,
    Extension(Identity(me)): Extension<Identity>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.body.trim().is_empty() {
        return Err(ApiError::BadRequest("message body is empty"));
    }

    let id = state.run(move |db| send(db, &me, &peer, &req.body)).await?;

    Ok((StatusCode::CREATED, Json(SendMessageResponse { id })))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path((peer, message_id)): Path<(ConversationPeer, i64)>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<StatusCode> {
    state
        .run(move |db| {
            ensure_message(db, &me, &peer, message_id)?;
            match peer {
                ConversationPeer::Direct(_) => db.delete_direct_message(message_id, &me)?,
                ConversationPeer::Group(group_id) => {
                    db.delete_group_message(group_id, message_id, &me)?
                }
            }
            Ok(())
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Re-send the body of a message into another conversation, authored by
/// the requester.
pub async fn forward_message(
    State(state): State<AppState>,
    Path((peer, message_id)): Path<(ConversationPeer, i64)>,
    Extension(Identity(me)): Extension<Identity>,
    Json(req): Json<ForwardMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let to: ConversationPeer = req
        .to
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid forward target"))?;

    let id = state
        .run(move |db| {
            let body = ensure_message(db, &me, &peer, message_id)?;
            send(db, &me, &to, &body)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SendMessageResponse { id })))
}

// -- Helpers --

/// Groups require membership; direct peers must be well-formed ids.
pub(crate) fn ensure_access(db: &dyn ChatStore, me: &str, peer: &ConversationPeer) -> ApiResult<()> {
    match peer {
        ConversationPeer::Group(group_id) => {
            if !db.is_member(*group_id, me)? {
                return Err(ApiError::Forbidden);
            }
        }
        ConversationPeer::Direct(user_id) => {
            if !is_valid_identifier(user_id) {
                return Err(ApiError::BadRequest("invalid peer id"));
            }
        }
    }
    Ok(())
}

/// Check access and that the message belongs to this conversation.
/// Returns its body.
pub(crate) fn ensure_message(
    db: &dyn ChatStore,
    me: &str,
    peer: &ConversationPeer,
    message_id: i64,
) -> ApiResult<String> {
    ensure_access(db, me, peer)?;
    let body = match peer {
        ConversationPeer::Direct(other) => {
            db.get_direct_message_in_conversation(me, other, message_id)?.body
        }
        ConversationPeer::Group(group_id) => {
            db.get_group_message_in_group(*group_id, message_id)?.body
        }
    };
    Ok(body)
}

fn send(db: &dyn ChatStore, me: &str, peer: &ConversationPeer, body: &str) -> ApiResult<i64> {
    ensure_access(db, me, peer)?;
    let id = match peer {
        ConversationPeer::Direct(other) => db.create_direct_message(me, other, body)?,
        ConversationPeer::Group(group_id) => db.create_group_message(*group_id, me, body)?,
    };
    Ok(id)
}

fn group_reactions(rows: Vec<ReactionRow>) -> HashMap<i64, Vec<ReactionResponse>> {
    let mut by_message: HashMap<i64, Vec<ReactionResponse>> = HashMap::new();
    for r in rows {
        by_message.entry(r.message_id).or_default().push(ReactionResponse {
            user_id: r.user_id,
            reaction: r.reaction,
        });
    }
    by_message
}
