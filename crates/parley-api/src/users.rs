use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use parley_types::api::{PhotoResponse, SessionResponse, SetNicknameRequest, SetPhotoRequest};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::middleware::Identity;
use crate::state::AppState;

const MAX_NICKNAME_CHARS: usize = 32;

/// Make the requester known to the user directory.
pub async fn open_session(
    State(state): State<AppState>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<impl IntoResponse> {
    let user_id = me.clone();
    let created = state.run(move |db| Ok(db.register_user(&me)?)).await?;

    let status = if created {
        info!("Registered user {}", user_id);
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(SessionResponse { user_id, created })))
}

pub async fn set_nickname(
    State(state): State<AppState>,
    Extension(Identity(me)): Extension<Identity>,
    Json(req): Json<SetNicknameRequest>,
) -> ApiResult<StatusCode> {
    let nickname = req.nickname.trim().to_string();
    if nickname.is_empty() || nickname.chars().count() > MAX_NICKNAME_CHARS {
        return Err(ApiError::BadRequest("nickname must be 1 to 32 characters"));
    }

    state
        .run(move |db| Ok(db.set_nickname(&me, &nickname)?))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_my_photo(
    State(state): State<AppState>,
    Extension(Identity(me)): Extension<Identity>,
    Json(req): Json<SetPhotoRequest>,
) -> ApiResult<StatusCode> {
    let photo_ref = req.photo_ref.trim().to_string();
    if photo_ref.is_empty() {
        return Err(ApiError::BadRequest("photo reference is empty"));
    }

    state
        .run(move |db| Ok(db.set_user_photo(&me, &photo_ref)?))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_user_photo(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<PhotoResponse>> {
    let photo_ref = state.run(move |db| Ok(db.user_photo(&user_id)?)).await?;
    Ok(Json(PhotoResponse { photo_ref }))
}
