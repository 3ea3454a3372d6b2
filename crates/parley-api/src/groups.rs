use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use parley_db::{ChatStore, StoreError};
use parley_types::api::{
    CreateGroupRequest, CreateGroupResponse, GroupResponse, PhotoResponse, RenameGroupRequest,
    SetPhotoRequest,
};
use parley_types::models::is_valid_identifier;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::middleware::Identity;
use crate::photos::group_photo_url;
use crate::state::AppState;

const MAX_GROUP_NAME_CHARS: usize = 32;

fn validate_name(raw: &str) -> ApiResult<String> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_GROUP_NAME_CHARS {
        return Err(ApiError::BadRequest("group name must be 1 to 32 characters"));
    }
    Ok(name.to_string())
}

/// Known, well-formed user id.
fn ensure_user(db: &dyn ChatStore, user_id: &str) -> ApiResult<()> {
    if !is_valid_identifier(user_id) {
        return Err(ApiError::BadRequest("invalid user id"));
    }
    if !db.user_exists(user_id)? {
        return Err(ApiError::Store(StoreError::NotFound(parley_db::Entity::User)));
    }
    Ok(())
}

fn ensure_member(db: &dyn ChatStore, group_id: i64, user_id: &str) -> ApiResult<()> {
    if !db.is_member(group_id, user_id)? {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(Identity(me)): Extension<Identity>,
    Json(req): Json<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = validate_name(&req.name)?;

    let group_id = state
        .run(move |db| {
            let mut members = Vec::with_capacity(req.members.len());
            for raw in &req.members {
                let id = raw.trim();
                if id.is_empty() {
                    continue;
                }
                ensure_user(db, id)?;
                members.push(id.to_string());
            }
            Ok(db.create_group(&me, &name, &members)?)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CreateGroupResponse { group_id })))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<Json<GroupResponse>> {
    let (group, members) = state
        .run(move |db| {
            ensure_member(db, group_id, &me)?;
            Ok((db.get_group(group_id)?, db.list_members(group_id)?))
        })
        .await?;

    Ok(Json(GroupResponse {
        id: group.id,
        name: group.name,
        photo_url: (!group.photo_ref.is_empty()).then(|| group_photo_url(group.id)),
        created_at: group.created_at,
        members,
    }))
}

/// Members may add others. Adding an existing member is not an error.
pub async fn add_member(
    State(state): State<AppState>,
    Path((group_id, member_id)): Path<(i64, String)>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<StatusCode> {
    state
        .run(move |db| {
            ensure_member(db, group_id, &me)?;
            ensure_user(db, &member_id)?;
            match db.add_member(group_id, &member_id) {
                Ok(()) => Ok(StatusCode::CREATED),
                Err(StoreError::AlreadyInGroup) => {
                    debug!("{} is already in group {}", member_id, group_id);
                    Ok(StatusCode::NO_CONTENT)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
}

/// Only the member themself may leave. Leaving twice is not an error.
pub async fn leave_group(
    State(state): State<AppState>,
    Path((group_id, member_id)): Path<(i64, String)>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<StatusCode> {
    if member_id != me {
        return Err(ApiError::Forbidden);
    }

    state
        .run(move |db| match db.remove_member(group_id, &me) {
            Ok(()) | Err(StoreError::NotInGroup) => Ok(StatusCode::NO_CONTENT),
            Err(e) => Err(e.into()),
        })
        .await
}

pub async fn rename_group(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    Extension(Identity(me)): Extension<Identity>,
    Json(req): Json<RenameGroupRequest>,
) -> ApiResult<StatusCode> {
    let name = validate_name(&req.name)?;

    state
        .run(move |db| {
            ensure_member(db, group_id, &me)?;
            Ok(db.rename_group(group_id, &name)?)
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_group_photo(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    Extension(Identity(me)): Extension<Identity>,
    Json(req): Json<SetPhotoRequest>,
) -> ApiResult<StatusCode> {
    let photo_ref = req.photo_ref.trim().to_string();
    if photo_ref.is_empty() {
        return Err(ApiError::BadRequest("photo reference is empty"));
    }

    state
        .run(move |db| {
            ensure_member(db, group_id, &me)?;
            Ok(db.set_group_photo(group_id, &photo_ref)?)
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_group_photo(
    State(state): State<AppState>,
    Path(group_id): Path<i64>,
    Extension(Identity(me)): Extension<Identity>,
) -> ApiResult<Json<PhotoResponse>> {
    let photo_ref = state
        .run(move |db| {
            ensure_member(db, group_id, &me)?;
            Ok(db.group_photo(group_id)?)
        })
        .await?;

    Ok(Json(PhotoResponse { photo_ref }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("  Friday lunch ").unwrap(), "Friday lunch");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"ä".repeat(32)).is_ok());
        assert!(validate_name(&"ä".repeat(33)).is_err());
    }
}
