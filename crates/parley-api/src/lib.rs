pub mod conversations;
pub mod error;
pub mod groups;
pub mod health;
pub mod messages;
pub mod middleware;
pub mod photos;
pub mod reactions;
pub mod receipts;
pub mod state;
pub mod users;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

pub use error::{ApiError, ApiResult};
pub use middleware::{BearerIdentity, Identity, IdentityResolver};
pub use state::{AppState, AppStateInner};

/// Every route of the service. Only `/liveness` is reachable without a
/// bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/liveness", get(health::liveness))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/session", post(users::open_session))
        .route("/me/nickname", put(users::set_nickname))
        .route("/me/photo", put(users::set_my_photo))
        .route("/users/{user_id}/photo", get(users::get_user_photo))
        .route("/conversations", get(conversations::list_conversations))
        .route(
            "/chats/{peer}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route(
            "/chats/{peer}/messages/{message_id}",
            delete(messages::delete_message),
        )
        .route(
            "/chats/{peer}/messages/{message_id}/forward",
            post(messages::forward_message),
        )
        .route(
            "/chats/{peer}/messages/{message_id}/reactions",
            get(reactions::list_reactions)
                .put(reactions::set_reaction)
                .delete(reactions::remove_reaction),
        )
        .route(
            "/chats/{peer}/messages/{message_id}/checkmark",
            get(receipts::get_checkmark),
        )
        .route("/chats/{peer}/read", post(receipts::mark_read))
        .route("/groups", post(groups::create_group))
        .route("/groups/{group_id}", get(groups::get_group))
        .route("/groups/{group_id}/name", put(groups::rename_group))
        .route(
            "/groups/{group_id}/photo",
            get(groups::get_group_photo).put(groups::set_group_photo),
        )
        .route(
            "/groups/{group_id}/members/{member_id}",
            put(groups::add_member).delete(groups::leave_group),
        )
        .layer(from_fn_with_state(state.clone(), middleware::require_identity))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
