use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_db::StoreError;
use serde_json::json;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("missing or invalid bearer token")]
    Unauthorized,

    /// The requester is not allowed to act on this group or user.
    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::Store(StoreError::Forbidden) => StatusCode::FORBIDDEN,
            Self::Store(StoreError::NotFound(_)) | Self::Store(StoreError::NotInGroup) => {
                StatusCode::NOT_FOUND
            }
            Self::Store(StoreError::AlreadyInGroup) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
