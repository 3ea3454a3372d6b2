use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use parley_types::models::is_valid_identifier;

use crate::error::ApiError;
use crate::state::AppState;

/// The canonical user id of the requester, inserted by `require_identity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

/// Turns a bearer token into a user id.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, token: &str) -> Option<String>;
}

/// Treats the token itself as the user id. Tokens are not secrets here:
/// credential issuance lives outside this service.
pub struct BearerIdentity;

impl IdentityResolver for BearerIdentity {
    fn resolve(&self, token: &str) -> Option<String> {
        is_valid_identifier(token).then(|| token.to_string())
    }
}

/// Resolve the Authorization header into an `Identity` extension.
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let user_id = state
        .identity
        .resolve(token.trim())
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(Identity(user_id));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_identity_accepts_only_identifiers() {
        assert_eq!(BearerIdentity.resolve("alice"), Some("alice".to_string()));
        assert_eq!(BearerIdentity.resolve("al"), None);
        assert_eq!(BearerIdentity.resolve("alice smith"), None);
        assert_eq!(BearerIdentity.resolve("g-1/../x"), None);
        // Would be indistinguishable from a group peer.
        assert_eq!(BearerIdentity.resolve("g-1"), None);
    }
}
