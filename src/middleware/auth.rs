use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use bson::oid::ObjectId;

use crate::{
    dto::auth::TokenKind,
    error::{AppError, AppResult},
    state::AppState,
};

const BEARER_PREFIX: &str = "Bearer ";

/// Identity attached to a request once its access token checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub email: String,
    pub uid: String,
}

impl AuthUser {
    /// A user's cart, addresses and orders are only reachable with that
    /// user's own token.
    pub fn ensure_owner(&self, user_id: ObjectId) -> AppResult<()> {
        if self.uid == user_id.to_hex() {
            return Ok(());
        }
        tracing::warn!(caller = %self.uid, user_id = %user_id, "caller acted on another user");
        Err(AppError::Forbidden(
            "token does not belong to this user".into(),
        ))
    }
}

/// Rejects the request with 401 unless it carries a valid access token,
/// otherwise attaches the caller's [`AuthUser`] and runs the handler.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("No Authorization header provided".into()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    let token = auth_str
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header format".into()))?;

    let claims = state
        .tokens
        .validate_kind(token, TokenKind::Access)
        .map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            AppError::Unauthorized(err.to_string())
        })?;

    request.extensions_mut().insert(AuthUser {
        email: claims.email,
        uid: claims.uid,
    });
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".into()))
    }
}
