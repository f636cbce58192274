//! Session credentials: HS256 access/refresh token pairs.
//!
//! Access tokens carry the caller's identity and names and live 24 hours.
//! Refresh tokens carry only `email`/`uid`, live a week, and are accepted
//! solely by [`refresh_session`].

use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use uuid::Uuid;

use crate::{
    audit::audit_best_effort,
    dto::auth::{Claims, RefreshRequest, TokenError, TokenKind, TokenPair},
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    state::AppState,
    store::{Store, StoreResult},
};

#[derive(Clone)]
pub struct TokenService {
    secret: Arc<[u8]>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
            access_ttl: Duration::hours(24),
            refresh_ttl: Duration::hours(168),
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn issue_pair(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        uid: &str,
    ) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        let access = Claims {
            email: email.to_string(),
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            uid: uid.to_string(),
            kind: TokenKind::Access,
            jti: Uuid::new_v4(),
            exp: (now + self.access_ttl).timestamp(),
        };
        let refresh = Claims {
            email: email.to_string(),
            first_name: None,
            last_name: None,
            uid: uid.to_string(),
            kind: TokenKind::Refresh,
            jti: Uuid::new_v4(),
            exp: (now + self.refresh_ttl).timestamp(),
        };

        Ok(TokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
        })
    }

    /// Checks the signature, then rejects tokens whose `exp` is in the past.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let decoded = decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(err.to_string()),
            })?;

        Ok(decoded.claims)
    }

    pub fn validate_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.validate(token)?;
        if claims.kind != expected {
            return Err(TokenError::WrongKind { expected });
        }
        Ok(claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingKey);
        }
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

/// Stores the pair on the user record, creating the record if it is absent.
pub async fn persist_token_pair(
    store: &dyn Store,
    tokens: &TokenPair,
    user_id: &str,
) -> StoreResult<()> {
    store.save_tokens(user_id, tokens, Utc::now()).await?;
    tracing::debug!(user_id, "token pair persisted");
    Ok(())
}

pub async fn refresh_session(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<TokenPair>> {
    let claims = state
        .tokens
        .validate_kind(payload.refresh_token.trim(), TokenKind::Refresh)
        .map_err(|err| AppError::Unauthorized(err.to_string()))?;

    let user_id = ObjectId::parse_str(&claims.uid)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;

    if user.refresh_token.as_deref() != Some(payload.refresh_token.trim()) {
        return Err(AppError::Unauthorized("Refresh token has been rotated".into()));
    }

    let tokens = state.tokens.issue_pair(
        user.email.as_deref().unwrap_or(&claims.email),
        user.first_name.as_deref().unwrap_or_default(),
        user.last_name.as_deref().unwrap_or_default(),
        &user.user_id,
    )?;
    persist_token_pair(state.store.as_ref(), &tokens, &user.user_id).await?;

    audit_best_effort(
        state.store.as_ref(),
        Some(&user.user_id),
        "session_refresh",
        Some("users"),
        Some(serde_json::json!({ "jti": claims.jti })),
    )
    .await;

    Ok(ApiResponse::success(
        "Successfully token updated",
        tokens,
        Some(Meta::empty()),
    ))
}
