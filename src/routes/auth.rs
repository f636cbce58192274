use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::auth::{RefreshRequest, TokenPair},
    error::AppResult,
    response::ApiResponse,
    services::token_service::refresh_session,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/refresh", post(refresh))
}

#[utoipa::path(
    post,
    path = "/api/tokens/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = ApiResponse<TokenPair>),
        (status = 401, description = "Invalid, expired or rotated refresh token")
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let resp = refresh_session(&state, payload).await?;
    Ok(Json(resp))
}
