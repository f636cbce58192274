use axum::{
    Json, Router,
    extract::{Query, State},
    routing::post,
};

use crate::{
    dto::orders::OrderDto,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::ProductUserQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/instant", post(instant_buy))
}

#[utoipa::path(
    post,
    path = "/api/orders/instant",
    params(
        ("id" = String, Query, description = "Product ID"),
        ("userID" = String, Query, description = "User ID")
    ),
    responses(
        (status = 200, description = "Order placed for a single product", body = ApiResponse<OrderDto>),
        (status = 400, description = "Invalid ID format"),
        (status = 404, description = "Product or user not found"),
        (status = 403, description = "Token belongs to another user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn instant_buy(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProductUserQuery>,
) -> AppResult<Json<ApiResponse<OrderDto>>> {
    let (product_id, user_id) = query.ids()?;
    let resp = order_service::instant_buy(&state, &user, product_id, user_id).await?;
    Ok(Json(resp))
}
