use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};

use crate::{
    dto::{cart::CartView, orders::OrderDto},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{ProductUserQuery, UserQuery},
    services::{cart_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cart))
        .route("/items", post(add_to_cart).delete(remove_from_cart))
        .route("/checkout", post(buy_from_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    params(
        ("id" = String, Query, description = "User ID")
    ),
    responses(
        (status = 200, description = "Cart items and their total", body = ApiResponse<CartView>),
        (status = 400, description = "Invalid ID format"),
        (status = 404, description = "User not found or id missing"),
        (status = 403, description = "Token belongs to another user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn list_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::get_cart(&state, &user, query.user_id()?).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/items",
    params(
        ("id" = String, Query, description = "Product ID"),
        ("userID" = String, Query, description = "User ID")
    ),
    responses(
        (status = 200, description = "Product copied into the cart", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid ID format"),
        (status = 404, description = "Product or user not found"),
        (status = 403, description = "Token belongs to another user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProductUserQuery>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let (product_id, user_id) = query.ids()?;
    let resp = cart_service::add_to_cart(&state, &user, product_id, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items",
    params(
        ("id" = String, Query, description = "Product ID"),
        ("userID" = String, Query, description = "User ID")
    ),
    responses(
        (status = 200, description = "OK", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid ID format"),
        (status = 404, description = "User not found"),
        (status = 403, description = "Token belongs to another user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProductUserQuery>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let (product_id, user_id) = query.ids()?;
    let resp = cart_service::remove_from_cart(&state, &user, product_id, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/checkout",
    params(
        ("id" = String, Query, description = "User ID")
    ),
    responses(
        (status = 200, description = "Order placed from the cart", body = ApiResponse<OrderDto>),
        (status = 400, description = "Invalid ID or empty cart"),
        (status = 404, description = "User not found"),
        (status = 403, description = "Token belongs to another user"),
        (status = 409, description = "Cart changed during checkout"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn buy_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<ApiResponse<OrderDto>>> {
    let resp = order_service::buy_from_cart(&state, &user, query.user_id()?).await?;
    Ok(Json(resp))
}
