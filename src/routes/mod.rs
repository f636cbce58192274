use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    middleware::from_fn_with_state,
    routing::get,
};

use crate::{
    middleware::auth::authenticate,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod address;
pub mod auth;
pub mod cart;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;

/// API routes. Everything except the catalog reads and token refresh sits
/// behind the bearer-token middleware.
pub fn create_api_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/addresses", address::router())
        .nest("/admin", products::admin_router())
        .route_layer(from_fn_with_state(state, authenticate));

    Router::new()
        .nest("/products", products::router())
        .nest("/tokens", auth::router())
        .merge(protected)
}

/// The full application with state bound; HTTP layers are added by the binary.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router(state.clone()))
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
