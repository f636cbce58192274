use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{post, put},
};

use crate::{
    dto::address::{AddressBookDto, AddressDto, AddressRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::UserQuery,
    services::address_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_address).delete(delete_address))
        .route("/home", put(edit_home_address))
        .route("/work", put(edit_work_address))
}

#[utoipa::path(
    post,
    path = "/api/addresses",
    params(("id" = String, Query, description = "User ID")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address stored in the first free slot", body = ApiResponse<AddressDto>),
        (status = 400, description = "Invalid ID or both slots taken"),
        (status = 404, description = "User not found"),
        (status = 403, description = "Token belongs to another user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn add_address(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserQuery>,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<ApiResponse<AddressDto>>> {
    let resp = address_service::add_address(&state, &user, query.user_id()?, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/addresses/home",
    params(("id" = String, Query, description = "User ID")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Home address updated", body = ApiResponse<AddressBookDto>),
        (status = 404, description = "User or home address not found"),
        (status = 403, description = "Token belongs to another user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn edit_home_address(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserQuery>,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<ApiResponse<AddressBookDto>>> {
    let resp =
        address_service::edit_home_address(&state, &user, query.user_id()?, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/addresses/work",
    params(("id" = String, Query, description = "User ID")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Work address updated", body = ApiResponse<AddressBookDto>),
        (status = 404, description = "User or work address not found"),
        (status = 403, description = "Token belongs to another user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn edit_work_address(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserQuery>,
    Json(payload): Json<AddressRequest>,
) -> AppResult<Json<ApiResponse<AddressBookDto>>> {
    let resp =
        address_service::edit_work_address(&state, &user, query.user_id()?, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/addresses",
    params(("id" = String, Query, description = "User ID")),
    responses(
        (status = 200, description = "All addresses removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "User not found"),
        (status = 403, description = "Token belongs to another user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = address_service::delete_address(&state, &user, query.user_id()?).await?;
    Ok(Json(resp))
}
