use bson::oid::ObjectId;

use crate::{
    audit::audit_best_effort,
    dto::cart::{CartItemDto, CartView},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::parse_object_id,
    state::AppState,
};

pub async fn add_to_cart(
    state: &AppState,
    caller: &AuthUser,
    product_id: &str,
    user_id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let product_id = parse_object_id(product_id)?;
    let products = state.store.find_products(product_id).await?;
    if products.is_empty() {
        return Err(AppError::NotFound("can't find the product".into()));
    }

    let user_id = ObjectId::parse_str(user_id)
        .map_err(|_| AppError::BadRequest("this user is not valid".into()))?;
    caller.ensure_owner(user_id)?;

    if !state.store.push_cart_items(user_id, &products).await? {
        return Err(AppError::NotFound("user not found".into()));
    }

    tracing::info!(
        caller = %caller.uid,
        user_id = %user_id,
        product_id = %product_id,
        items = products.len(),
        "added to cart"
    );
    audit_best_effort(
        state.store.as_ref(),
        Some(&caller.uid),
        "cart_add",
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id.to_hex(), "product_id": product_id.to_hex() })),
    )
    .await;

    Ok(ApiResponse::success(
        "Successfully added to the cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_cart(
    state: &AppState,
    caller: &AuthUser,
    product_id: &str,
    user_id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let product_id = parse_object_id(product_id)?;
    let user_id = ObjectId::parse_str(user_id)
        .map_err(|_| AppError::BadRequest("this user is not valid".into()))?;
    caller.ensure_owner(user_id)?;

    if !state.store.pull_cart_item(user_id, product_id).await? {
        return Err(AppError::NotFound("user not found".into()));
    }

    audit_best_effort(
        state.store.as_ref(),
        Some(&caller.uid),
        "cart_remove",
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id.to_hex(), "product_id": product_id.to_hex() })),
    )
    .await;

    Ok(ApiResponse::success(
        "Successfully removed item from the cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn get_cart(
    state: &AppState,
    caller: &AuthUser,
    user_id: &str,
) -> AppResult<ApiResponse<CartView>> {
    let user_id = parse_object_id(user_id)?;
    caller.ensure_owner(user_id)?;
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("not found".into()))?;

    let total = state.store.cart_total(user_id).await?;
    let items: Vec<CartItemDto> = user.usercart.into_iter().map(CartItemDto::from).collect();
    let meta = Meta::single_page(items.len());

    Ok(ApiResponse::success(
        "OK",
        CartView { total, items },
        Some(meta),
    ))
}
