//! Checkout workflows.
//!
//! Both workflows finish with a single update against the user document, so a
//! failure at any step leaves the cart and order history untouched.

use bson::oid::ObjectId;

use crate::{
    audit::audit_best_effort,
    dto::orders::OrderDto,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::parse_object_id,
    state::AppState,
};

/// Moves the whole cart into a new cash-on-delivery order.
///
/// The cart is read as one snapshot (items, total and version) and the order
/// push plus cart clear only apply while the cart is still at that version.
/// A concurrent cart change or checkout makes this call fail with a conflict
/// instead of ordering a stale cart twice.
pub async fn buy_from_cart(
    state: &AppState,
    caller: &AuthUser,
    user_id: &str,
) -> AppResult<ApiResponse<OrderDto>> {
    let user_id = parse_object_id(user_id)?;
    caller.ensure_owner(user_id)?;

    let snapshot = state
        .store
        .cart_snapshot(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;

    if snapshot.items.is_empty() {
        return Err(AppError::BadRequest("cart is empty".into()));
    }

    let order = Order::cash_on_delivery(snapshot.total, snapshot.items);
    let committed = state
        .store
        .commit_checkout(user_id, &order, snapshot.version)
        .await?;
    if !committed && !order_recorded(state, user_id, &order).await? {
        tracing::warn!(
            user_id = %user_id,
            version = snapshot.version,
            "checkout lost a race with another cart change"
        );
        return Err(AppError::Conflict(
            "cannot update the purchase: cart changed during checkout".into(),
        ));
    }

    tracing::info!(
        caller = %caller.uid,
        user_id = %user_id,
        order_id = %order.order_id,
        price = order.price,
        items = order.order_list.len(),
        "order placed from cart"
    );
    audit_best_effort(
        state.store.as_ref(),
        Some(&caller.uid),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.order_id.to_hex(), "price": order.price })),
    )
    .await;

    Ok(ApiResponse::success(
        "Successfully placed the order",
        OrderDto::from(order),
        Some(Meta::empty()),
    ))
}

/// A guard miss is also what the store reports when our own write landed but
/// its acknowledgement did not, so look for the order before calling it a race.
async fn order_recorded(state: &AppState, user_id: ObjectId, order: &Order) -> AppResult<bool> {
    let recorded = state
        .store
        .find_user(user_id)
        .await?
        .is_some_and(|user| user.orders.iter().any(|o| o.order_id == order.order_id));
    if recorded {
        tracing::info!(
            user_id = %user_id,
            order_id = %order.order_id,
            "checkout applied despite guard miss"
        );
    }
    Ok(recorded)
}

/// Orders a single product directly, without touching the cart.
pub async fn instant_buy(
    state: &AppState,
    caller: &AuthUser,
    product_id: &str,
    user_id: &str,
) -> AppResult<ApiResponse<OrderDto>> {
    let product_id = parse_object_id(product_id)?;
    let user_id = parse_object_id(user_id)?;
    caller.ensure_owner(user_id)?;

    let product = state
        .store
        .find_product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("can't find the product".into()))?;

    let order = Order::cash_on_delivery(product.price, vec![product]);
    if !state.store.push_order(user_id, &order).await? {
        return Err(AppError::NotFound("user not found".into()));
    }

    tracing::info!(
        caller = %caller.uid,
        user_id = %user_id,
        order_id = %order.order_id,
        price = order.price,
        "instant order placed"
    );
    audit_best_effort(
        state.store.as_ref(),
        Some(&caller.uid),
        "instant_buy",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.order_id.to_hex(),
            "product_id": product_id.to_hex(),
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Successfully placed the order",
        OrderDto::from(order),
        Some(Meta::empty()),
    ))
}
