use bson::oid::ObjectId;

use crate::{
    audit::audit_best_effort,
    dto::products::{CreateProductRequest, ProductDto, ProductList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, SearchQuery},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let (products, total) = state.store.list_products(offset as u64, limit).await?;

    let items = products.into_iter().map(ProductDto::from).collect();
    let meta = Meta::new(page, limit, total as i64);
    Ok(ApiResponse::success("OK", ProductList { items }, Some(meta)))
}

pub async fn search_products(
    state: &AppState,
    query: SearchQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let name = query.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(AppError::BadRequest("search query is empty".into()));
    }

    let products = state.store.search_products(name).await?;
    let meta = Meta::single_page(products.len());
    let items = products.into_iter().map(ProductDto::from).collect();
    Ok(ApiResponse::success("OK", ProductList { items }, Some(meta)))
}

pub async fn add_product(
    state: &AppState,
    caller: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductDto>> {
    let name = payload.product_name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("product_name is required".into()));
    }
    if payload.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }

    let product = Product {
        product_id: ObjectId::new(),
        product_name: name.to_string(),
        price: payload.price,
        rating: payload.rating,
        image: payload.image,
    };
    state.store.insert_product(&product).await?;

    audit_best_effort(
        state.store.as_ref(),
        Some(&caller.uid),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.product_id.to_hex() })),
    )
    .await;

    Ok(ApiResponse::success(
        "Successfully added our product",
        ProductDto::from(product),
        Some(Meta::empty()),
    ))
}
