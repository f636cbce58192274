use serde::Serialize;
use utoipa::ToSchema;

use crate::models::ProductUser;

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct CartItemDto {
    pub id: String,
    pub product_name: Option<String>,
    pub price: i64,
    pub rating: Option<i32>,
    pub image: Option<String>,
}

impl From<ProductUser> for CartItemDto {
    fn from(item: ProductUser) -> Self {
        Self {
            id: item.product_id.to_hex(),
            product_name: item.product_name,
            price: item.price,
            rating: item.rating,
            image: item.image,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub total: i64,
    pub items: Vec<CartItemDto>,
}
