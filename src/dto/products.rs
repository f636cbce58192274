use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub product_name: String,
    pub price: i64,
    pub rating: Option<i32>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct ProductDto {
    pub id: String,
    pub product_name: String,
    pub price: i64,
    pub rating: Option<i32>,
    pub image: Option<String>,
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        Self {
            id: product.product_id.to_hex(),
            product_name: product.product_name,
            price: product.price,
            rating: product.rating,
            image: product.image,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<ProductDto>)]
    pub items: Vec<ProductDto>,
}
