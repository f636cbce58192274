use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::cart::CartItemDto,
    models::{Order, Payment},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDto {
    pub digital: bool,
    pub cod: bool,
}

impl From<Payment> for PaymentDto {
    fn from(payment: Payment) -> Self {
        Self {
            digital: payment.digital,
            cod: payment.cod,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDto {
    pub id: String,
    pub ordered_at: DateTime<Utc>,
    pub price: i64,
    pub discount: Option<i64>,
    pub payment_method: PaymentDto,
    pub order_list: Vec<CartItemDto>,
}

impl From<Order> for OrderDto {
    fn from(order: Order) -> Self {
        Self {
            id: order.order_id.to_hex(),
            ordered_at: order.ordered_at,
            price: order.price,
            discount: order.discount,
            payment_method: order.payment_method.into(),
            order_list: order.order_list.into_iter().map(CartItemDto::from).collect(),
        }
    }
}
