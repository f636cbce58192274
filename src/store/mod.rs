//! Storage collaborator for the workflows.
//!
//! Every method maps onto one document-store operation (or one aggregation)
//! against the `users`, `products` or `audit_logs` collections. Methods that
//! update a user return whether a user document matched, so the workflows can
//! tell "no such user" apart from a store failure.

use std::time::Duration;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::dto::auth::TokenPair;
use crate::models::{
    AddressEdit, Address, AddressSlot, AuditEntry, CartSnapshot, Order, Product, ProductUser, User,
};

pub mod memory;
pub mod mongo;

pub const USERS: &str = "users";
pub const PRODUCTS: &str = "products";
pub const AUDIT_LOGS: &str = "audit_logs";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation `{op}` failed: {source}")]
    Backend {
        op: &'static str,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("store operation `{op}` timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user(&self, user_id: ObjectId) -> StoreResult<Option<User>>;

    /// All catalog entries with this id, already shaped as cart lines.
    async fn find_products(&self, product_id: ObjectId) -> StoreResult<Vec<ProductUser>>;

    async fn find_product(&self, product_id: ObjectId) -> StoreResult<Option<ProductUser>>;

    /// One page of the catalog plus the catalog size.
    async fn list_products(&self, skip: u64, limit: i64) -> StoreResult<(Vec<Product>, u64)>;

    /// Case-insensitive substring match on the product name.
    async fn search_products(&self, name: &str) -> StoreResult<Vec<Product>>;

    async fn insert_product(&self, product: &Product) -> StoreResult<()>;

    /// Appends the items to the cart and bumps the cart version.
    async fn push_cart_items(&self, user_id: ObjectId, items: &[ProductUser]) -> StoreResult<bool>;

    /// Removes every cart line with this product id and bumps the cart version.
    async fn pull_cart_item(&self, user_id: ObjectId, product_id: ObjectId) -> StoreResult<bool>;

    /// Sum of cart prices; zero for an empty cart or unknown user.
    async fn cart_total(&self, user_id: ObjectId) -> StoreResult<i64>;

    async fn cart_snapshot(&self, user_id: ObjectId) -> StoreResult<Option<CartSnapshot>>;

    /// Pushes the order and empties the cart in one update, only if the cart
    /// is still at `cart_version`. Returns false when the guard did not match.
    async fn commit_checkout(
        &self,
        user_id: ObjectId,
        order: &Order,
        cart_version: i64,
    ) -> StoreResult<bool>;

    async fn push_order(&self, user_id: ObjectId, order: &Order) -> StoreResult<bool>;

    /// Writes the address into the slot only while the slot is empty.
    async fn fill_address_slot(
        &self,
        user_id: ObjectId,
        slot: AddressSlot,
        address: &Address,
    ) -> StoreResult<bool>;

    /// Updates the provided fields only while the slot holds an address.
    async fn edit_address_slot(
        &self,
        user_id: ObjectId,
        slot: AddressSlot,
        edit: &AddressEdit,
    ) -> StoreResult<bool>;

    async fn clear_addresses(&self, user_id: ObjectId) -> StoreResult<bool>;

    /// Upserts the token pair onto the user keyed by its `user_id` string.
    async fn save_tokens(
        &self,
        user_id: &str,
        tokens: &TokenPair,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn record_audit(&self, entry: &AuditEntry) -> StoreResult<()>;
}

/// Escapes regex metacharacters so user input matches literally.
pub fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
