//! Guarded writes whose acknowledgement is lost: the write lands, the
//! re-issued call misses its guard, and the store reports `false`.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use common::{SECRET, caller};
use storefront_api::{
    dto::{address::AddressRequest, auth::TokenPair},
    error::AppError,
    models::{
        Address, AddressEdit, AddressSlot, AuditEntry, CartSnapshot, Order, Product, ProductUser,
        User,
    },
    services::{address_service, cart_service, order_service, token_service::TokenService},
    state::AppState,
    store::{Store, StoreResult, memory::MemoryStore},
};

/// Applies every guarded write, then answers with the outcome of running it
/// a second time. With `cart_changes_first`, another cart change lands just
/// before each checkout.
struct ReissuingStore {
    inner: MemoryStore,
    cart_changes_first: bool,
}

#[async_trait]
impl Store for ReissuingStore {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.inner.insert_user(user).await
    }

    async fn find_user(&self, user_id: ObjectId) -> StoreResult<Option<User>> {
        self.inner.find_user(user_id).await
    }

    async fn find_products(&self, product_id: ObjectId) -> StoreResult<Vec<ProductUser>> {
        self.inner.find_products(product_id).await
    }

    async fn find_product(&self, product_id: ObjectId) -> StoreResult<Option<ProductUser>> {
        self.inner.find_product(product_id).await
    }

    async fn list_products(&self, skip: u64, limit: i64) -> StoreResult<(Vec<Product>, u64)> {
        self.inner.list_products(skip, limit).await
    }

    async fn search_products(&self, name: &str) -> StoreResult<Vec<Product>> {
        self.inner.search_products(name).await
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.inner.insert_product(product).await
    }

    async fn push_cart_items(&self, user_id: ObjectId, items: &[ProductUser]) -> StoreResult<bool> {
        self.inner.push_cart_items(user_id, items).await
    }

    async fn pull_cart_item(&self, user_id: ObjectId, product_id: ObjectId) -> StoreResult<bool> {
        self.inner.pull_cart_item(user_id, product_id).await
    }

    async fn cart_total(&self, user_id: ObjectId) -> StoreResult<i64> {
        self.inner.cart_total(user_id).await
    }

    async fn cart_snapshot(&self, user_id: ObjectId) -> StoreResult<Option<CartSnapshot>> {
        self.inner.cart_snapshot(user_id).await
    }

    async fn commit_checkout(
        &self,
        user_id: ObjectId,
        order: &Order,
        cart_version: i64,
    ) -> StoreResult<bool> {
        if self.cart_changes_first {
            self.inner.push_cart_items(user_id, &[]).await?;
        }
        self.inner.commit_checkout(user_id, order, cart_version).await?;
        self.inner.commit_checkout(user_id, order, cart_version).await
    }

    async fn push_order(&self, user_id: ObjectId, order: &Order) -> StoreResult<bool> {
        self.inner.push_order(user_id, order).await
    }

    async fn fill_address_slot(
        &self,
        user_id: ObjectId,
        slot: AddressSlot,
        address: &Address,
    ) -> StoreResult<bool> {
        self.inner.fill_address_slot(user_id, slot, address).await?;
        self.inner.fill_address_slot(user_id, slot, address).await
    }

    async fn edit_address_slot(
        &self,
        user_id: ObjectId,
        slot: AddressSlot,
        edit: &AddressEdit,
    ) -> StoreResult<bool> {
        self.inner.edit_address_slot(user_id, slot, edit).await
    }

    async fn clear_addresses(&self, user_id: ObjectId) -> StoreResult<bool> {
        self.inner.clear_addresses(user_id).await
    }

    async fn save_tokens(
        &self,
        user_id: &str,
        tokens: &TokenPair,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.inner.save_tokens(user_id, tokens, updated_at).await
    }

    async fn record_audit(&self, entry: &AuditEntry) -> StoreResult<()> {
        self.inner.record_audit(entry).await
    }
}

async fn setup(cart_changes_first: bool) -> (AppState, Arc<ReissuingStore>, User) {
    let store = Arc::new(ReissuingStore {
        inner: MemoryStore::new(),
        cart_changes_first,
    });
    let state = AppState::new(store.clone(), TokenService::new(SECRET));
    let user = User::new("Ada", "Lovelace", "ada@example.com");
    store.insert_user(&user).await.expect("insert user");
    (state, store, user)
}

async fn mug_in_cart(state: &AppState, store: &ReissuingStore, user: &User) -> anyhow::Result<()> {
    let mug = Product {
        product_id: ObjectId::new(),
        product_name: "Ferris Mug".into(),
        price: 1200,
        rating: None,
        image: None,
    };
    store.insert_product(&mug).await?;
    let product_id = mug.product_id.to_hex();
    cart_service::add_to_cart(state, &caller(user), &product_id, &user.user_id).await?;
    Ok(())
}

#[tokio::test]
async fn checkout_that_applied_reports_success() -> anyhow::Result<()> {
    let (state, store, user) = setup(false).await;
    let me = caller(&user);
    mug_in_cart(&state, &store, &user).await?;

    let order = order_service::buy_from_cart(&state, &me, &user.user_id)
        .await?
        .data
        .unwrap();

    let after = store.find_user(user.id).await?.unwrap();
    assert_eq!(after.orders.len(), 1);
    assert_eq!(after.orders[0].order_id.to_hex(), order.id);
    assert!(after.usercart.is_empty());
    Ok(())
}

#[tokio::test]
async fn checkout_beaten_by_a_cart_change_still_conflicts() -> anyhow::Result<()> {
    let (state, store, user) = setup(true).await;
    mug_in_cart(&state, &store, &user).await?;

    let err = order_service::buy_from_cart(&state, &caller(&user), &user.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let after = store.find_user(user.id).await?.unwrap();
    assert!(after.orders.is_empty());
    assert_eq!(after.usercart.len(), 1);
    Ok(())
}

#[tokio::test]
async fn address_fill_that_applied_takes_one_slot() -> anyhow::Result<()> {
    let (state, store, user) = setup(false).await;
    let payload = AddressRequest {
        house_name: Some("1".into()),
        street_name: Some("Main Street".into()),
        city_name: Some("Pune".into()),
        pin_code: Some("411001".into()),
    };

    let added = address_service::add_address(&state, &caller(&user), &user.user_id, payload)
        .await?
        .data
        .unwrap();

    let after = store.find_user(user.id).await?.unwrap();
    assert_eq!(after.address.count(), 1);
    assert_eq!(after.address.home.unwrap().address_id.to_hex(), added.id);
    assert!(after.address.work.is_none());

    let second = AddressRequest {
        city_name: Some("Goa".into()),
        ..Default::default()
    };
    address_service::add_address(&state, &caller(&user), &user.user_id, second).await?;

    let after = store.find_user(user.id).await?.unwrap();
    assert_eq!(after.address.count(), 2);
    assert_eq!(after.address.work.unwrap().city_name.as_deref(), Some("Goa"));
    Ok(())
}
