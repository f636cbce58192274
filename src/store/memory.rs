use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use tokio::sync::RwLock;

use super::{Store, StoreResult, escape_regex};
use crate::{
    dto::auth::TokenPair,
    models::{
        Address, AddressEdit, AddressSlot, AuditEntry, CartSnapshot, Order, Product, ProductUser,
        User,
    },
};

#[derive(Default)]
struct Collections {
    users: HashMap<ObjectId, User>,
    products: Vec<Product>,
    audit_logs: Vec<AuditEntry>,
}

/// In-process store with the same per-document semantics as the Mongo one.
/// Every method holds the lock for its whole operation, which mirrors
/// single-document atomicity.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.inner.read().await.audit_logs.clone()
    }

    async fn with_user<R>(&self, user_id: ObjectId, f: impl FnOnce(&mut User) -> R) -> Option<R> {
        let mut inner = self.inner.write().await;
        inner.users.get_mut(&user_id).map(f)
    }
}

/// Saturates instead of overflowing, like reading back Mongo's widened `$sum`.
fn cart_sum(items: &[ProductUser]) -> i64 {
    items
        .iter()
        .fold(0_i64, |total, item| total.saturating_add(item.price))
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.inner.write().await.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: ObjectId) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn find_products(&self, product_id: ObjectId) -> StoreResult<Vec<ProductUser>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .filter(|p| p.product_id == product_id)
            .cloned()
            .map(ProductUser::from)
            .collect())
    }

    async fn find_product(&self, product_id: ObjectId) -> StoreResult<Option<ProductUser>> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .find(|p| p.product_id == product_id)
            .cloned()
            .map(ProductUser::from))
    }

    async fn list_products(&self, skip: u64, limit: i64) -> StoreResult<(Vec<Product>, u64)> {
        let inner = self.inner.read().await;
        let mut sorted = inner.products.clone();
        sorted.sort_by(|a, b| a.product_name.cmp(&b.product_name));
        let total = sorted.len() as u64;
        let items = sorted
            .into_iter()
            .skip(skip as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((items, total))
    }

    async fn search_products(&self, name: &str) -> StoreResult<Vec<Product>> {
        // Same escaped, case-insensitive pattern the Mongo `$regex` filter uses.
        let pattern = RegexBuilder::new(&escape_regex(name))
            .case_insensitive(true)
            .build()?;
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .iter()
            .filter(|p| pattern.is_match(&p.product_name))
            .cloned()
            .collect())
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.inner.write().await.products.push(product.clone());
        Ok(())
    }

    async fn push_cart_items(&self, user_id: ObjectId, items: &[ProductUser]) -> StoreResult<bool> {
        let matched = self
            .with_user(user_id, |user| {
                user.usercart.extend_from_slice(items);
                user.cart_version += 1;
            })
            .await;
        Ok(matched.is_some())
    }

    async fn pull_cart_item(&self, user_id: ObjectId, product_id: ObjectId) -> StoreResult<bool> {
        let matched = self
            .with_user(user_id, |user| {
                user.usercart.retain(|item| item.product_id != product_id);
                user.cart_version += 1;
            })
            .await;
        Ok(matched.is_some())
    }

    async fn cart_total(&self, user_id: ObjectId) -> StoreResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .get(&user_id)
            .map(|user| cart_sum(&user.usercart))
            .unwrap_or(0))
    }

    async fn cart_snapshot(&self, user_id: ObjectId) -> StoreResult<Option<CartSnapshot>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).map(|user| CartSnapshot {
            items: user.usercart.clone(),
            total: cart_sum(&user.usercart),
            version: user.cart_version,
        }))
    }

    async fn commit_checkout(
        &self,
        user_id: ObjectId,
        order: &Order,
        cart_version: i64,
    ) -> StoreResult<bool> {
        let committed = self
            .with_user(user_id, |user| {
                if user.cart_version != cart_version {
                    return false;
                }
                user.orders.push(order.clone());
                user.usercart.clear();
                user.cart_version += 1;
                true
            })
            .await;
        Ok(committed.unwrap_or(false))
    }

    async fn push_order(&self, user_id: ObjectId, order: &Order) -> StoreResult<bool> {
        let matched = self
            .with_user(user_id, |user| user.orders.push(order.clone()))
            .await;
        Ok(matched.is_some())
    }

    async fn fill_address_slot(
        &self,
        user_id: ObjectId,
        slot: AddressSlot,
        address: &Address,
    ) -> StoreResult<bool> {
        let filled = self
            .with_user(user_id, |user| {
                let target = user.address.slot_mut(slot);
                if target.is_some() {
                    return false;
                }
                *target = Some(address.clone());
                true
            })
            .await;
        Ok(filled.unwrap_or(false))
    }

    async fn edit_address_slot(
        &self,
        user_id: ObjectId,
        slot: AddressSlot,
        edit: &AddressEdit,
    ) -> StoreResult<bool> {
        let edited = self
            .with_user(user_id, |user| match user.address.slot_mut(slot) {
                Some(address) => {
                    edit.apply(address);
                    true
                }
                None => false,
            })
            .await;
        Ok(edited.unwrap_or(false))
    }

    async fn clear_addresses(&self, user_id: ObjectId) -> StoreResult<bool> {
        let matched = self
            .with_user(user_id, |user| {
                user.address = Default::default();
            })
            .await;
        Ok(matched.is_some())
    }

    async fn save_tokens(
        &self,
        user_id: &str,
        tokens: &TokenPair,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let existing = inner
            .users
            .values()
            .find(|user| user.user_id == user_id)
            .map(|user| user.id);
        let id = match existing {
            Some(id) => id,
            None => {
                // Upsert: a fresh record holding only the key and the tokens.
                let id = ObjectId::parse_str(user_id).unwrap_or_else(|_| ObjectId::new());
                let user = User {
                    id,
                    user_id: user_id.to_string(),
                    first_name: None,
                    last_name: None,
                    email: None,
                    phone: None,
                    token: None,
                    refresh_token: None,
                    created_at: None,
                    updated_at: None,
                    address: Default::default(),
                    usercart: Vec::new(),
                    cart_version: 0,
                    orders: Vec::new(),
                };
                inner.users.insert(id, user);
                id
            }
        };
        if let Some(user) = inner.users.get_mut(&id) {
            user.token = Some(tokens.access_token.clone());
            user.refresh_token = Some(tokens.refresh_token.clone());
            user.updated_at = Some(updated_at);
        }
        Ok(())
    }

    async fn record_audit(&self, entry: &AuditEntry) -> StoreResult<()> {
        self.inner.write().await.audit_logs.push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: i64) -> Product {
        Product {
            product_id: ObjectId::new(),
            product_name: name.to_string(),
            price,
            rating: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn cart_mutations_bump_version() {
        let store = MemoryStore::new();
        let user = User::new("Grace", "Hopper", "grace@example.com");
        store.insert_user(&user).await.unwrap();
        let mug = ProductUser::from(product("Mug", 120));

        assert!(store.push_cart_items(user.id, &[mug.clone()]).await.unwrap());
        assert!(store.pull_cart_item(user.id, mug.product_id).await.unwrap());

        let snapshot = store.cart_snapshot(user.id).await.unwrap().unwrap();
        assert_eq!(snapshot.version, 2);
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.total, 0);
    }

    #[tokio::test]
    async fn stale_checkout_is_rejected() {
        let store = MemoryStore::new();
        let user = User::new("Grace", "Hopper", "grace@example.com");
        store.insert_user(&user).await.unwrap();
        let mug = ProductUser::from(product("Mug", 120));
        store.push_cart_items(user.id, &[mug.clone()]).await.unwrap();

        let order = Order::cash_on_delivery(120, vec![mug]);
        assert!(!store.commit_checkout(user.id, &order, 0).await.unwrap());
        assert!(store.commit_checkout(user.id, &order, 1).await.unwrap());

        let stored = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.orders.len(), 1);
        assert!(stored.usercart.is_empty());
    }

    #[tokio::test]
    async fn updates_against_unknown_user_match_nothing() {
        let store = MemoryStore::new();
        let ghost = ObjectId::new();
        assert!(!store.push_cart_items(ghost, &[]).await.unwrap());
        assert!(!store.clear_addresses(ghost).await.unwrap());
        assert_eq!(store.cart_total(ghost).await.unwrap(), 0);
        assert!(store.cart_snapshot(ghost).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_cart_total_saturates() {
        let store = MemoryStore::new();
        let user = User::new("Grace", "Hopper", "grace@example.com");
        store.insert_user(&user).await.unwrap();
        let gold = ProductUser::from(product("Gold Bar", i64::MAX));
        store
            .push_cart_items(user.id, &[gold.clone(), gold])
            .await
            .unwrap();

        assert_eq!(store.cart_total(user.id).await.unwrap(), i64::MAX);
        let snapshot = store.cart_snapshot(user.id).await.unwrap().unwrap();
        assert_eq!(snapshot.total, i64::MAX);
    }

    #[tokio::test]
    async fn search_matches_metacharacters_literally() {
        let store = MemoryStore::new();
        for name in ["C++ Primer", "axb sticker", "A.B Mug", "Tea (loose)"] {
            store.insert_product(&product(name, 1)).await.unwrap();
        }

        let names = |found: Vec<Product>| -> Vec<String> {
            found.into_iter().map(|p| p.product_name).collect()
        };
        assert_eq!(names(store.search_products("a.b").await.unwrap()), ["A.B Mug"]);
        assert_eq!(names(store.search_products("c++").await.unwrap()), ["C++ Primer"]);
        assert_eq!(names(store.search_products("(LOOSE").await.unwrap()), ["Tea (loose)"]);
    }

    #[tokio::test]
    async fn list_products_pages_by_name() {
        let store = MemoryStore::new();
        for (name, price) in [("Tea", 3), ("Apron", 20), ("Mug", 12)] {
            store.insert_product(&product(name, price)).await.unwrap();
        }

        let (page, total) = store.list_products(1, 1).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].product_name, "Mug");
    }
}
