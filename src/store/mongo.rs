use std::{future::Future, time::Duration};

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection, Database, IndexModel,
    error::{ErrorKind, RETRYABLE_WRITE_ERROR},
    options::{ClientOptions, FindOptions, IndexOptions, UpdateOptions},
};

use super::{AUDIT_LOGS, PRODUCTS, Store, StoreError, StoreResult, USERS, escape_regex};
use crate::{
    dto::auth::TokenPair,
    models::{
        Address, AddressEdit, AddressSlot, AuditEntry, CartSnapshot, Order, Product, ProductUser,
        User,
    },
};

/// Attempts for idempotent operations; `$push` writes and guarded writes run once.
const IDEMPOTENT_ATTEMPTS: u32 = 3;
const SINGLE_ATTEMPT: u32 = 1;
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct StoreTimeouts {
    /// Single-item cart mutations.
    pub cart: Duration,
    /// Reads, aggregations, address and checkout writes.
    pub query: Duration,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            cart: Duration::from_secs(5),
            query: Duration::from_secs(15),
        }
    }
}

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    users: Collection<User>,
    products: Collection<Product>,
    audit_logs: Collection<AuditEntry>,
    timeouts: StoreTimeouts,
}

impl MongoStore {
    /// Connects, selects the database and checks the deployment answers a ping.
    pub async fn connect(
        uri: &str,
        database: &str,
        timeouts: StoreTimeouts,
    ) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|source| StoreError::Backend {
                op: "connect",
                source,
            })?;
        options.app_name = Some("storefront-api".to_string());
        let client = Client::with_options(options).map_err(|source| StoreError::Backend {
            op: "connect",
            source,
        })?;

        let store = Self::new(client.database(database), timeouts);
        store.ping().await?;
        tracing::info!(database, "connected to mongodb");
        Ok(store)
    }

    pub fn new(db: Database, timeouts: StoreTimeouts) -> Self {
        Self {
            users: db.collection::<User>(USERS),
            products: db.collection::<Product>(PRODUCTS),
            audit_logs: db.collection::<AuditEntry>(AUDIT_LOGS),
            db,
            timeouts,
        }
    }

    /// Indexes backing the lookups the workflows issue.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let users = &self.users;
        let products = &self.products;
        let audit_logs = &self.audit_logs;

        self.run("create_index_users", self.timeouts.query, IDEMPOTENT_ATTEMPTS, move || {
            let model = IndexModel::builder()
                .keys(doc! { "user_id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();
            users.create_index(model, None)
        })
        .await?;

        self.run("create_index_products", self.timeouts.query, IDEMPOTENT_ATTEMPTS, move || {
            let model = IndexModel::builder()
                .keys(doc! { "product_name": 1 })
                .build();
            products.create_index(model, None)
        })
        .await?;

        self.run("create_index_audit_logs", self.timeouts.query, IDEMPOTENT_ATTEMPTS, move || {
            let model = IndexModel::builder()
                .keys(doc! { "user_id": 1, "created_at": -1 })
                .build();
            audit_logs.create_index(model, None)
        })
        .await?;

        Ok(())
    }

    /// Drops every collection this store owns. Used by the integration tests.
    pub async fn reset(&self) -> StoreResult<()> {
        let users = &self.users;
        let products = &self.products;
        let audit_logs = &self.audit_logs;
        self.run("drop_users", self.timeouts.query, SINGLE_ATTEMPT, move || users.drop(None))
            .await?;
        self.run("drop_products", self.timeouts.query, SINGLE_ATTEMPT, move || {
            products.drop(None)
        })
        .await?;
        self.run("drop_audit_logs", self.timeouts.query, SINGLE_ATTEMPT, move || {
            audit_logs.drop(None)
        })
        .await
    }

    /// Runs one driver call under a timeout, retrying transient failures.
    async fn run<T, F, Fut>(
        &self,
        op: &'static str,
        limit: Duration,
        attempts: u32,
        mut call: F,
    ) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = mongodb::error::Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match tokio::time::timeout(limit, call()).await {
                Err(_) => {
                    tracing::error!(op, after_ms = %limit.as_millis(), "store operation timed out");
                    return Err(StoreError::Timeout { op, after: limit });
                }
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) if attempt < attempts && is_transient(&err) => {
                    tracing::warn!(op, attempt, error = %err, "transient store error, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Ok(Err(source)) => return Err(StoreError::Backend { op, source }),
            }
        }
    }

    async fn update_user(
        &self,
        op: &'static str,
        limit: Duration,
        attempts: u32,
        filter: Document,
        update: Document,
    ) -> StoreResult<bool> {
        let users = &self.users;
        let result = self
            .run(op, limit, attempts, move || {
                users.update_one(filter.clone(), update.clone(), None)
            })
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn aggregate_users(
        &self,
        op: &'static str,
        pipeline: Vec<Document>,
    ) -> StoreResult<Vec<Document>> {
        let users = &self.users;
        self.run(op, self.timeouts.query, IDEMPOTENT_ATTEMPTS, move || {
            let pipeline = pipeline.clone();
            async move {
                let cursor = users.aggregate(pipeline, None).await?;
                cursor.try_collect().await
            }
        })
        .await
    }

    async fn find_many_products(
        &self,
        op: &'static str,
        filter: Document,
        options: Option<FindOptions>,
    ) -> StoreResult<Vec<Product>> {
        let products = &self.products;
        self.run(op, self.timeouts.query, IDEMPOTENT_ATTEMPTS, move || {
            let filter = filter.clone();
            let options = options.clone();
            async move {
                let cursor = products.find(filter, options).await?;
                cursor.try_collect().await
            }
        })
        .await
    }
}

fn is_transient(err: &mongodb::error::Error) -> bool {
    err.contains_label(RETRYABLE_WRITE_ERROR)
        || matches!(
            *err.kind,
            ErrorKind::Io(_) | ErrorKind::ServerSelection { .. }
        )
}

/// Filter that matches the user only while its cart is at `version`.
/// Documents written before versioning have no counter and count as zero.
fn cart_version_filter(user_id: ObjectId, version: i64) -> Document {
    if version == 0 {
        doc! {
            "_id": user_id,
            "$or": [
                { "cart_version": 0_i64 },
                { "cart_version": { "$exists": false } },
            ],
        }
    } else {
        doc! { "_id": user_id, "cart_version": version }
    }
}

fn slot_path(slot: AddressSlot) -> String {
    format!("address.{}", slot.field())
}

/// Reads a numeric aggregation result regardless of the width it came back as.
fn numeric(value: Option<&Bson>) -> i64 {
    match value {
        Some(Bson::Int32(v)) => i64::from(*v),
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> StoreResult<()> {
        let db = &self.db;
        self.run("ping", self.timeouts.query, IDEMPOTENT_ATTEMPTS, move || {
            db.run_command(doc! { "ping": 1 }, None)
        })
        .await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let users = &self.users;
        self.run("insert_user", self.timeouts.query, SINGLE_ATTEMPT, move || {
            users.insert_one(user, None)
        })
        .await?;
        Ok(())
    }

    async fn find_user(&self, user_id: ObjectId) -> StoreResult<Option<User>> {
        let users = &self.users;
        self.run("find_user", self.timeouts.query, IDEMPOTENT_ATTEMPTS, move || {
            users.find_one(doc! { "_id": user_id }, None)
        })
        .await
    }

    async fn find_products(&self, product_id: ObjectId) -> StoreResult<Vec<ProductUser>> {
        let products = self.products.clone_with_type::<ProductUser>();
        let products = &products;
        self.run("find_products", self.timeouts.cart, IDEMPOTENT_ATTEMPTS, move || async move {
            let cursor = products.find(doc! { "_id": product_id }, None).await?;
            cursor.try_collect().await
        })
        .await
    }

    async fn find_product(&self, product_id: ObjectId) -> StoreResult<Option<ProductUser>> {
        let products = self.products.clone_with_type::<ProductUser>();
        let products = &products;
        self.run("find_product", self.timeouts.cart, IDEMPOTENT_ATTEMPTS, move || {
            products.find_one(doc! { "_id": product_id }, None)
        })
        .await
    }

    async fn list_products(&self, skip: u64, limit: i64) -> StoreResult<(Vec<Product>, u64)> {
        let options = FindOptions::builder()
            .skip(skip)
            .limit(limit)
            .sort(doc! { "product_name": 1 })
            .build();
        let items = self
            .find_many_products("list_products", doc! {}, Some(options))
            .await?;

        let products = &self.products;
        let total = self
            .run("count_products", self.timeouts.query, IDEMPOTENT_ATTEMPTS, move || {
                products.count_documents(None, None)
            })
            .await?;
        Ok((items, total))
    }

    async fn search_products(&self, name: &str) -> StoreResult<Vec<Product>> {
        let filter = doc! {
            "product_name": { "$regex": escape_regex(name), "$options": "i" },
        };
        self.find_many_products("search_products", filter, None).await
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let products = &self.products;
        self.run("insert_product", self.timeouts.query, SINGLE_ATTEMPT, move || {
            products.insert_one(product, None)
        })
        .await?;
        Ok(())
    }

    async fn push_cart_items(&self, user_id: ObjectId, items: &[ProductUser]) -> StoreResult<bool> {
        let items = bson::to_bson(items)?;
        self.update_user(
            "push_cart_items",
            self.timeouts.cart,
            SINGLE_ATTEMPT,
            doc! { "_id": user_id },
            doc! {
                "$push": { "usercart": { "$each": items } },
                "$inc": { "cart_version": 1_i64 },
            },
        )
        .await
    }

    async fn pull_cart_item(&self, user_id: ObjectId, product_id: ObjectId) -> StoreResult<bool> {
        self.update_user(
            "pull_cart_item",
            self.timeouts.cart,
            SINGLE_ATTEMPT,
            doc! { "_id": user_id },
            doc! {
                "$pull": { "usercart": { "_id": product_id } },
                "$inc": { "cart_version": 1_i64 },
            },
        )
        .await
    }

    async fn cart_total(&self, user_id: ObjectId) -> StoreResult<i64> {
        let pipeline = vec![
            doc! { "$match": { "_id": user_id } },
            doc! { "$unwind": { "path": "$usercart" } },
            doc! { "$group": { "_id": "$_id", "total": { "$sum": "$usercart.price" } } },
        ];
        let rows = self.aggregate_users("cart_total", pipeline).await?;
        Ok(rows.first().map(|row| numeric(row.get("total"))).unwrap_or(0))
    }

    async fn cart_snapshot(&self, user_id: ObjectId) -> StoreResult<Option<CartSnapshot>> {
        let pipeline = vec![
            doc! { "$match": { "_id": user_id } },
            doc! {
                "$project": {
                    "_id": 0,
                    "items": { "$ifNull": ["$usercart", []] },
                    "total": { "$sum": "$usercart.price" },
                    "version": { "$ifNull": ["$cart_version", 0_i64] },
                }
            },
        ];
        let rows = self.aggregate_users("cart_snapshot", pipeline).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(bson::from_document(row)?)),
            None => Ok(None),
        }
    }

    async fn commit_checkout(
        &self,
        user_id: ObjectId,
        order: &Order,
        cart_version: i64,
    ) -> StoreResult<bool> {
        let order = bson::to_bson(order)?;
        // Not retried here: after a lost acknowledgement the guard no longer
        // matches and the retry would report a race. The driver's retryable
        // writes cover that case server-side.
        self.update_user(
            "commit_checkout",
            self.timeouts.query,
            SINGLE_ATTEMPT,
            cart_version_filter(user_id, cart_version),
            doc! {
                "$push": { "orders": order },
                "$set": { "usercart": [] },
                "$inc": { "cart_version": 1_i64 },
            },
        )
        .await
    }

    async fn push_order(&self, user_id: ObjectId, order: &Order) -> StoreResult<bool> {
        let order = bson::to_bson(order)?;
        self.update_user(
            "push_order",
            self.timeouts.query,
            SINGLE_ATTEMPT,
            doc! { "_id": user_id },
            doc! { "$push": { "orders": order } },
        )
        .await
    }

    async fn fill_address_slot(
        &self,
        user_id: ObjectId,
        slot: AddressSlot,
        address: &Address,
    ) -> StoreResult<bool> {
        let path = slot_path(slot);
        let address = bson::to_bson(address)?;
        let mut filter = doc! { "_id": user_id };
        filter.insert(path.clone(), Bson::Null);
        let mut set = Document::new();
        set.insert(path, address);
        self.update_user(
            "fill_address_slot",
            self.timeouts.query,
            SINGLE_ATTEMPT,
            filter,
            doc! { "$set": set },
        )
        .await
    }

    async fn edit_address_slot(
        &self,
        user_id: ObjectId,
        slot: AddressSlot,
        edit: &AddressEdit,
    ) -> StoreResult<bool> {
        let path = slot_path(slot);
        let mut filter = doc! { "_id": user_id };
        filter.insert(path.clone(), doc! { "$ne": Bson::Null });
        let mut set = Document::new();
        for (field, value) in edit.fields() {
            set.insert(format!("{path}.{field}"), value);
        }
        self.update_user(
            "edit_address_slot",
            self.timeouts.query,
            IDEMPOTENT_ATTEMPTS,
            filter,
            doc! { "$set": set },
        )
        .await
    }

    async fn clear_addresses(&self, user_id: ObjectId) -> StoreResult<bool> {
        self.update_user(
            "clear_addresses",
            self.timeouts.query,
            IDEMPOTENT_ATTEMPTS,
            doc! { "_id": user_id },
            doc! { "$set": { "address": { "home": Bson::Null, "work": Bson::Null } } },
        )
        .await
    }

    async fn save_tokens(
        &self,
        user_id: &str,
        tokens: &TokenPair,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let users = &self.users;
        let filter = doc! { "user_id": user_id };
        let update = doc! {
            "$set": {
                "token": tokens.access_token.as_str(),
                "refresh_token": tokens.refresh_token.as_str(),
                "updated_at": bson::DateTime::from_chrono(updated_at),
            }
        };
        let options = UpdateOptions::builder().upsert(true).build();
        self.run("save_tokens", self.timeouts.query, IDEMPOTENT_ATTEMPTS, move || {
            users.update_one(filter.clone(), update.clone(), options.clone())
        })
        .await?;
        Ok(())
    }

    async fn record_audit(&self, entry: &AuditEntry) -> StoreResult<()> {
        let audit_logs = &self.audit_logs;
        self.run("record_audit", self.timeouts.query, SINGLE_ATTEMPT, move || {
            audit_logs.insert_one(entry, None)
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_zero_filter_accepts_unversioned_documents() {
        let id = ObjectId::new();
        let filter = cart_version_filter(id, 0);
        assert!(filter.contains_key("$or"));

        let filter = cart_version_filter(id, 3);
        assert_eq!(filter.get_i64("cart_version").ok(), Some(3));
        assert!(!filter.contains_key("$or"));
    }

    #[test]
    fn numeric_widens_aggregation_results() {
        assert_eq!(numeric(Some(&Bson::Int32(7))), 7);
        assert_eq!(numeric(Some(&Bson::Int64(9))), 9);
        assert_eq!(numeric(Some(&Bson::Double(4.0))), 4);
        assert_eq!(numeric(None), 0);
    }
}
