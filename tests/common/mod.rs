#![allow(dead_code)]

use std::sync::Arc;

use bson::oid::ObjectId;
use storefront_api::{
    middleware::auth::AuthUser,
    models::{Product, User},
    services::token_service::TokenService,
    state::AppState,
    store::{Store, memory::MemoryStore},
};

pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), TokenService::new(SECRET));
        Self { state, store }
    }

    pub async fn user(&self) -> User {
        let user = User::new("Ada", "Lovelace", "ada@example.com");
        self.store.insert_user(&user).await.expect("insert user");
        user
    }

    pub async fn product(&self, name: &str, price: i64) -> Product {
        let product = Product {
            product_id: ObjectId::new(),
            product_name: name.to_string(),
            price,
            rating: Some(4),
            image: None,
        };
        self.store.insert_product(&product).await.expect("insert product");
        product
    }

    pub async fn reload(&self, user: &User) -> User {
        self.store
            .find_user(user.id)
            .await
            .expect("find user")
            .expect("user exists")
    }
}

pub fn caller(user: &User) -> AuthUser {
    AuthUser {
        email: user.email.clone().unwrap_or_default(),
        uid: user.user_id.clone(),
    }
}

/// A token holder for an arbitrary user id, e.g. one with no record.
pub fn caller_for(uid: &str) -> AuthUser {
    AuthUser {
        email: "ghost@example.com".into(),
        uid: uid.to_string(),
    }
}
