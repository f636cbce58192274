//! Runs against a live MongoDB when `TEST_MONGODB_URI` (or `MONGODB_URI`) is
//! set; otherwise every test returns early.

use bson::oid::ObjectId;
use storefront_api::{
    models::{Address, AddressEdit, AddressSlot, Order, Product, ProductUser, User},
    store::{
        Store,
        mongo::{MongoStore, StoreTimeouts},
    },
};

async fn store(name: &str) -> Option<MongoStore> {
    let uri = match std::env::var("TEST_MONGODB_URI").or_else(|_| std::env::var("MONGODB_URI")) {
        Ok(uri) => uri,
        Err(_) => {
            eprintln!("Skipping test: set TEST_MONGODB_URI or MONGODB_URI to run mongo flow tests.");
            return None;
        }
    };
    let database = format!("storefront_test_{name}");
    let store = MongoStore::connect(&uri, &database, StoreTimeouts::default())
        .await
        .expect("connect to mongodb");
    store.reset().await.expect("reset collections");
    store.ensure_indexes().await.expect("create indexes");
    Some(store)
}

async fn seeded(store: &MongoStore) -> (User, Product) {
    let user = User::new("Ada", "Lovelace", "ada@example.com");
    store.insert_user(&user).await.expect("insert user");
    let product = Product {
        product_id: ObjectId::new(),
        product_name: "Ferris Mug".into(),
        price: 1200,
        rating: Some(5),
        image: None,
    };
    store.insert_product(&product).await.expect("insert product");
    (user, product)
}

#[tokio::test]
async fn cart_total_and_checkout_round_trip() {
    let Some(store) = store("cart").await else {
        return;
    };
    let (user, product) = seeded(&store).await;

    let items = store.find_products(product.product_id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert!(store.push_cart_items(user.id, &items).await.unwrap());
    assert!(store.push_cart_items(user.id, &items).await.unwrap());
    assert_eq!(store.cart_total(user.id).await.unwrap(), 2400);

    let snapshot = store.cart_snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(snapshot.items.len(), 2);
    assert_eq!(snapshot.total, 2400);
    assert_eq!(snapshot.version, 2);

    let order = Order::cash_on_delivery(snapshot.total, snapshot.items.clone());
    // A stale version loses.
    assert!(!store.commit_checkout(user.id, &order, 1).await.unwrap());
    assert!(store.commit_checkout(user.id, &order, snapshot.version).await.unwrap());
    // The same snapshot cannot be committed twice.
    assert!(!store.commit_checkout(user.id, &order, snapshot.version).await.unwrap());

    let after = store.find_user(user.id).await.unwrap().unwrap();
    assert!(after.usercart.is_empty());
    assert_eq!(after.orders.len(), 1);
    assert_eq!(after.orders[0].price, 2400);
    assert_eq!(store.cart_total(user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn pull_removes_every_line_of_a_product() {
    let Some(store) = store("pull").await else {
        return;
    };
    let (user, product) = seeded(&store).await;
    let line = ProductUser::from(product.clone());

    store.push_cart_items(user.id, &[line.clone(), line]).await.unwrap();
    assert!(store.pull_cart_item(user.id, product.product_id).await.unwrap());
    assert_eq!(store.cart_total(user.id).await.unwrap(), 0);
    assert!(!store.pull_cart_item(ObjectId::new(), product.product_id).await.unwrap());
}

#[tokio::test]
async fn address_slots_fill_once_and_edit_in_place() {
    let Some(store) = store("address").await else {
        return;
    };
    let (user, _) = seeded(&store).await;
    let address = Address {
        address_id: ObjectId::new(),
        house_name: Some("1".into()),
        street_name: Some("Main Street".into()),
        city_name: Some("Pune".into()),
        pin_code: Some("411001".into()),
    };

    assert!(store.fill_address_slot(user.id, AddressSlot::Home, &address).await.unwrap());
    assert!(!store.fill_address_slot(user.id, AddressSlot::Home, &address).await.unwrap());

    let edit = AddressEdit {
        city_name: Some("Mumbai".into()),
        ..Default::default()
    };
    assert!(store.edit_address_slot(user.id, AddressSlot::Home, &edit).await.unwrap());
    assert!(!store.edit_address_slot(user.id, AddressSlot::Work, &edit).await.unwrap());

    let after = store.find_user(user.id).await.unwrap().unwrap();
    let home = after.address.home.unwrap();
    assert_eq!(home.city_name.as_deref(), Some("Mumbai"));
    assert_eq!(home.house_name.as_deref(), Some("1"));
    assert!(after.address.work.is_none());

    assert!(store.clear_addresses(user.id).await.unwrap());
    assert_eq!(store.find_user(user.id).await.unwrap().unwrap().address.count(), 0);
}

#[tokio::test]
async fn search_escapes_the_needle() {
    let Some(store) = store("search").await else {
        return;
    };
    seeded(&store).await;

    assert_eq!(store.search_products("ferris").await.unwrap().len(), 1);
    assert!(store.search_products("f.rris").await.unwrap().is_empty());
    let (page, total) = store.list_products(0, 10).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(total, 1);
}
