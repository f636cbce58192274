use bson::oid::ObjectId;
use storefront_api::{
    config::AppConfig,
    db::connect_mongo,
    models::{Product, User},
    services::token_service::{TokenService, persist_token_pair},
    store::{Store, mongo::MongoStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let store = connect_mongo(&config).await?;
    // Ensure indexes exist before inserting.
    store.ensure_indexes().await?;

    let tokens = TokenService::new(&config.jwt_secret);
    let user = seed_user(&store, &tokens, "Ferris", "Crab", "ferris@example.com").await?;
    seed_products(&store).await?;

    println!("Seed completed. User ID: {}", user.user_id);
    Ok(())
}

async fn seed_user(
    store: &MongoStore,
    tokens: &TokenService,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> anyhow::Result<User> {
    let user = User::new(first_name, last_name, email);
    store.insert_user(&user).await?;

    let pair = tokens.issue_pair(email, first_name, last_name, &user.user_id)?;
    persist_token_pair(store, &pair, &user.user_id).await?;

    println!("Ensured user {email}");
    println!("Access token: Bearer {}", pair.access_token);
    println!("Refresh token: {}", pair.refresh_token);
    Ok(user)
}

async fn seed_products(store: &MongoStore) -> anyhow::Result<()> {
    let products = vec![
        ("Axum Hoodie", 550000, 5, "hoodie.png"),
        ("Ferris Mug", 120000, 4, "mug.png"),
        ("Rust Sticker Pack", 50000, 5, "stickers.png"),
        ("E-book: Async Rust", 250000, 4, "ebook.png"),
    ];

    for (name, price, rating, image) in products {
        if !store.search_products(name).await?.is_empty() {
            continue;
        }
        let product = Product {
            product_id: ObjectId::new(),
            product_name: name.to_string(),
            price,
            rating: Some(rating),
            image: Some(image.to_string()),
        };
        store.insert_product(&product).await?;
    }

    println!("Seeded products");
    Ok(())
}
