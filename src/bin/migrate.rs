use storefront_api::{config::AppConfig, db::connect_mongo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let store = connect_mongo(&config).await?;
    store.ensure_indexes().await?;
    println!("Indexes ensured on database {}", config.database_name);
    Ok(())
}
