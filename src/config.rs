use std::{env, str::FromStr, time::Duration};

use anyhow::bail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown STORE_BACKEND `{other}`"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongodb_uri: String,
    pub database_name: String,
    pub store_backend: StoreBackend,
    pub jwt_secret: String,
    pub cart_timeout: Duration,
    pub query_timeout: Duration,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = match env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Mongo,
        };
        let mongodb_uri = match store_backend {
            StoreBackend::Mongo => env::var("MONGODB_URI")?,
            StoreBackend::Memory => env::var("MONGODB_URI").unwrap_or_default(),
        };
        let jwt_secret = env::var("JWT_SECRET")?;
        let database_name = env::var("DATABASE_NAME").unwrap_or_else(|_| "Ecommerce".to_string());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            mongodb_uri,
            database_name,
            store_backend,
            jwt_secret,
            cart_timeout: secs_from_env("CART_TIMEOUT_SECS", 5),
            query_timeout: secs_from_env("QUERY_TIMEOUT_SECS", 15),
            host,
            port,
        })
    }
}

fn secs_from_env(key: &str, default: u64) -> Duration {
    let secs = env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}
