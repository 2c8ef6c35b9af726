use std::env;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => StoreBackend::Memory,
            _ => StoreBackend::Sqlite,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub store_backend: StoreBackend,
    pub default_credits: i64,
    pub slot_horizon_days: u32,
    pub store_timeout: Duration,
    pub read_retries: u32,
    pub providers_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "voicebook.db".to_string()),
            store_backend: env::var("STORE_BACKEND")
                .map(|v| StoreBackend::parse(&v))
                .unwrap_or(StoreBackend::Sqlite),
            default_credits: env::var("DEFAULT_CREDITS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v >= 0)
                .unwrap_or(10),
            slot_horizon_days: env::var("SLOT_HORIZON_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            store_timeout: Duration::from_millis(
                env::var("STORE_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2000),
            ),
            read_retries: env::var("READ_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            providers_file: env::var("PROVIDERS_FILE").ok().filter(|v| !v.is_empty()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: ":memory:".to_string(),
            store_backend: StoreBackend::Memory,
            default_credits: 10,
            slot_horizon_days: 30,
            store_timeout: Duration::from_millis(2000),
            read_retries: 3,
            providers_file: None,
        }
    }
}
