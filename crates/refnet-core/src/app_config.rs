use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Base URL of the places edge function.
    pub places_api_url: String,
    pub places_api_key: Option<String>,
    /// Base URL of the ZIP geocoding endpoint. Defaults to `places_api_url`.
    pub geocode_api_url: String,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub provider_max_retries: u32,
    pub provider_retry_backoff_ms: u64,
    pub daily_external_call_limit: u32,
    pub snapshot_dir: PathBuf,
    pub cache_retention_days: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("places_api_url", &self.places_api_url)
            .field(
                "places_api_key",
                &self.places_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("geocode_api_url", &self.geocode_api_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("provider_max_retries", &self.provider_max_retries)
            .field("provider_retry_backoff_ms", &self.provider_retry_backoff_ms)
            .field("daily_external_call_limit", &self.daily_external_call_limit)
            .field("snapshot_dir", &self.snapshot_dir)
            .field("cache_retention_days", &self.cache_retention_days)
            .finish()
    }
}
