use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let places_api_url = require("REFNET_PLACES_API_URL")?;

    let env = parse_environment(&or_default("REFNET_ENV", "development"))?;

    let bind_addr = parse_addr("REFNET_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("REFNET_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("REFNET_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("REFNET_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("REFNET_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let places_api_key = lookup("REFNET_PLACES_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let geocode_api_url = or_default("REFNET_GEOCODE_API_URL", &places_api_url);
    let http_timeout_secs = parse_u64("REFNET_HTTP_TIMEOUT_SECS", "30")?;
    let http_user_agent = or_default("REFNET_HTTP_USER_AGENT", "refnet/0.1 (office-discovery)");
    let provider_max_retries = parse_u32("REFNET_PROVIDER_MAX_RETRIES", "1")?;
    let provider_retry_backoff_ms = parse_u64("REFNET_PROVIDER_RETRY_BACKOFF_MS", "500")?;
    let daily_external_call_limit = parse_u32("REFNET_DAILY_EXTERNAL_CALL_LIMIT", "25")?;
    let snapshot_dir = PathBuf::from(or_default("REFNET_SNAPSHOT_DIR", "./.refnet/sessions"));
    let cache_retention_days = parse_u32("REFNET_CACHE_RETENTION_DAYS", "30")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        places_api_url,
        places_api_key,
        geocode_api_url,
        http_timeout_secs,
        http_user_agent,
        provider_max_retries,
        provider_retry_backoff_ms,
        daily_external_call_limit,
        snapshot_dir,
        cache_retention_days,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "REFNET_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
