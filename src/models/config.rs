//! Configuration for the Fraud Explorer
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file. Defaults live in utils/constants.rs.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_FLIPSIDE_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LOOKBACK_DAYS,
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_TRANSFER_LIMIT, DIRECTORY_CACHE_TTL_SECS,
    TRANSFER_CACHE_TTL_SECS,
};

/// Flipside query API settings
#[derive(Debug, Clone)]
pub struct FlipsideConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// How long a query run may take before we give up
    pub query_timeout: Duration,
}

/// Supabase directory settings
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub key: Option<String>,
}

/// Configuration for the Fraud Explorer
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub flipside: FlipsideConfig,
    pub supabase: SupabaseConfig,
    /// Where the search history is persisted
    pub history_path: PathBuf,
    /// Transfers older than this are ignored
    pub lookback_days: u32,
    /// Maximum transfers per assessment
    pub transfer_limit: u32,
    /// Timeout for individual HTTP requests
    pub http_timeout: Duration,
    pub transfer_cache_ttl: Duration,
    pub directory_cache_ttl: Duration,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            flipside: FlipsideConfig {
                api_key: None,
                base_url: DEFAULT_FLIPSIDE_BASE_URL.to_string(),
                query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            },
            supabase: SupabaseConfig {
                url: None,
                key: None,
            },
            history_path: PathBuf::from("./search_history.json"),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            transfer_limit: DEFAULT_TRANSFER_LIMIT,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            transfer_cache_ttl: Duration::from_secs(TRANSFER_CACHE_TTL_SECS),
            directory_cache_ttl: Duration::from_secs(DIRECTORY_CACHE_TTL_SECS),
        }
    }
}

impl ExplorerConfig {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> AppResult<Self> {
        if dotenv::dotenv().is_ok() {
            info!("📄 Loaded environment from .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let flipside_key = get("FLIPSIDE_API_KEY");
        let supabase_key = get("SUPABASE_KEY");
        if flipside_key.is_some() {
            info!("🔑 FLIPSIDE_API_KEY configured (key hidden)");
        }
        if supabase_key.is_some() {
            info!("🔑 SUPABASE_KEY configured (key hidden)");
        }

        let query_timeout_secs: u64 = parse_or(
            get("FRAUD_EXPLORER_QUERY_TIMEOUT_SECS"),
            "FRAUD_EXPLORER_QUERY_TIMEOUT_SECS",
            defaults.flipside.query_timeout.as_secs(),
        )?;

        let lookback_days: u32 = parse_or(
            get("FRAUD_EXPLORER_LOOKBACK_DAYS"),
            "FRAUD_EXPLORER_LOOKBACK_DAYS",
            defaults.lookback_days,
        )?;
        if lookback_days == 0 {
            return Err(AppError::invalid_config("FRAUD_EXPLORER_LOOKBACK_DAYS", "0"));
        }

        let transfer_limit: u32 = parse_or(
            get("FRAUD_EXPLORER_TRANSFER_LIMIT"),
            "FRAUD_EXPLORER_TRANSFER_LIMIT",
            defaults.transfer_limit,
        )?;
        if transfer_limit == 0 {
            return Err(AppError::invalid_config("FRAUD_EXPLORER_TRANSFER_LIMIT", "0"));
        }

        Ok(Self {
            flipside: FlipsideConfig {
                api_key: flipside_key,
                base_url: get("FLIPSIDE_BASE_URL")
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.flipside.base_url),
                query_timeout: Duration::from_secs(query_timeout_secs),
            },
            supabase: SupabaseConfig {
                url: get("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string()),
                key: supabase_key,
            },
            history_path: get("FRAUD_EXPLORER_HISTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_path),
            lookback_days,
            transfer_limit,
            ..defaults
        })
    }

    /// Flipside key, required for live assessments
    pub fn require_flipside_key(&self) -> AppResult<&str> {
        self.flipside
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::missing_api_key("FLIPSIDE_API_KEY"))
    }

    /// Supabase URL and key, required for live assessments
    pub fn require_supabase(&self) -> AppResult<(&str, &str)> {
        let url = self
            .supabase
            .url
            .as_deref()
            .ok_or_else(|| {
                AppError::new(super::ErrorCode::ConfigMissingEnv, "Missing SUPABASE_URL")
            })?;
        let key = self
            .supabase
            .key
            .as_deref()
            .ok_or_else(|| AppError::missing_api_key("SUPABASE_KEY"))?;
        Ok((url, key))
    }
}

/// HTTP server settings for the API binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Accepted `X-API-Key` values. Empty means the API is open.
    pub api_keys: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("FRAUD_EXPLORER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        // Hosting platforms set PORT; FRAUD_EXPLORER_PORT is for local runs
        let port_raw = lookup("PORT").or_else(|| lookup("FRAUD_EXPLORER_PORT"));
        let port = parse_or(port_raw, "PORT", 8080u16)?;
        let api_keys = lookup("FRAUD_EXPLORER_API_KEYS")
            .map(|raw| {
                raw.split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            api_keys,
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> AppResult<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::invalid_config(key, &value)),
        None => Ok(default),
    }
}
