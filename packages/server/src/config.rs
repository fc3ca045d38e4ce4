use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub upstream: UpstreamConfig,
    pub sync: SyncConfig,
    pub rate_limit: RateLimitConfig,
}

/// Credentials and endpoints for the MLS syndication API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub write_base_url: String,
    pub idx_token: String,
    pub vow_token: String,
    pub write_token: String,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub page_size: u64,
    pub media_concurrency: usize,
    pub cron: String,
    pub on_startup: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub per_second: u64,
    pub burst_size: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} must be set"))
        };
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let idx_token = required("IDX_BEARER_TOKEN")?;
        let write_token = lookup("UPSTREAM_WRITE_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| idx_token.clone());

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            port: parse_var(&lookup, "PORT", 3000)?,
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_issuer: or_default("JWT_ISSUER", "listings"),
            upstream: UpstreamConfig {
                base_url: or_default("AMPRE_BASE_URL", "https://query.ampre.ca/odata"),
                write_base_url: or_default(
                    "AMPRE_WRITE_BASE_URL",
                    "https://syndication.ampre.ca/webapi/odata",
                ),
                vow_token: required("VOW_BEARER_TOKEN")?,
                idx_token,
                write_token,
            },
            sync: SyncConfig {
                page_size: parse_var(&lookup, "SYNC_PAGE_SIZE", 100)?,
                media_concurrency: parse_var(&lookup, "SYNC_MEDIA_CONCURRENCY", 4)?,
                cron: or_default("SYNC_CRON", "0 0 */12 * * *"),
                on_startup: parse_var(&lookup, "SYNC_ON_STARTUP", false)?,
            },
            rate_limit: RateLimitConfig {
                per_second: parse_var(&lookup, "RATE_LIMIT_PER_SECOND", 10)?,
                burst_size: parse_var(&lookup, "RATE_LIMIT_BURST", 20)?,
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid value, got {raw:?}")),
        _ => Ok(default),
    }
}
