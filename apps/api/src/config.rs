use anyhow::{Context, Result};

use crate::auth::identity_toolkit::DEFAULT_BASE_URL;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub identity_api_key: String,
    pub identity_base_url: String,
    /// Directory for the offline document cache.
    pub cache_dir: String,
    pub admin_email: String,
    pub app_name: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: require_env(&lookup, "DATABASE_URL")?,
            identity_api_key: require_env(&lookup, "IDENTITY_API_KEY")?,
            identity_base_url: or("IDENTITY_BASE_URL", DEFAULT_BASE_URL),
            cache_dir: or("CACHE_DIR", ".cvbuilder-cache"),
            admin_email: or("ADMIN_EMAIL", "admin@cvbuilder.com"),
            app_name: or("APP_NAME", "CV Builder Pro"),
            port: or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: or("RUST_LOG", "info"),
        })
    }
}

fn require_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
