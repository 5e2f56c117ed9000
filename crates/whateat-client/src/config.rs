//! Client configuration loaded from environment variables.
//!
//! Every setting has a default matching the production app, so the client
//! runs with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use whateat_shared::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_PAGE_LIMIT, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SECRET_SERVICE,
    MAX_COVER_IMAGE_BYTES, TOKEN_REFRESH_WINDOW_SECS,
};

/// Client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API root including the version prefix.
    /// Env: `WHATEAT_API_BASE_URL`
    pub api_base_url: String,

    /// Tokens expiring within this many seconds are refreshed first.
    /// Env: `WHATEAT_TOKEN_REFRESH_WINDOW_SECS`
    /// Default: `300`
    pub token_refresh_window_secs: i64,

    /// Saved-recipes page size.
    /// Env: `WHATEAT_PAGE_LIMIT`
    /// Default: `20`
    pub page_limit: u32,

    /// Largest cover image accepted before asking for an upload ticket.
    /// Env: `WHATEAT_MAX_COVER_IMAGE_BYTES`
    /// Default: 10 MiB
    pub max_cover_image_bytes: usize,

    /// Env: `WHATEAT_REQUEST_TIMEOUT_SECS`
    /// Default: `30`
    pub request_timeout: Duration,

    /// Secret store namespace.
    /// Env: `WHATEAT_SECRET_SERVICE`
    /// Default: `com.whatEat.auth`
    pub secret_service: String,

    /// Directory for the secret database and device key. `None` uses the
    /// platform data directory.
    /// Env: `WHATEAT_DATA_DIR`
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_refresh_window_secs: TOKEN_REFRESH_WINDOW_SECS,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_cover_image_bytes: MAX_COVER_IMAGE_BYTES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            secret_service: DEFAULT_SECRET_SERVICE.to_string(),
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup, so
    /// tests do not touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("WHATEAT_API_BASE_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                config.api_base_url = url.to_string();
            } else {
                tracing::warn!(value = %url, "Invalid WHATEAT_API_BASE_URL, using default");
            }
        }

        if let Some(val) = lookup("WHATEAT_TOKEN_REFRESH_WINDOW_SECS") {
            match val.trim().parse::<i64>() {
                Ok(secs) if secs >= 0 => config.token_refresh_window_secs = secs,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid WHATEAT_TOKEN_REFRESH_WINDOW_SECS, using default"
                ),
            }
        }

        if let Some(val) = lookup("WHATEAT_PAGE_LIMIT") {
            match val.trim().parse::<u32>() {
                Ok(limit) if limit > 0 => config.page_limit = limit,
                _ => tracing::warn!(value = %val, "Invalid WHATEAT_PAGE_LIMIT, using default"),
            }
        }

        if let Some(val) = lookup("WHATEAT_MAX_COVER_IMAGE_BYTES") {
            match val.trim().parse::<usize>() {
                Ok(max) if max > 0 => config.max_cover_image_bytes = max,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid WHATEAT_MAX_COVER_IMAGE_BYTES, using default"
                ),
            }
        }

        if let Some(val) = lookup("WHATEAT_REQUEST_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid WHATEAT_REQUEST_TIMEOUT_SECS, using default"
                ),
            }
        }

        if let Some(service) = lookup("WHATEAT_SECRET_SERVICE") {
            if !service.trim().is_empty() {
                config.secret_service = service.trim().to_string();
            }
        }

        if let Some(dir) = lookup("WHATEAT_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}
