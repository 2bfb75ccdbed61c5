//! Configuration management for the client.

use std::env;
use std::time::Duration;

use shopsync_engine::Collection;

/// How long favorites and cart snapshots must stay unchanged before merging.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(3);

/// Number of products fetched from the catalog on login.
pub const DEFAULT_CATALOG_LIMIT: u32 = 194;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,
    /// Base URL of the catalog API
    pub catalog_base_url: String,
    /// How many products to fetch from the catalog
    pub catalog_limit: u32,
    /// Reconciliation timing
    pub sync: SyncSettings,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://shopsync.db".to_string());

        let catalog_base_url =
            env::var("CATALOG_BASE_URL").unwrap_or_else(|_| "https://dummyjson.com/".to_string());

        let catalog_limit = match env::var("CATALOG_LIMIT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid("CATALOG_LIMIT"))?,
            Err(_) => DEFAULT_CATALOG_LIMIT,
        };

        let quiet_period = match env::var("SYNC_QUIET_PERIOD_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse()
                    .map_err(|_| ConfigError::Invalid("SYNC_QUIET_PERIOD_MS"))?,
            ),
            Err(_) => DEFAULT_QUIET_PERIOD,
        };

        Ok(Self {
            database_url,
            catalog_base_url,
            catalog_limit,
            sync: SyncSettings::with_quiet_period(quiet_period),
        })
    }
}

/// Debounce timing for reconciliation jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub favorites_quiet_period: Duration,
    pub cart_quiet_period: Duration,
    pub orders_quiet_period: Duration,
}

impl SyncSettings {
    /// Favorites and cart wait `quiet_period`; orders merge immediately.
    pub fn with_quiet_period(quiet_period: Duration) -> Self {
        Self {
            favorites_quiet_period: quiet_period,
            cart_quiet_period: quiet_period,
            orders_quiet_period: Duration::ZERO,
        }
    }

    pub fn quiet_period(&self, collection: Collection) -> Duration {
        match collection {
            Collection::Favorites => self.favorites_quiet_period,
            Collection::Cart => self.cart_quiet_period,
            Collection::Orders => self.orders_quiet_period,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::with_quiet_period(DEFAULT_QUIET_PERIOD)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {0} value")]
    Invalid(&'static str),
}
