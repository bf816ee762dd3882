//! Configuration and settings management
//!
//! Loads settings from environment variables and defines runtime constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub bot_token: String,

    /// Comma-separated list of admin user IDs (access to /stats and /derr)
    #[serde(rename = "admins")]
    pub admins_str: Option<String>,

    /// Comma-separated whitelist of user IDs; empty means everyone is allowed
    #[serde(rename = "whitelist")]
    pub whitelist_str: Option<String>,

    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory for downloaded media before delivery
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: String,

    /// Port for the Prometheus metrics endpoint; 0 disables it
    #[serde(default)]
    pub metrics_port: u16,

    /// Language assigned to chats that have not picked one
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Album item limit assigned to new chats, also the instance-wide cap
    #[serde(default = "default_album_limit")]
    pub default_album_limit: u8,

    /// Hard ceiling for a single downloaded file, in bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Global timeout for one download dispatch, in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Interval between stats counter flushes to the database, in seconds
    #[serde(default = "default_stats_flush")]
    pub stats_flush_secs: u64,
}

fn default_database_path() -> String {
    "grabbot.db".to_string()
}

fn default_downloads_dir() -> String {
    "downloads".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

const fn default_album_limit() -> u8 {
    10
}

const fn default_max_file_size() -> u64 {
    1000 * 1024 * 1024
}

const fn default_download_timeout() -> u64 {
    600
}

const fn default_stats_flush() -> u64 {
    30
}

fn parse_id_list(raw: Option<&String>) -> HashSet<i64> {
    raw.map(|s| {
        s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .filter_map(|id| id.parse::<i64>().ok())
            .collect()
    })
    .unwrap_or_default()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case;
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Returns the set of Telegram IDs with admin access
    #[must_use]
    pub fn admins(&self) -> HashSet<i64> {
        parse_id_list(self.admins_str.as_ref())
    }

    /// Whether the given user may invoke admin-gated commands
    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins().contains(&user_id)
    }

    /// Whether the given user may use the bot at all.
    ///
    /// An empty or missing whitelist means the bot is open to everyone.
    #[must_use]
    pub fn is_whitelisted(&self, user_id: i64) -> bool {
        let whitelist = parse_id_list(self.whitelist_str.as_ref());
        whitelist.is_empty() || whitelist.contains(&user_id)
    }

    /// Album limit clamped to the valid range for this instance
    #[must_use]
    pub fn clamp_album_limit(&self, requested: u8) -> u8 {
        let cap = self.default_album_limit.clamp(1, MAX_ALBUM_LIMIT);
        requested.clamp(1, cap)
    }
}

/// Absolute ceiling for the per-chat album limit
pub const MAX_ALBUM_LIMIT: u8 = 20;

/// Album limit choices offered by the settings panel
pub const ALBUM_LIMIT_CHOICES: &[u8] = &[1, 2, 3, 5, 10, 15, 20];

// Telegram API retry configuration
/// Initial backoff delay for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff delay for Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Maximum retry attempts for Telegram API operations
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
