use crate::components::feed_sync::models::CalendarFeed;
use crate::error::{config_error, SyncResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Default identifying client label sent with feed requests
pub const DEFAULT_USER_AGENT: &str = concat!("familysync/", env!("CARGO_PKG_VERSION"), " Calendar Sync");

/// Days of history kept around the current time
pub const DEFAULT_WINDOW_PAST_DAYS: i64 = 30;

/// Days of future events kept around the current time
pub const DEFAULT_WINDOW_FUTURE_DAYS: i64 = 90;

/// Main configuration structure for the sync service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Redis connection URL; the in-memory store is used when unset
    pub redis_url: Option<String>,
    /// Zone used for floating and date-only feed times
    pub timezone: String,
    /// User-Agent header sent to feed hosts
    pub user_agent: String,
    /// Timeout for a single feed fetch, in seconds
    pub fetch_timeout_secs: u64,
    /// Interval between scheduled sync-all runs, in seconds
    pub sync_interval_secs: u64,
    /// Window start, in days before now
    pub window_past_days: i64,
    /// Window end, in days after now
    pub window_future_days: i64,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
    /// Feeds seeded into the store at startup
    #[serde(default)]
    pub feeds: Vec<CalendarFeed>,
}

impl Default for Config {
    fn default() -> Self {
        let mut components = HashMap::new();
        components.insert("feed_sync".to_string(), true);

        Self {
            redis_url: None,
            timezone: String::from("UTC"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_timeout_secs: 30,
            sync_interval_secs: 900,
            window_past_days: DEFAULT_WINDOW_PAST_DAYS,
            window_future_days: DEFAULT_WINDOW_FUTURE_DAYS,
            components,
            feeds: Vec::new(),
        }
    }
}

/// Layout of `config/feeds.toml`
#[derive(Debug, Deserialize)]
struct FeedsFile {
    #[serde(default)]
    feeds: Vec<CalendarFeed>,
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> SyncResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let defaults = Config::default();

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty());
        let timezone = env::var("TIMEZONE").unwrap_or(defaults.timezone);
        let user_agent = env::var("SYNC_USER_AGENT").unwrap_or(defaults.user_agent);

        let fetch_timeout_secs = parse_env("FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs)?;
        let sync_interval_secs = parse_env("SYNC_INTERVAL_SECS", defaults.sync_interval_secs)?;
        let window_past_days = parse_env("SYNC_WINDOW_PAST_DAYS", defaults.window_past_days)?;
        let window_future_days = parse_env("SYNC_WINDOW_FUTURE_DAYS", defaults.window_future_days)?;

        let mut components = defaults.components;
        if let Ok(content) = fs::read_to_string("config/components.toml") {
            if let Ok(file_components) = toml::from_str::<HashMap<String, bool>>(&content) {
                // Merge with defaults
                for (key, value) in file_components {
                    components.insert(key, value);
                }
            }
        }

        let feeds = if Path::new("config/feeds.toml").exists() {
            let content = fs::read_to_string("config/feeds.toml")?;
            toml::from_str::<FeedsFile>(&content)?.feeds
        } else {
            Vec::new()
        };

        let config = Config {
            redis_url,
            timezone,
            user_agent,
            fetch_timeout_secs,
            sync_interval_secs,
            window_past_days,
            window_future_days,
            components,
            feeds,
        };
        config.validate()?;

        Ok(config)
    }

    /// Check values that would otherwise fail later at sync time
    pub fn validate(&self) -> SyncResult<()> {
        self.floating_zone()?;
        if self.window_past_days < 0 || self.window_future_days < 0 {
            return Err(config_error("Sync window days must not be negative"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(config_error("FETCH_TIMEOUT_SECS must be greater than zero"));
        }
        Ok(())
    }

    /// Zone that floating and date-only feed times are interpreted in
    pub fn floating_zone(&self) -> SyncResult<Tz> {
        Tz::from_str(&self.timezone)
            .map_err(|_| config_error(&format!("Unknown timezone: {}", self.timezone)))
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }
}

/// Read a numeric environment variable, falling back to a default when unset
fn parse_env<T: FromStr>(var: &str, default: T) -> SyncResult<T> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| config_error(&format!("Invalid {} format", var))),
        Err(_) => Ok(default),
    }
}
