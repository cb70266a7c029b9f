//! taskengine configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::analytics::DEFAULT_POPULAR_TAGS_LIMIT;
use crate::engine::query::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::engine::{EngineSettings, PageLimits};
use crate::state::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_EVENT_CAPACITY};

const CONFIG_FILE: &str = "taskengine.yml";

/// Main taskengine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Listing defaults
    pub query: QueryConfig,

    /// Report sizes
    pub analytics: AnalyticsConfig,

    /// Actor channel sizes
    pub manager: ManagerConfig,
}

impl Config {
    /// Check limits before use
    pub fn validate(&self) -> Result<()> {
        if self.query.default_limit == 0 || self.query.max_limit == 0 {
            return Err(eyre::eyre!("query limits must be at least 1"));
        }
        if self.query.max_limit > MAX_PAGE_LIMIT {
            return Err(eyre::eyre!(
                "query.max-limit ({}) exceeds the page size ceiling ({})",
                self.query.max_limit,
                MAX_PAGE_LIMIT
            ));
        }
        if self.query.default_limit > self.query.max_limit {
            return Err(eyre::eyre!(
                "query.default-limit ({}) exceeds query.max-limit ({})",
                self.query.default_limit,
                self.query.max_limit
            ));
        }
        if self.analytics.popular_tags_limit == 0 {
            return Err(eyre::eyre!("analytics.popular-tags-limit must be at least 1"));
        }
        if self.manager.channel_capacity == 0 || self.manager.event_capacity == 0 {
            return Err(eyre::eyre!("manager channel capacities must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// Explicit path, then `./taskengine.yml`, then
    /// `<config_dir>/taskengine/taskengine.yml`, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskengine").join(CONFIG_FILE);
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Engine tunables derived from this configuration
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            page_limits: PageLimits {
                default_limit: self.query.default_limit,
                max_limit: self.query.max_limit,
            },
            popular_tags_limit: self.analytics.popular_tags_limit,
        }
    }
}

/// Listing defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Page size when a request gives none
    #[serde(rename = "default-limit")]
    pub default_limit: u32,

    /// Largest page size a request may ask for
    #[serde(rename = "max-limit")]
    pub max_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Number of entries in the popular tags report
    #[serde(rename = "popular-tags-limit")]
    pub popular_tags_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            popular_tags_limit: DEFAULT_POPULAR_TAGS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Pending commands before callers wait
    #[serde(rename = "channel-capacity")]
    pub channel_capacity: usize,

    /// Events buffered per subscriber before it lags
    #[serde(rename = "event-capacity")]
    pub event_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
