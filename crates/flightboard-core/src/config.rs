//! Configuration types for the flightboard system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public flight board of the event
pub const DEFAULT_FEED_URL: &str = "https://flightboard.simfest.co.uk/data/flightboard.json";

/// Main flightboard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightboardConfig {
    /// Feed source configuration
    #[serde(default)]
    pub feed: FeedConfig,

    /// Notification sink configuration
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl FlightboardConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.feed.validate()?;
        self.notifier.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Feed source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedConfig {
    /// JSON document fetched over HTTP
    Http {
        /// URL of the flight board JSON
        url: String,
    },

    /// Custom feed source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl FeedConfig {
    /// Validate the feed configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            FeedConfig::Http { url } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Feed URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Feed URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            FeedConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom feed factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom feed config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the feed source type name
    pub fn type_name(&self) -> &str {
        match self {
            FeedConfig::Http { .. } => "http",
            FeedConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig::Http {
            url: DEFAULT_FEED_URL.to_string(),
        }
    }
}

/// Notification sink configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Post embeds to a Discord channel
    Discord {
        /// Bot token
        bot_token: String,
        /// Destination channel id
        channel_id: u64,
        /// Log the payload instead of posting it
        #[serde(default)]
        dry_run: bool,
    },

    /// Write notifications to the log
    #[default]
    Log,

    /// Custom notification sink
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifierConfig::Discord {
                channel_id,
                dry_run,
                ..
            } => f
                .debug_struct("Discord")
                .field("bot_token", &"<REDACTED>")
                .field("channel_id", channel_id)
                .field("dry_run", dry_run)
                .finish(),
            NotifierConfig::Log => f.write_str("Log"),
            NotifierConfig::Custom { factory, config } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", config)
                .finish(),
        }
    }
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::Discord {
                bot_token,
                channel_id,
                ..
            } => {
                if bot_token.is_empty() {
                    return Err(crate::Error::config("Discord bot token cannot be empty"));
                }
                if *channel_id == 0 {
                    return Err(crate::Error::config("Discord channel id cannot be 0"));
                }
                Ok(())
            }
            NotifierConfig::Log => Ok(()),
            NotifierConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom notifier factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom notifier config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the notifier type name
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Discord { .. } => "discord",
            NotifierConfig::Log => "log",
            NotifierConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between two ticks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Upper bound for one feed fetch (in seconds)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Upper bound for one notification delivery (in seconds)
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,

    /// Consecutive snapshots a flight may be absent from before it is dropped
    ///
    /// Set to 0 to keep every flight for the lifetime of the process.
    #[serde(default = "default_evict_after_missed_snapshots")]
    pub evict_after_missed_snapshots: u32,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.fetch_timeout_secs == 0 || self.delivery_timeout_secs == 0 {
            return Err(crate::Error::config("Timeouts must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            evict_after_missed_snapshots: default_evict_after_missed_snapshots(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_delivery_timeout_secs() -> u64 {
    15
}

// One hour at the default cadence
fn default_evict_after_missed_snapshots() -> u32 {
    240
}

fn default_event_channel_capacity() -> usize {
    1000
}
