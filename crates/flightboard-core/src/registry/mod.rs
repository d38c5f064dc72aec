//! Plugin-based component registry
//!
//! The registry allows feed sources and notification sinks to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use flightboard_core::registry::ComponentRegistry;
//! use flightboard_core::config::FeedConfig;
//!
//! let registry = ComponentRegistry::with_builtins();
//! flightboard_feed_http::register(&registry);
//!
//! let feed = registry.create_feed_source(&FeedConfig::default())?;
//! ```
//!
//! ## Registration
//!
//! Implementation crates expose a `register()` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ComponentRegistry) {
//!     registry.register_notifier("discord", Box::new(DiscordNotifierFactory));
//! }
//! ```

use crate::config::{FeedConfig, NotifierConfig};
use crate::error::{Error, Result};
use crate::notification::LogNotifierFactory;
use crate::traits::{FeedSource, FeedSourceFactory, NotificationSink, NotificationSinkFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Component registry for plugin-based feed source and notifier creation
///
/// The registry maintains a map of type names to factory objects, allowing
/// dynamic instantiation of components based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered feed source factories
    feed_sources: RwLock<HashMap<String, Box<dyn FeedSourceFactory>>>,

    /// Registered notification sink factories
    notifiers: RwLock<HashMap<String, Box<dyn NotificationSinkFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the components that ship with the core
    ///
    /// Currently only the `log` notifier.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_notifier("log", Box::new(LogNotifierFactory));
        registry
    }

    /// Register a feed source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Feed source type name (e.g., "http")
    /// - `factory`: Factory object for creating feed source instances
    pub fn register_feed_source(
        &self,
        name: impl Into<String>,
        factory: Box<dyn FeedSourceFactory>,
    ) {
        let mut sources = self
            .feed_sources
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        sources.insert(name.into(), factory);
    }

    /// Register a notification sink factory
    ///
    /// # Parameters
    ///
    /// - `name`: Notifier type name (e.g., "discord", "log")
    /// - `factory`: Factory object for creating sink instances
    pub fn register_notifier(
        &self,
        name: impl Into<String>,
        factory: Box<dyn NotificationSinkFactory>,
    ) {
        let mut notifiers = self
            .notifiers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        notifiers.insert(name.into(), factory);
    }

    /// Create a feed source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn FeedSource>)`: Created feed source
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_feed_source(&self, config: &FeedConfig) -> Result<Box<dyn FeedSource>> {
        let source_type = config.type_name();
        let sources = self
            .feed_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown feed source type: {}", source_type)))?;

        factory.create(config)
    }

    /// Create a notification sink from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn NotificationSink>)`: Created sink
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_notifier(&self, config: &NotifierConfig) -> Result<Box<dyn NotificationSink>> {
        let notifier_type = config.type_name();
        let notifiers = self
            .notifiers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = notifiers
            .get(notifier_type)
            .ok_or_else(|| Error::config(format!("Unknown notifier type: {}", notifier_type)))?;

        factory.create(config)
    }

    /// List all registered feed source types
    pub fn list_feed_sources(&self) -> Vec<String> {
        let sources = self
            .feed_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        sources.keys().cloned().collect()
    }

    /// List all registered notifier types
    pub fn list_notifiers(&self) -> Vec<String> {
        let notifiers = self
            .notifiers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        notifiers.keys().cloned().collect()
    }

    /// Check if a feed source type is registered
    pub fn has_feed_source(&self, name: &str) -> bool {
        let sources = self
            .feed_sources
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }

    /// Check if a notifier type is registered
    pub fn has_notifier(&self, name: &str) -> bool {
        let notifiers = self
            .notifiers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        notifiers.contains_key(name)
    }
}
