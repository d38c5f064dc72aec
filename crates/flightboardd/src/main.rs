// # flightboardd - Flightboard Daemon
//
// This is a THIN integration layer. Change detection, rendering and the poll
// loop live in flightboard-core; nothing here decides what gets posted.
//
// The flightboardd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering feed sources and notifiers
// 4. Running the poll engine until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Feed
// - `FLIGHTBOARD_FEED_URL`: URL of the flight board JSON (default: simfest board)
//
// ### Notifier
// - `FLIGHTBOARD_NOTIFIER_TYPE`: Notifier type (discord, log; default: discord)
// - `FLIGHTBOARD_DISCORD_TOKEN`: Bot token (for discord)
// - `FLIGHTBOARD_DISCORD_CHANNEL_ID`: Destination channel id (for discord)
// - `FLIGHTBOARD_DRY_RUN`: Log payloads instead of posting (true/false)
//
// ### Engine
// - `FLIGHTBOARD_POLL_INTERVAL_SECS`: Seconds between polls (5..=3600, default: 15)
// - `FLIGHTBOARD_EVICT_AFTER`: Missed snapshots before a flight is dropped (0 = never)
//
// ### Logging
// - `FLIGHTBOARD_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export FLIGHTBOARD_DISCORD_TOKEN=your_token
// export FLIGHTBOARD_DISCORD_CHANNEL_ID=906256414668902440
//
// flightboardd
// ```

use anyhow::Result;
use flightboard_core::config::DEFAULT_FEED_URL;
use flightboard_core::engine::EngineEvent;
use flightboard_core::{
    ComponentRegistry, EngineConfig, FeedConfig, FlightboardConfig, NotifierConfig, PollEngine,
};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long the engine may take to finish its current tick after a signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlightboardExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<FlightboardExitCode> for ExitCode {
    fn from(code: FlightboardExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration, as read from the environment
#[derive(Clone, PartialEq, Eq)]
struct Config {
    feed_url: String,
    notifier_type: String,
    discord_token: Option<String>,
    discord_channel_id: Option<String>,
    dry_run: bool,
    poll_interval_secs: Option<u64>,
    evict_after: Option<u32>,
    log_level: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("feed_url", &self.feed_url)
            .field("notifier_type", &self.notifier_type)
            .field("discord_token", &self.discord_token.as_ref().map(|_| "<REDACTED>"))
            .field("discord_channel_id", &self.discord_channel_id)
            .field("dry_run", &self.dry_run)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("evict_after", &self.evict_after)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            notifier_type: "discord".to_string(),
            discord_token: None,
            discord_channel_id: None,
            dry_run: false,
            poll_interval_secs: None,
            evict_after: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            feed_url: env::var("FLIGHTBOARD_FEED_URL").unwrap_or(defaults.feed_url),
            notifier_type: env::var("FLIGHTBOARD_NOTIFIER_TYPE")
                .unwrap_or(defaults.notifier_type),
            discord_token: env::var("FLIGHTBOARD_DISCORD_TOKEN").ok(),
            discord_channel_id: env::var("FLIGHTBOARD_DISCORD_CHANNEL_ID").ok(),
            dry_run: env::var("FLIGHTBOARD_DRY_RUN")
                .ok()
                .map(|v| parse_bool("FLIGHTBOARD_DRY_RUN", &v))
                .transpose()?
                .unwrap_or(false),
            poll_interval_secs: parse_var("FLIGHTBOARD_POLL_INTERVAL_SECS")?,
            evict_after: parse_var("FLIGHTBOARD_EVICT_AFTER")?,
            log_level: env::var("FLIGHTBOARD_LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// Validate the configuration
    ///
    /// This covers what the core cannot check itself: presence of the
    /// Discord credentials, the numeric format of the channel id, the poll
    /// interval range and the log level.
    fn validate(&self) -> Result<()> {
        match self.notifier_type.as_str() {
            "discord" => {
                if self.discord_token.as_ref().is_none_or(|t| t.is_empty()) {
                    anyhow::bail!(
                        "FLIGHTBOARD_DISCORD_TOKEN is required when FLIGHTBOARD_NOTIFIER_TYPE=discord. \
                        Set it via: export FLIGHTBOARD_DISCORD_TOKEN=your_token"
                    );
                }

                let token_lower = self
                    .discord_token
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase();
                if token_lower.contains("your_token") || token_lower.contains("replace_me") {
                    anyhow::bail!(
                        "FLIGHTBOARD_DISCORD_TOKEN appears to be a placeholder. \
                        Use the token of your Discord bot."
                    );
                }

                self.channel_id()?;
            }
            "log" => {}
            _ => anyhow::bail!(
                "FLIGHTBOARD_NOTIFIER_TYPE '{}' is not supported. \
                Supported notifiers: discord, log",
                self.notifier_type
            ),
        }

        if let Some(interval) = self.poll_interval_secs
            && !(5..=3600).contains(&interval)
        {
            anyhow::bail!(
                "FLIGHTBOARD_POLL_INTERVAL_SECS must be between 5 and 3600 seconds. Got: {}",
                interval
            );
        }

        if self.feed_url.starts_with("http://") {
            eprintln!(
                "WARNING: FLIGHTBOARD_FEED_URL uses HTTP (not HTTPS). \
                Consider using HTTPS."
            );
        }

        self.log_level()?;
        Ok(())
    }

    fn channel_id(&self) -> Result<u64> {
        let raw = self.discord_channel_id.as_deref().unwrap_or_default();
        if raw.is_empty() {
            anyhow::bail!(
                "FLIGHTBOARD_DISCORD_CHANNEL_ID is required when FLIGHTBOARD_NOTIFIER_TYPE=discord"
            );
        }
        match raw.parse::<u64>() {
            Ok(id) if id > 0 => Ok(id),
            _ => anyhow::bail!(
                "FLIGHTBOARD_DISCORD_CHANNEL_ID must be a numeric channel id. Got: {}",
                raw
            ),
        }
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "FLIGHTBOARD_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Build the core configuration
    fn to_flightboard_config(&self) -> Result<FlightboardConfig> {
        let notifier = match self.notifier_type.as_str() {
            "discord" => NotifierConfig::Discord {
                bot_token: self.discord_token.clone().unwrap_or_default(),
                channel_id: self.channel_id()?,
                dry_run: self.dry_run,
            },
            _ => NotifierConfig::Log,
        };

        let mut engine = EngineConfig::default();
        if let Some(interval) = self.poll_interval_secs {
            engine.poll_interval_secs = interval;
        }
        if let Some(evict_after) = self.evict_after {
            engine.evict_after_missed_snapshots = evict_after;
        }

        let config = FlightboardConfig {
            feed: FeedConfig::Http {
                url: self.feed_url.clone(),
            },
            notifier,
            engine,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} is not valid ('{}'): {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", name, raw),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return FlightboardExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return FlightboardExitCode::ConfigError.into();
    }

    let flightboard_config = match config.to_flightboard_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return FlightboardExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FlightboardExitCode::ConfigError.into();
    }

    info!("Starting flightboardd daemon");
    info!(
        "Configuration loaded: feed={}, notifier={}",
        config.feed_url, config.notifier_type
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FlightboardExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (engine, events) = match build_engine(flightboard_config) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup error: {}", e);
                return FlightboardExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(engine, events).await {
            error!("Daemon error: {}", e);
            FlightboardExitCode::RuntimeError
        } else {
            FlightboardExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Register components and create the engine
fn build_engine(config: FlightboardConfig) -> Result<(PollEngine, mpsc::Receiver<EngineEvent>)> {
    let registry = ComponentRegistry::with_builtins();

    #[cfg(feature = "http")]
    {
        info!("Registering HTTP feed source");
        flightboard_feed_http::register(&registry);
    }

    #[cfg(feature = "discord")]
    {
        info!("Registering Discord notifier");
        flightboard_notifier_discord::register(&registry);
    }

    let feed = registry.create_feed_source(&config.feed)?;
    let sink = registry.create_notifier(&config.notifier)?;
    let (engine, events) = PollEngine::new(feed, sink, config.engine)?;
    Ok((engine, events))
}

/// Run the engine until a shutdown signal, then stop it within the grace period
async fn run_daemon(mut engine: PollEngine, events: mpsc::Receiver<EngineEvent>) -> Result<()> {
    let shutdown = CancellationToken::new();
    let event_task = tokio::spawn(log_events(events));

    let mut engine_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { engine.run_with_shutdown(shutdown).await }
    });

    let outcome = tokio::select! {
        joined = &mut engine_task => {
            // Only a failed start ends the engine without a signal
            match joined {
                Ok(result) => result.map_err(anyhow::Error::from),
                Err(e) => Err(anyhow::anyhow!("Engine task failed: {}", e)),
            }
        }
        signal = wait_for_shutdown() => {
            let signal = signal?;
            info!("Received shutdown signal: {}", signal);
            shutdown.cancel();

            match tokio::time::timeout(SHUTDOWN_GRACE, &mut engine_task).await {
                Ok(Ok(result)) => result.map_err(anyhow::Error::from),
                Ok(Err(e)) => Err(anyhow::anyhow!("Engine task failed: {}", e)),
                Err(_) => {
                    engine_task.abort();
                    Err(anyhow::anyhow!("Shutdown timeout after {:?}", SHUTDOWN_GRACE))
                }
            }
        }
    };

    // The event stream ends once the engine is dropped
    if let Err(e) = event_task.await {
        warn!("Event logger failed: {}", e);
    }

    if outcome.is_ok() {
        info!("Shutting down daemon");
    }
    outcome
}

/// Log engine events that the engine itself does not summarise
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::SnapshotApplied { flights, summary } if !summary.evicted.is_empty() => {
                info!(
                    "Stopped tracking {} flight(s) absent from the board, {} remain",
                    summary.evicted.len(),
                    flights
                );
            }
            EngineEvent::Stopped { reason } => info!("Engine stopped: {}", reason),
            other => debug!("Engine event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
