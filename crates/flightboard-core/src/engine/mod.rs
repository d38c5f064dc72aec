//! Core poll engine
//!
//! The PollEngine is responsible for:
//! - Fetching feed snapshots via FeedSource on a fixed cadence
//! - Applying them to the owned FlightRegistry
//! - Delivering notifications via NotificationSink for flights that need one
//! - Marking those flights posted, whatever the delivery outcome
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ FeedSource  │──── FeedSnapshot ──────┐
//! └─────────────┘                        │
//!                                        ▼
//!                               ┌──────────────┐
//!                               │  PollEngine  │
//!                               └──────────────┘
//!                                        │
//!         ┌──────────────────────────────┼──────────────────────────┐
//!         │                              │                          │
//!         ▼                              ▼                          ▼
//! ┌────────────────┐          ┌──────────────────┐          ┌─────────────┐
//! │ FlightRegistry │          │ NotificationSink │          │   Events    │
//! │ (upsert)       │          │ (deliver)        │          │  (monitor)  │
//! └────────────────┘          └──────────────────┘          └─────────────┘
//! ```
//!
//! ## Tick Flow
//!
//! 1. Fetch the snapshot; on any failure the tick ends here
//! 2. Upsert every record (all upserts finish before any delivery)
//! 3. For every flight that needs posting: render, deliver, mark posted
//!
//! Stop requests are only observed between ticks.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::flight::{FeedSnapshot, FlightStatus};
use crate::notification::Notification;
use crate::state::{FlightRegistry, SnapshotSummary};
use crate::traits::{DeliveryOutcome, FeedSource, NotificationSink};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{MissedTickBehavior, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events emitted by the PollEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started polling
    Started {
        poll_interval: Duration,
    },

    /// A snapshot was fetched and applied
    SnapshotApplied {
        flights: usize,
        summary: SnapshotSummary,
    },

    /// Fetching the snapshot failed, the tick was skipped
    FetchFailed {
        error: String,
    },

    /// A notification reached its destination
    NotificationDelivered {
        flight_id: i64,
        status: FlightStatus,
    },

    /// The sink deliberately did not deliver
    NotificationSkipped {
        flight_id: i64,
        reason: String,
    },

    /// The delivery attempt failed or timed out
    NotificationFailed {
        flight_id: i64,
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Lifecycle state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Not polling; the feed resource is released
    Stopped,
    /// Polling; the feed resource is held
    Running,
}

/// What a single tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Registry changes, `None` if the fetch failed
    pub snapshot: Option<SnapshotSummary>,
    /// Flights a delivery was attempted for, in order
    pub posted: Vec<i64>,
}

impl TickReport {
    /// Whether the fetch succeeded and the snapshot was applied
    pub fn fetched(&self) -> bool {
        self.snapshot.is_some()
    }
}

/// Core poll engine
///
/// The engine owns the flight registry and drives the fetch → upsert →
/// notify cycle from a single task.
///
/// ## Lifecycle
///
/// 1. Create with [`PollEngine::new()`]
/// 2. Start with [`PollEngine::run_with_shutdown()`]
/// 3. Engine runs until the shutdown signal is observed between ticks
/// 4. The feed resource is released and the engine is `Stopped` again
///
/// A stopped engine keeps its registry and may be started again.
pub struct PollEngine {
    /// Feed source for snapshots
    feed: Box<dyn FeedSource>,

    /// Sink for notifications
    sink: Box<dyn NotificationSink>,

    /// Tracked flights
    registry: FlightRegistry,

    /// Time between two ticks
    poll_interval: Duration,

    /// Upper bound for one fetch
    fetch_timeout: Duration,

    /// Upper bound for one delivery
    delivery_timeout: Duration,

    /// Current lifecycle state
    state: LoopState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl PollEngine {
    /// Create a new poll engine
    ///
    /// # Parameters
    ///
    /// - `feed`: Feed source implementation
    /// - `sink`: Notification sink implementation
    /// - `config`: Engine configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        feed: Box<dyn FeedSource>,
        sink: Box<dyn NotificationSink>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            feed,
            sink,
            registry: FlightRegistry::with_eviction(config.evict_after_missed_snapshots),
            poll_interval: config.poll_interval(),
            fetch_timeout: config.fetch_timeout(),
            delivery_timeout: config.delivery_timeout(),
            state: LoopState::Stopped,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine until `shutdown` is cancelled
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: The feed resource could not be acquired
    pub async fn run_with_shutdown(&mut self, shutdown: CancellationToken) -> Result<()> {
        self.feed.connect().await.map_err(|e| {
            error!("Failed to connect feed source {}: {}", self.feed.source_name(), e);
            e
        })?;

        self.state = LoopState::Running;
        info!(
            "Polling {} every {:?}, notifying via {}",
            self.feed.source_name(),
            self.poll_interval,
            self.sink.sink_name()
        );
        self.emit_event(EngineEvent::Started {
            poll_interval: self.poll_interval,
        });

        self.poll_until_cancelled(&shutdown).await;

        self.feed.disconnect().await;
        self.state = LoopState::Stopped;
        info!("Feed source released, engine stopped");
        self.emit_event(EngineEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });

        Ok(())
    }

    async fn poll_until_cancelled(&mut self, shutdown: &CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    return;
                }

                _ = ticker.tick() => {}
            }

            // Runs outside the select so a stop request never interrupts it
            self.tick().await;
        }
    }

    /// Run one fetch → upsert → notify cycle now
    pub async fn tick(&mut self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// Run one cycle with `now` as the current instant
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> TickReport {
        let snapshot = match self.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Skipping tick, fetch from {} failed: {}", self.feed.source_name(), e);
                self.emit_event(EngineEvent::FetchFailed {
                    error: e.to_string(),
                });
                return TickReport::default();
            }
        };

        let mut summary = self.registry.apply_snapshot(&snapshot.records, now);
        summary.rejected += snapshot.undecodable;
        debug!(
            "Applied snapshot of {} record(s): {} new, {} updated, {} rejected, {} evicted",
            snapshot.len(),
            summary.created,
            summary.updated,
            summary.rejected,
            summary.evicted.len()
        );
        self.emit_event(EngineEvent::SnapshotApplied {
            flights: self.registry.len(),
            summary: summary.clone(),
        });

        let posted = self.dispatch_pending(now).await;

        TickReport {
            snapshot: Some(summary),
            posted,
        }
    }

    async fn fetch(&self) -> Result<FeedSnapshot> {
        match timeout(self.fetch_timeout, self.feed.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.fetch_timeout)),
        }
    }

    /// Deliver and mark posted every flight that needs it
    async fn dispatch_pending(&mut self, now: DateTime<Utc>) -> Vec<i64> {
        let pending = self.registry.pending_ids(now);

        for &flight_id in &pending {
            let Some(flight) = self.registry.get(flight_id) else {
                continue;
            };
            let notification = Notification::for_flight(flight);

            self.deliver(&notification).await;

            if let Some(flight) = self.registry.get_mut(flight_id) {
                flight.mark_posted();
            }
        }

        pending
    }

    /// Deliver one notification; failures are logged, never returned
    async fn deliver(&self, notification: &Notification) {
        let flight_id = notification.flight_id;
        let result = match timeout(self.delivery_timeout, self.sink.deliver(notification)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.delivery_timeout)),
        };

        match result {
            Ok(DeliveryOutcome::Delivered) => {
                info!("Posted {} ({})", notification.title, notification.status);
                self.emit_event(EngineEvent::NotificationDelivered {
                    flight_id,
                    status: notification.status,
                });
            }
            Ok(DeliveryOutcome::Skipped { reason }) => {
                debug!("Skipped posting {}: {}", notification.title, reason);
                self.emit_event(EngineEvent::NotificationSkipped { flight_id, reason });
            }
            Err(e) => {
                error!(
                    "Failed to post {} via {}: {}",
                    notification.title,
                    self.sink.sink_name(),
                    e
                );
                self.emit_event(EngineEvent::NotificationFailed {
                    flight_id,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, event discarded");
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// The tracked flights
    pub fn registry(&self) -> &FlightRegistry {
        &self.registry
    }

    /// Time between two ticks
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
