// # Notification Sink Trait
//
// Defines the interface for delivering rendered flight notifications.
//
// ## Implementations
//
// - Discord channel: `flightboard-notifier-discord` crate
// - Log output: `flightboard_core::notification::LogNotificationSink`

use async_trait::async_trait;

use crate::notification::Notification;

/// Result of a delivery attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The notification reached its destination
    Delivered,
    /// Delivery was deliberately not attempted
    ///
    /// Missing destination or missing permissions are skips, not errors.
    Skipped {
        /// Why it was skipped
        reason: String,
    },
}

impl DeliveryOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// Trait for notification sink implementations
///
/// Delivery is best-effort. The engine marks a flight as posted after every
/// attempt, whatever this returns, so a sink must not retry internally.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification to the configured destination
    ///
    /// # Returns
    ///
    /// - `Ok(DeliveryOutcome)`: Delivered or deliberately skipped
    /// - `Err(Error)`: The attempt failed (network, unexpected status)
    async fn deliver(&self, notification: &Notification) -> Result<DeliveryOutcome, crate::Error>;

    /// Sink name (for logging/debugging)
    fn sink_name(&self) -> &'static str;
}

/// Helper trait for constructing notification sinks from configuration
pub trait NotificationSinkFactory: Send + Sync {
    /// Create a NotificationSink instance from configuration
    fn create(
        &self,
        config: &crate::config::NotifierConfig,
    ) -> Result<Box<dyn NotificationSink>, crate::Error>;
}
