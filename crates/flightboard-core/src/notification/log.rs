// # Log Notification Sink
//
// Writes each notification to the log as a single line.
//
// ## When to Use
//
// - Running the daemon without chat credentials
// - Watching what would be posted during an event rehearsal

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::config::NotifierConfig;
use crate::error::{Error, Result};
use crate::notification::Notification;
use crate::traits::{DeliveryOutcome, NotificationSink, NotificationSinkFactory};

/// Notification sink that logs at `info`
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<DeliveryOutcome> {
        info!(
            flight_id = notification.flight_id,
            status = %notification.status,
            "{}",
            notification.render_text(Utc::now())
        );
        Ok(DeliveryOutcome::Delivered)
    }

    fn sink_name(&self) -> &'static str {
        "log"
    }
}

/// Factory for creating log sinks
pub struct LogNotifierFactory;

impl NotificationSinkFactory for LogNotifierFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn NotificationSink>> {
        match config {
            NotifierConfig::Log => Ok(Box::new(LogNotificationSink::new())),
            _ => Err(Error::config("Invalid config for log notifier")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::FlightStatus;

    #[tokio::test]
    async fn log_sink_always_delivers() {
        let sink = LogNotificationSink::new();
        let notification = Notification {
            flight_id: 1,
            status: FlightStatus::Unknown,
            title: "Flight #SF1".to_string(),
            from: "Heathrow (EGLL)".to_string(),
            to: "Gatwick (EGKK)".to_string(),
            description: None,
            timestamp: None,
            colour: crate::notification::NOTIFICATION_COLOUR,
        };

        let outcome = sink.deliver(&notification).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);
    }

    #[test]
    fn factory_rejects_other_configs() {
        let factory = LogNotifierFactory;
        assert!(factory.create(&NotifierConfig::Log).is_ok());

        let discord = NotifierConfig::Discord {
            bot_token: "token".to_string(),
            channel_id: 1,
            dry_run: true,
        };
        assert!(factory.create(&discord).is_err());
    }
}
