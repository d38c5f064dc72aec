//! Collaborator traits for the flightboard system
//!
//! The core consumes exactly two external interfaces:
//!
//! - [`FeedSource`]: fetch the current flight board snapshot
//! - [`NotificationSink`]: deliver a notification for one flight

pub mod feed_source;
pub mod notification_sink;

pub use feed_source::{FeedSource, FeedSourceFactory};
pub use notification_sink::{DeliveryOutcome, NotificationSink, NotificationSinkFactory};
