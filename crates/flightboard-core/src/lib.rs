// # flightboard-core
//
// Core library for the flightboard status notifier.
//
// ## Architecture Overview
//
// This library watches a periodically refreshed flight board and posts one
// notification per meaningful change in a flight's status:
// - **FeedSource**: Trait for fetching flight board snapshots
// - **NotificationSink**: Trait for delivering rendered notifications
// - **FlightState**: Per-flight schedule, remarks and change detection
// - **FlightRegistry**: Keyed collection of tracked flights
// - **PollEngine**: Core engine that runs the fetch → upsert → notify cycle
// - **ComponentRegistry**: Plugin-based registry for feed sources and sinks
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Change detection is separate from I/O
// 2. **Derived Status**: A flight's status is always recomputed from its remarks
// 3. **Plugin-Based**: Components are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **At-Most-Once**: A change is posted once, even if delivery fails

pub mod config;
pub mod engine;
pub mod error;
pub mod flight;
pub mod notification;
pub mod registry;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, FeedConfig, FlightboardConfig, NotifierConfig};
pub use engine::{EngineEvent, LoopState, PollEngine, TickReport};
pub use error::{Error, Result};
pub use flight::{Airport, FeedSnapshot, FlightRecord, FlightState, FlightStatus, classify};
pub use notification::{LogNotificationSink, Notification};
pub use registry::ComponentRegistry;
pub use state::FlightRegistry;
pub use traits::{DeliveryOutcome, FeedSource, NotificationSink};
