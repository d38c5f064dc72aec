// # Flight State
//
// Owned, in-memory tracking of the flights seen in the feed.

pub mod flight_registry;

pub use flight_registry::{FlightRegistry, SnapshotSummary, UpsertOutcome};
