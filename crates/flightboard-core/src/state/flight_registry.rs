// # Flight Registry
//
// In-memory collection of tracked flights, keyed by feed identifier.
//
// ## Ownership
//
// The registry is plain owned state. The poll engine owns one and mutates it
// from its single task; nothing here is shared or locked.
//
// ## Eviction
//
// Flights absent from a snapshot are not dropped immediately. Each absence
// bumps a counter that any later sighting resets; once the counter reaches
// the configured limit the flight is evicted. A limit of 0 keeps every
// flight for the lifetime of the process.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::Result;
use crate::flight::{FlightRecord, FlightState};

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting, a new entry was created
    Created,
    /// An existing entry was updated in place
    Updated,
}

/// Result of applying one feed snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    /// Records that created a new flight
    pub created: usize,
    /// Records that updated a tracked flight
    pub updated: usize,
    /// Records skipped because their data was malformed
    pub rejected: usize,
    /// Flights dropped after too many missed snapshots
    pub evicted: Vec<i64>,
}

/// Keyed collection of [`FlightState`]
///
/// # Example
///
/// ```rust,no_run
/// use flightboard_core::state::FlightRegistry;
/// # fn demo(records: Vec<flightboard_core::flight::FlightRecord>) {
/// let mut registry = FlightRegistry::new();
/// let summary = registry.apply_snapshot(&records, chrono::Utc::now());
/// println!("{} new flight(s)", summary.created);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FlightRegistry {
    flights: BTreeMap<i64, FlightState>,
    evict_after: u32,
}

impl FlightRegistry {
    /// Create an empty registry that never evicts
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry that evicts flights absent from
    /// `evict_after` consecutive snapshots (0 disables eviction)
    pub fn with_eviction(evict_after: u32) -> Self {
        Self {
            flights: BTreeMap::new(),
            evict_after,
        }
    }

    /// Insert a first sighting or update the tracked flight in place
    ///
    /// # Errors
    ///
    /// Record-scoped data errors. A rejected first sighting creates nothing.
    pub fn upsert(&mut self, record: &FlightRecord, now: DateTime<Utc>) -> Result<UpsertOutcome> {
        if let Some(flight) = self.flights.get_mut(&record.unique_id) {
            flight.update(record, now)?;
            return Ok(UpsertOutcome::Updated);
        }

        let flight = FlightState::from_record(record, now)?;
        debug!(
            "Tracking flight {} ({}) as {}",
            flight.flight_number(),
            flight.id(),
            flight.status()
        );
        self.flights.insert(record.unique_id, flight);
        Ok(UpsertOutcome::Created)
    }

    /// Apply a full feed snapshot
    ///
    /// Every record is upserted; malformed records are logged and skipped
    /// without affecting the others. Afterwards the missed-snapshot counters
    /// are advanced and stale flights evicted.
    pub fn apply_snapshot(&mut self, records: &[FlightRecord], now: DateTime<Utc>) -> SnapshotSummary {
        let mut summary = SnapshotSummary::default();
        let mut seen = HashSet::with_capacity(records.len());

        for record in records {
            seen.insert(record.unique_id);
            match self.upsert(record, now) {
                Ok(UpsertOutcome::Created) => summary.created += 1,
                Ok(UpsertOutcome::Updated) => summary.updated += 1,
                Err(e) => {
                    warn!("Skipping record: {}", e);
                    summary.rejected += 1;
                }
            }
        }

        for (id, flight) in &mut self.flights {
            if seen.contains(id) {
                flight.mark_seen();
                continue;
            }
            let missed = flight.mark_missed();
            if self.evict_after > 0 && missed >= self.evict_after {
                summary.evicted.push(*id);
            }
        }

        for id in &summary.evicted {
            if let Some(flight) = self.flights.remove(id) {
                debug!(
                    "Evicted flight {} ({}) after {} missed snapshot(s)",
                    flight.flight_number(),
                    id,
                    flight.missed_snapshots()
                );
            }
        }

        summary
    }

    pub fn get(&self, id: i64) -> Option<&FlightState> {
        self.flights.get(&id)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut FlightState> {
        self.flights.get_mut(&id)
    }

    /// All tracked flights, ordered by id
    pub fn all_flights(&self) -> impl Iterator<Item = &FlightState> {
        self.flights.values()
    }

    /// Ids of flights whose change is ready to post at `now`, ordered
    pub fn pending_ids(&self, now: DateTime<Utc>) -> Vec<i64> {
        self.flights
            .values()
            .filter(|flight| flight.needs_posting(now))
            .map(FlightState::id)
            .collect()
    }

    /// Number of tracked flights
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Check if no flights are tracked
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}
