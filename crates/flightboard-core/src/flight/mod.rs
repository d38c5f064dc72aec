//! Flight model and change detection
//!
//! A [`FlightState`] tracks one feed identifier across snapshots. Its status is
//! never stored: [`FlightState::status`] classifies the current remarks each
//! time it is asked.
//!
//! ## Change Detection
//!
//! ```text
//! remarks changed ──► status changed? ──────────────► dirty
//!                 └─► cruising && != last posted? ──► dirty
//!
//! needs_posting = dirty                                  (not cruising)
//!               = dirty && remarks stable >= 15 minutes  (cruising)
//! ```
//!
//! `dirty` is only cleared by [`FlightState::mark_posted`].

pub mod schedule;
pub mod status;

pub use schedule::{Schedule, TimeFieldError, remarks_time};
pub use status::{FlightStatus, classify};

use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// How long a cruising flight's remarks must stay unchanged before posting
pub const REMARKS_STABLE_MINUTES: i64 = 15;

/// One element of the feed's JSON array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlightRecord {
    /// Feed-assigned identity
    pub unique_id: i64,
    /// Display flight number
    pub flight_number: String,
    /// Scheduled departure, "HHMM"
    pub std: String,
    /// Scheduled arrival, "HHMM"
    pub sta: String,
    /// Free-text status remarks
    #[serde(default)]
    pub remarks: Option<String>,
    /// Departure airport name
    pub departure: String,
    /// Departure airport ICAO code
    pub dept_icao: String,
    /// Destination airport name
    pub destination: String,
    /// Destination airport ICAO code
    pub arr_icao: String,
}

/// A decoded feed body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Elements that decoded into records, in feed order
    pub records: Vec<FlightRecord>,
    /// Elements that were not valid flight records
    pub undecodable: usize,
}

impl FeedSnapshot {
    /// Number of elements the feed published
    pub fn len(&self) -> usize {
        self.records.len() + self.undecodable
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<FlightRecord>> for FeedSnapshot {
    fn from(records: Vec<FlightRecord>) -> Self {
        Self {
            records,
            undecodable: 0,
        }
    }
}

/// Decode a feed body into its records
///
/// The body must be a non-empty JSON array. Each element is decoded on its
/// own; an element that is not a valid record is logged and counted, the
/// others are kept. A `null` body, an empty array or an array without a
/// single valid record is an error: the feed never legitimately publishes an
/// empty board.
pub fn decode_snapshot(body: &[u8]) -> Result<FeedSnapshot> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::feed("Empty response body"));
    }

    let elements: Option<Vec<serde_json::Value>> = serde_json::from_slice(body)?;
    let elements = match elements {
        Some(elements) if !elements.is_empty() => elements,
        _ => return Err(Error::feed("Feed snapshot contains no flights")),
    };

    let mut snapshot = FeedSnapshot::default();
    for (index, element) in elements.into_iter().enumerate() {
        let id = element.get("UniqueId").and_then(serde_json::Value::as_i64);
        match serde_json::from_value::<FlightRecord>(element) {
            Ok(record) => snapshot.records.push(record),
            Err(e) => {
                match id {
                    Some(id) => warn!("Skipping undecodable record {}: {}", id, e),
                    None => warn!("Skipping undecodable feed element #{}: {}", index, e),
                }
                snapshot.undecodable += 1;
            }
        }
    }

    if snapshot.records.is_empty() {
        return Err(Error::feed(format!(
            "None of the {} feed element(s) is a valid flight record",
            snapshot.undecodable
        )));
    }
    Ok(snapshot)
}

/// An airport as shown on the board
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Airport {
    /// Four-letter ICAO code
    pub icao: String,
    /// Display name
    pub name: String,
}

impl Airport {
    pub fn new(icao: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            icao: icao.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Airport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.icao)
    }
}

/// Tracked state of a single flight
#[derive(Debug, Clone)]
pub struct FlightState {
    id: i64,
    flight_number: String,
    schedule: Schedule,
    remarks: Option<String>,
    departure: Airport,
    destination: Airport,
    dirty: bool,
    last_posted_remarks: Option<String>,
    last_remark_change_at: DateTime<Utc>,
    missed_snapshots: u32,
}

impl FlightState {
    /// Start tracking a flight from its first sighting
    ///
    /// The first sighting counts as a status transition, so a flight with a
    /// recognised status starts dirty.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRecord`] if the schedule fields are malformed.
    pub fn from_record(record: &FlightRecord, now: DateTime<Utc>) -> Result<Self> {
        let schedule = schedule_of(record, now)?;
        let dirty = classify(record.remarks.as_deref()).is_known();

        Ok(Self {
            id: record.unique_id,
            flight_number: record.flight_number.clone(),
            schedule,
            remarks: record.remarks.clone(),
            departure: Airport::new(&record.dept_icao, &record.departure),
            destination: Airport::new(&record.arr_icao, &record.destination),
            dirty,
            last_posted_remarks: None,
            last_remark_change_at: now,
            missed_snapshots: 0,
        })
    }

    /// Apply a later record for the same flight
    ///
    /// A record with a malformed schedule is rejected as a whole and the
    /// state is left untouched.
    pub fn update(&mut self, record: &FlightRecord, now: DateTime<Utc>) -> Result<()> {
        let schedule = schedule_of(record, now)?;

        if self.remarks != record.remarks {
            let previous = self.status();
            self.remarks = record.remarks.clone();
            self.last_remark_change_at = now;

            let current = self.status();
            let cruising_change =
                current == FlightStatus::Cruising && self.remarks != self.last_posted_remarks;
            if cruising_change || current != previous {
                self.dirty = true;
            }
        }

        self.schedule = schedule;
        self.flight_number.clone_from(&record.flight_number);
        self.departure = Airport::new(&record.dept_icao, &record.departure);
        self.destination = Airport::new(&record.arr_icao, &record.destination);
        Ok(())
    }

    /// Whether an unreported change is ready to be posted at `now`
    pub fn needs_posting(&self, now: DateTime<Utc>) -> bool {
        match self.status() {
            FlightStatus::Cruising => {
                self.dirty
                    && now - self.last_remark_change_at
                        >= TimeDelta::minutes(REMARKS_STABLE_MINUTES)
            }
            _ => self.dirty,
        }
    }

    /// Record that a notification was attempted for the current remarks
    pub fn mark_posted(&mut self) {
        self.dirty = false;
        self.last_posted_remarks.clone_from(&self.remarks);
    }

    /// Current status, derived from the remarks
    pub fn status(&self) -> FlightStatus {
        classify(self.remarks.as_deref())
    }

    /// Expected or actual arrival taken from the remarks
    ///
    /// Only cruising and arrived flights carry one.
    pub fn remarks_time(&self) -> Option<DateTime<Utc>> {
        if !self.status().carries_remarks_time() {
            return None;
        }
        remarks_time(self.remarks.as_deref()?, self.schedule.departure)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn flight_number(&self) -> &str {
        &self.flight_number
    }

    pub fn scheduled_departure(&self) -> DateTime<Utc> {
        self.schedule.departure
    }

    pub fn scheduled_arrival(&self) -> DateTime<Utc> {
        self.schedule.arrival
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    pub fn departure(&self) -> &Airport {
        &self.departure
    }

    pub fn destination(&self) -> &Airport {
        &self.destination
    }

    /// Whether an unreported change exists, regardless of debounce
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_posted_remarks(&self) -> Option<&str> {
        self.last_posted_remarks.as_deref()
    }

    pub fn last_remark_change_at(&self) -> DateTime<Utc> {
        self.last_remark_change_at
    }

    /// Consecutive snapshots this flight was absent from
    pub fn missed_snapshots(&self) -> u32 {
        self.missed_snapshots
    }

    pub(crate) fn mark_seen(&mut self) {
        self.missed_snapshots = 0;
    }

    pub(crate) fn mark_missed(&mut self) -> u32 {
        self.missed_snapshots = self.missed_snapshots.saturating_add(1);
        self.missed_snapshots
    }
}

fn schedule_of(record: &FlightRecord, now: DateTime<Utc>) -> Result<Schedule> {
    Schedule::compute(&record.std, &record.sta, now)
        .map_err(|e| Error::invalid_record(record.unique_id, e.to_string()))
}
