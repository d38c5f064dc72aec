// # Flight Status
//
// Discrete status derived from a flight's free-text remarks.
//
// Classification is first-match over a fixed priority table: once a
// category's prefix matches, later categories are never consulted. A remark
// such as "Taxi to gate, Boarding later" is therefore DEPARTING.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status category of a tracked flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    /// Pushed back, taxiing or airborne shortly after departure
    Departing,
    /// Passengers boarding at the gate
    Boarding,
    /// Enroute with an expected arrival time
    Cruising,
    /// On the ground at the destination
    Arrived,
    /// Remarks absent or not recognised
    Unknown,
}

/// Prefix table, evaluated top to bottom
const PRIORITY: [(FlightStatus, &[&str]); 4] = [
    (FlightStatus::Departing, &["Taxi", "Departed", "Gate Closed"]),
    (FlightStatus::Boarding, &["Boarding"]),
    (FlightStatus::Cruising, &["Expected"]),
    (FlightStatus::Arrived, &["Landed", "Arrived"]),
];

/// Classify a remarks string
///
/// Total and side-effect free. Empty or absent remarks are [`FlightStatus::Unknown`].
pub fn classify(remarks: Option<&str>) -> FlightStatus {
    let Some(remarks) = remarks.filter(|r| !r.is_empty()) else {
        return FlightStatus::Unknown;
    };

    PRIORITY
        .iter()
        .find(|(_, prefixes)| prefixes.iter().any(|p| remarks.starts_with(p)))
        .map(|(status, _)| *status)
        .unwrap_or(FlightStatus::Unknown)
}

impl FlightStatus {
    /// Whether the remarks of a flight in this status end with an "HH:MM" time
    pub fn carries_remarks_time(self) -> bool {
        matches!(self, FlightStatus::Cruising | FlightStatus::Arrived)
    }

    /// Whether this is one of the recognised categories
    pub fn is_known(self) -> bool {
        self != FlightStatus::Unknown
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightStatus::Departing => "departing",
            FlightStatus::Boarding => "boarding",
            FlightStatus::Cruising => "cruising",
            FlightStatus::Arrived => "arrived",
            FlightStatus::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
