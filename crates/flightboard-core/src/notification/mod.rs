//! Notification rendering
//!
//! A [`Notification`] is the platform-neutral rendering of a flight at the
//! moment it is posted. Sinks turn it into their own wire format.

pub mod log;

pub use log::{LogNotificationSink, LogNotifierFactory};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::flight::{FlightState, FlightStatus};

/// Embed colour, RGB(155, 89, 182)
pub const NOTIFICATION_COLOUR: u32 = 0x9B59B6;

/// A labelled instant shown on a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedTimestamp {
    /// Label such as "ETD" or "ATA"
    pub label: &'static str,
    /// The instant itself
    pub at: DateTime<Utc>,
}

impl NamedTimestamp {
    /// Seconds since the Unix epoch
    pub fn unix(&self) -> i64 {
        self.at.timestamp()
    }

    /// Human-readable offset from `now`, e.g. "in 1h 05m" or "12m ago"
    pub fn relative_to(&self, now: DateTime<Utc>) -> String {
        let delta = self.at - now;
        let minutes = delta.num_minutes().abs();
        let span = if minutes >= 60 {
            format!("{}h {:02}m", minutes / 60, minutes % 60)
        } else {
            format!("{minutes}m")
        };

        if delta.num_minutes() == 0 {
            "now".to_string()
        } else if delta.num_seconds() > 0 {
            format!("in {span}")
        } else {
            format!("{span} ago")
        }
    }
}

/// Rendered notification for one flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Feed identifier of the flight
    pub flight_id: i64,
    /// Status at render time
    pub status: FlightStatus,
    /// "Flight #<number>"
    pub title: String,
    /// Departure airport display string
    pub from: String,
    /// Destination airport display string
    pub to: String,
    /// Status line, absent for unknown status
    pub description: Option<&'static str>,
    /// The one timestamp relevant to the status
    pub timestamp: Option<NamedTimestamp>,
    /// Accent colour as 0xRRGGBB
    pub colour: u32,
}

impl Notification {
    /// Render the current state of `flight`
    pub fn for_flight(flight: &FlightState) -> Self {
        let status = flight.status();
        let (description, timestamp) = match status {
            FlightStatus::Departing => (
                Some("🛫 Departing 🛫"),
                Some(("ETA (Planned)", Some(flight.scheduled_arrival()))),
            ),
            FlightStatus::Boarding => (
                Some("📣 Boarding 📣"),
                Some(("ETD", Some(flight.scheduled_departure()))),
            ),
            FlightStatus::Cruising => (
                Some("☁️ Enroute ☁️"),
                Some(("ETA (Expected)", flight.remarks_time())),
            ),
            FlightStatus::Arrived => (Some("✅ Arrived ✅"), Some(("ATA", flight.remarks_time()))),
            FlightStatus::Unknown => (None, None),
        };

        let timestamp = timestamp.and_then(|(label, at)| {
            if at.is_none() {
                debug!(
                    "Flight {} remarks {:?} carry no time, omitting {}",
                    flight.id(),
                    flight.remarks(),
                    label
                );
            }
            at.map(|at| NamedTimestamp { label, at })
        });

        Self {
            flight_id: flight.id(),
            status,
            title: format!("Flight #{}", flight.flight_number()),
            from: flight.departure().to_string(),
            to: flight.destination().to_string(),
            description,
            timestamp,
            colour: NOTIFICATION_COLOUR,
        }
    }

    /// Single-line plain text rendering
    pub fn render_text(&self, now: DateTime<Utc>) -> String {
        let mut text = format!("{}: {} → {}", self.title, self.from, self.to);
        if let Some(description) = self.description {
            text.push_str(" | ");
            text.push_str(description);
        }
        if let Some(timestamp) = &self.timestamp {
            text.push_str(&format!(
                " | {} {} ({})",
                timestamp.label,
                timestamp.at.format("%Y-%m-%d %H:%M UTC"),
                timestamp.relative_to(now)
            ));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::FlightRecord;
    use chrono::{TimeDelta, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).single().expect("valid instant")
    }

    fn flight(remarks: Option<&str>) -> FlightState {
        let record = FlightRecord {
            unique_id: 3,
            flight_number: "SF42".to_string(),
            std: "1230".to_string(),
            sta: "1400".to_string(),
            remarks: remarks.map(str::to_string),
            departure: "Manchester".to_string(),
            dept_icao: "EGCC".to_string(),
            destination: "Edinburgh".to_string(),
            arr_icao: "EGPH".to_string(),
        };
        FlightState::from_record(&record, noon()).unwrap()
    }

    #[test]
    fn renders_header_for_every_status() {
        let n = Notification::for_flight(&flight(Some("Boarding")));
        assert_eq!(n.title, "Flight #SF42");
        assert_eq!(n.from, "Manchester (EGCC)");
        assert_eq!(n.to, "Edinburgh (EGPH)");
        assert_eq!(n.colour, 0x9B59B6);
    }

    #[test]
    fn boarding_shows_etd() {
        let n = Notification::for_flight(&flight(Some("Boarding")));
        assert_eq!(n.description, Some("📣 Boarding 📣"));
        let ts = n.timestamp.unwrap();
        assert_eq!(ts.label, "ETD");
        assert_eq!(ts.at, noon() + TimeDelta::minutes(30));
    }

    #[test]
    fn departing_shows_planned_eta() {
        let n = Notification::for_flight(&flight(Some("Taxi")));
        assert_eq!(n.description, Some("🛫 Departing 🛫"));
        let ts = n.timestamp.unwrap();
        assert_eq!(ts.label, "ETA (Planned)");
        assert_eq!(ts.at, noon() + TimeDelta::hours(2));
    }

    #[test]
    fn cruising_and_arrived_use_remarks_time() {
        let n = Notification::for_flight(&flight(Some("Expected 13:55")));
        assert_eq!(n.description, Some("☁️ Enroute ☁️"));
        let ts = n.timestamp.unwrap();
        assert_eq!(ts.label, "ETA (Expected)");
        assert_eq!(ts.at, noon() + TimeDelta::minutes(115));

        let n = Notification::for_flight(&flight(Some("Landed 13:50")));
        assert_eq!(n.description, Some("✅ Arrived ✅"));
        assert_eq!(n.timestamp.unwrap().label, "ATA");
    }

    #[test]
    fn unparseable_remarks_time_omits_timestamp() {
        let n = Notification::for_flight(&flight(Some("Expected shortly")));
        assert_eq!(n.status, FlightStatus::Cruising);
        assert!(n.timestamp.is_none());
    }

    #[test]
    fn unknown_status_has_no_description() {
        let n = Notification::for_flight(&flight(Some("Delayed")));
        assert_eq!(n.description, None);
        assert_eq!(n.timestamp, None);
        assert_eq!(n.render_text(noon()), "Flight #SF42: Manchester (EGCC) → Edinburgh (EGPH)");
    }

    #[test]
    fn relative_form() {
        let ts = NamedTimestamp { label: "ETD", at: noon() + TimeDelta::minutes(65) };
        assert_eq!(ts.relative_to(noon()), "in 1h 05m");
        assert_eq!(ts.relative_to(noon() + TimeDelta::minutes(77)), "12m ago");
        assert_eq!(ts.relative_to(ts.at), "now");
    }

    #[test]
    fn text_rendering_includes_timestamp() {
        let n = Notification::for_flight(&flight(Some("Boarding")));
        assert_eq!(
            n.render_text(noon()),
            "Flight #SF42: Manchester (EGCC) → Edinburgh (EGPH) | 📣 Boarding 📣 | ETD 2024-05-02 12:30 UTC (in 30m)"
        );
    }
}
