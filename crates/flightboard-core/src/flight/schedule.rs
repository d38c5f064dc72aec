// # Schedule Times
//
// The feed publishes wall-clock "HHMM" strings with no date. They are
// anchored to the current UTC day with two corrections:
//
// - a departure more than 12 hours ahead of "now" belongs to the previous
//   day (the poll ran just after midnight);
// - an arrival earlier than the departure belongs to the next day.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

/// Scheduled departure and arrival, both absolute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Estimated time of departure
    pub departure: DateTime<Utc>,
    /// Estimated time of arrival, never earlier than `departure`
    pub arrival: DateTime<Utc>,
}

/// A schedule field that is not a valid 24h "HHMM" time
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} '{value}' is not a valid HHMM time")]
pub struct TimeFieldError {
    /// Feed field name
    pub field: &'static str,
    /// Raw value as received
    pub value: String,
}

impl Schedule {
    /// Compute the schedule for the raw `Std`/`Sta` fields relative to `now`
    pub fn compute(std: &str, sta: &str, now: DateTime<Utc>) -> Result<Self, TimeFieldError> {
        let departure_time = parse_hhmm("Std", std)?;
        let arrival_time = parse_hhmm("Sta", sta)?;

        let mut departure = now.date_naive().and_time(departure_time).and_utc();
        if departure - TimeDelta::hours(12) > now {
            departure -= TimeDelta::days(1);
        }

        Ok(Self {
            departure,
            arrival: anchor_after(departure, arrival_time),
        })
    }
}

/// Parse the trailing "HH:MM" of a remarks string, anchored after `departure`
///
/// Returns `None` when the remarks are shorter than five characters or the
/// tail is not a time.
pub fn remarks_time(remarks: &str, departure: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (start, _) = remarks.char_indices().rev().nth(4)?;
    let time = NaiveTime::parse_from_str(&remarks[start..], "%H:%M").ok()?;
    Some(anchor_after(departure, time))
}

/// `time` on the day of `departure`, or the next day if that would be earlier
fn anchor_after(departure: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
    let candidate = departure.date_naive().and_time(time).and_utc();
    if candidate < departure {
        candidate + TimeDelta::days(1)
    } else {
        candidate
    }
}

fn parse_hhmm(field: &'static str, raw: &str) -> Result<NaiveTime, TimeFieldError> {
    let invalid = || TimeFieldError {
        field,
        value: raw.to_string(),
    };

    if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let hour: u32 = raw[..2].parse().map_err(|_| invalid())?;
    let minute: u32 = raw[2..].parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}
