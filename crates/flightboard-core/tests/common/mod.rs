//! Test doubles and common utilities for engine contract tests
//!
//! The doubles are moved into the engine, so each one hands back a probe
//! that shares its counters with the test.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use flightboard_core::config::EngineConfig;
use flightboard_core::engine::EngineEvent;
use flightboard_core::error::{Error, Result};
use flightboard_core::flight::{FeedSnapshot, FlightRecord, FlightStatus, decode_snapshot};
use flightboard_core::notification::Notification;
use flightboard_core::traits::{DeliveryOutcome, FeedSource, NotificationSink};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// One scripted answer of [`ScriptedFeed::fetch`]
#[derive(Debug, Clone)]
pub enum FetchStep {
    Records(Vec<FlightRecord>),
    /// A raw feed body, decoded the way a real source decodes it
    Body(String),
    Fail(String),
    Hang,
}

/// Shared view on a [`ScriptedFeed`] after it was moved into an engine
#[derive(Debug, Clone, Default)]
pub struct FeedProbe {
    connects: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
    disconnects: Arc<AtomicUsize>,
}

impl FeedProbe {
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

/// A feed that answers from a script, one step per fetch
///
/// Once the script is exhausted every fetch fails.
pub struct ScriptedFeed {
    script: Mutex<VecDeque<FetchStep>>,
    fail_connect: bool,
    probe: FeedProbe,
}

impl ScriptedFeed {
    pub fn new(steps: Vec<FetchStep>) -> (Self, FeedProbe) {
        let probe = FeedProbe::default();
        let feed = Self {
            script: Mutex::new(steps.into()),
            fail_connect: false,
            probe: probe.clone(),
        };
        (feed, probe)
    }

    /// A feed that serves the same snapshots in order
    pub fn snapshots(snapshots: Vec<Vec<FlightRecord>>) -> (Self, FeedProbe) {
        Self::new(snapshots.into_iter().map(FetchStep::Records).collect())
    }

    /// A feed whose resource can never be acquired
    pub fn unreachable() -> (Self, FeedProbe) {
        let (mut feed, probe) = Self::new(Vec::new());
        feed.fail_connect = true;
        (feed, probe)
    }
}

#[async_trait::async_trait]
impl FeedSource for ScriptedFeed {
    async fn connect(&mut self) -> Result<()> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(Error::feed("connection refused"));
        }
        Ok(())
    }

    async fn fetch(&self) -> Result<FeedSnapshot> {
        self.probe.fetches.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();

        match step {
            Some(FetchStep::Records(records)) => Ok(records.into()),
            Some(FetchStep::Body(body)) => decode_snapshot(body.as_bytes()),
            Some(FetchStep::Fail(message)) => Err(Error::feed(message)),
            Some(FetchStep::Hang) => std::future::pending().await,
            None => Err(Error::feed("script exhausted")),
        }
    }

    async fn disconnect(&mut self) {
        self.probe.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// How a [`RecordingSink`] answers every delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Deliver,
    Skip,
    Fail,
    Hang,
}

/// Shared view on a [`RecordingSink`]
#[derive(Debug, Clone, Default)]
pub struct SinkProbe {
    attempts: Arc<Mutex<Vec<(i64, FlightStatus)>>>,
}

impl SinkProbe {
    /// Every delivery attempt as (flight id, status), in order
    pub fn attempts(&self) -> Vec<(i64, FlightStatus)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

/// A sink that records every delivery attempt
pub struct RecordingSink {
    mode: SinkMode,
    probe: SinkProbe,
}

impl RecordingSink {
    pub fn new(mode: SinkMode) -> (Self, SinkProbe) {
        let probe = SinkProbe::default();
        let sink = Self {
            mode,
            probe: probe.clone(),
        };
        (sink, probe)
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: &Notification) -> Result<DeliveryOutcome> {
        self.probe
            .attempts
            .lock()
            .unwrap()
            .push((notification.flight_id, notification.status));

        match self.mode {
            SinkMode::Deliver => Ok(DeliveryOutcome::Delivered),
            SinkMode::Skip => Ok(DeliveryOutcome::skipped("channel not found")),
            SinkMode::Fail => Err(Error::notifier("unexpected status 500")),
            SinkMode::Hang => std::future::pending().await,
        }
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}

/// A well-formed record between Manchester and Edinburgh
pub fn record(id: i64, remarks: Option<&str>) -> FlightRecord {
    FlightRecord {
        unique_id: id,
        flight_number: format!("SF{id}"),
        std: "1230".to_string(),
        sta: "1400".to_string(),
        remarks: remarks.map(str::to_string),
        departure: "Manchester".to_string(),
        dept_icao: "EGCC".to_string(),
        destination: "Edinburgh".to_string(),
        arr_icao: "EGPH".to_string(),
    }
}

/// A record whose scheduled departure cannot be parsed
pub fn malformed_record(id: i64) -> FlightRecord {
    FlightRecord {
        std: "12:3".to_string(),
        ..record(id, Some("Boarding"))
    }
}

/// 2024-05-02 at `hour:minute` UTC
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 2, hour, minute, 0)
        .single()
        .expect("valid instant")
}

/// Engine configuration used by the contract tests
pub fn engine_config() -> EngineConfig {
    EngineConfig {
        event_channel_capacity: 64,
        ..EngineConfig::default()
    }
}

/// Every event emitted so far, in order
pub fn drain_events(events: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
