//! Architectural Contract Test: Fetch Failure Isolation
//!
//! This test verifies that a bad snapshot never corrupts tracked state.
//!
//! Constraints verified:
//! - A failed fetch skips the tick without touching the registry
//! - A failed fetch triggers no delivery
//! - A malformed record is skipped, the rest of the snapshot is applied
//! - A record of the wrong shape is skipped at decode time the same way
//! - A hung fetch is bounded by the fetch timeout
//!
//! If this test fails, someone has:
//! - Applied partial results of a failed fetch
//! - Let one bad record abort the whole snapshot
//! - Awaited the feed without a timeout

mod common;

use common::*;
use flightboard_core::PollEngine;
use flightboard_core::engine::EngineEvent;
use flightboard_core::flight::FlightStatus;
use std::time::Duration;

#[tokio::test]
async fn failed_fetch_leaves_registry_untouched() {
    let (feed, feed_probe) = ScriptedFeed::new(vec![
        FetchStep::Records(vec![record(1, Some("Boarding"))]),
        FetchStep::Fail("connection reset".to_string()),
    ]);
    let (sink, sink_probe) = RecordingSink::new(SinkMode::Deliver);
    let (mut engine, mut events) =
        PollEngine::new(Box::new(feed), Box::new(sink), engine_config()).unwrap();

    engine.tick_at(at(12, 0)).await;
    let report = engine.tick_at(at(12, 1)).await;

    assert!(!report.fetched());
    assert!(report.posted.is_empty());
    assert_eq!(feed_probe.fetch_count(), 2);
    assert_eq!(sink_probe.attempt_count(), 1);

    let flight = engine.registry().get(1).unwrap();
    assert_eq!(flight.status(), FlightStatus::Boarding);
    assert_eq!(flight.missed_snapshots(), 0, "failed fetch is no missed snapshot");

    let events = drain_events(&mut events);
    assert!(matches!(
        events.last(),
        Some(EngineEvent::FetchFailed { error }) if error.contains("connection reset")
    ));
}

#[tokio::test]
async fn failed_fetch_keeps_pending_change_for_next_tick() {
    let (feed, _) = ScriptedFeed::new(vec![
        FetchStep::Fail("timeout".to_string()),
        FetchStep::Records(vec![record(1, Some("Boarding"))]),
    ]);
    let (sink, sink_probe) = RecordingSink::new(SinkMode::Deliver);
    let (mut engine, _events) =
        PollEngine::new(Box::new(feed), Box::new(sink), engine_config()).unwrap();

    engine.tick_at(at(12, 0)).await;
    assert!(engine.registry().is_empty());

    let report = engine.tick_at(at(12, 1)).await;
    assert_eq!(report.posted, vec![1]);
    assert_eq!(sink_probe.attempts(), vec![(1, FlightStatus::Boarding)]);
}

#[tokio::test]
async fn malformed_record_is_skipped_without_aborting_snapshot() {
    let (feed, _) = ScriptedFeed::snapshots(vec![
        vec![record(1, Some("Boarding")), record(2, Some("Boarding"))],
        vec![malformed_record(1), record(2, Some("Taxi to runway 23R"))],
    ]);
    let (sink, sink_probe) = RecordingSink::new(SinkMode::Deliver);
    let (mut engine, _events) =
        PollEngine::new(Box::new(feed), Box::new(sink), engine_config()).unwrap();

    engine.tick_at(at(12, 0)).await;
    let report = engine.tick_at(at(12, 5)).await;

    let summary = report.snapshot.expect("snapshot applied");
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(report.posted, vec![2]);

    // The rejected record left flight 1 exactly as it was
    let flight = engine.registry().get(1).unwrap();
    assert_eq!(flight.remarks(), Some("Boarding"));
    assert!(!flight.is_dirty());

    assert_eq!(sink_probe.attempt_count(), 3);
}

#[tokio::test]
async fn mistyped_record_is_skipped_without_aborting_snapshot() {
    let body = serde_json::json!([
        {
            "UniqueId": 1, "FlightNumber": "SF1", "Std": "1230", "Sta": "1400",
            "Remarks": "Boarding", "Departure": "Manchester", "DeptIcao": "EGCC",
            "Destination": "Edinburgh", "ArrIcao": "EGPH"
        },
        {
            "UniqueId": 2, "FlightNumber": "SF2", "Std": null, "Sta": "1400",
            "Remarks": "Boarding", "Departure": "Manchester", "DeptIcao": "EGCC",
            "Destination": "Edinburgh", "ArrIcao": "EGPH"
        }
    ]);
    let (feed, _) = ScriptedFeed::new(vec![FetchStep::Body(body.to_string())]);
    let (sink, sink_probe) = RecordingSink::new(SinkMode::Deliver);
    let (mut engine, _events) =
        PollEngine::new(Box::new(feed), Box::new(sink), engine_config()).unwrap();

    let report = engine.tick_at(at(12, 0)).await;

    let summary = report.snapshot.expect("snapshot applied");
    assert_eq!(summary.created, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(report.posted, vec![1]);
    assert!(engine.registry().get(2).is_none());
    assert_eq!(sink_probe.attempts(), vec![(1, FlightStatus::Boarding)]);
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_is_bounded_by_timeout() {
    let config = engine_config();
    let fetch_timeout = config.fetch_timeout();
    let (feed, feed_probe) = ScriptedFeed::new(vec![FetchStep::Hang]);
    let (sink, sink_probe) = RecordingSink::new(SinkMode::Deliver);
    let (mut engine, mut events) =
        PollEngine::new(Box::new(feed), Box::new(sink), config).unwrap();

    let started = tokio::time::Instant::now();
    let report = engine.tick().await;

    assert!(!report.fetched());
    assert!(started.elapsed() >= fetch_timeout);
    assert!(started.elapsed() < fetch_timeout + Duration::from_secs(1));
    assert_eq!(feed_probe.fetch_count(), 1);
    assert_eq!(sink_probe.attempt_count(), 0);

    let events = drain_events(&mut events);
    assert!(matches!(events.as_slice(), [EngineEvent::FetchFailed { .. }]));
}
