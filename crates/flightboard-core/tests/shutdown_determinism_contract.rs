//! Architectural Contract Test: Shutdown Determinism
//!
//! This test verifies that shutdown is deterministic and complete.
//!
//! Constraints verified:
//! - Engine terminates on shutdown signal
//! - The feed resource is released exactly once
//! - A tick in progress completes before the engine stops
//! - A stop requested before the first tick fetches nothing
//! - The engine can be started again after stopping
//!
//! If this test fails, someone has added:
//! - Detached background tasks
//! - Cancellation inside a tick
//! - Early returns that skip releasing the feed

mod common;

use common::*;
use flightboard_core::engine::{EngineEvent, LoopState};
use flightboard_core::{Error, PollEngine};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn spawn_engine(
    mut engine: PollEngine,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<(PollEngine, flightboard_core::Result<()>)> {
    tokio::spawn(async move {
        let result = engine.run_with_shutdown(shutdown).await;
        (engine, result)
    })
}

#[tokio::test(start_paused = true)]
async fn shutdown_signal_terminates_engine() {
    let (feed, feed_probe) = ScriptedFeed::snapshots(vec![vec![record(1, Some("Boarding"))]]);
    let (sink, sink_probe) = RecordingSink::new(SinkMode::Deliver);
    let (engine, mut events) =
        PollEngine::new(Box::new(feed), Box::new(sink), engine_config()).unwrap();

    let shutdown = CancellationToken::new();
    let handle = spawn_engine(engine, shutdown.clone());

    tokio::time::sleep(Duration::from_secs(31)).await;
    shutdown.cancel();

    let (engine, result) = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("engine should terminate within 5 seconds")
        .expect("engine task should not panic");

    assert_ok!(result);
    assert_eq!(engine.state(), LoopState::Stopped);
    assert_eq!(feed_probe.connect_count(), 1);
    assert_eq!(feed_probe.disconnect_count(), 1);
    assert!(feed_probe.fetch_count() >= 1);
    assert_eq!(sink_probe.attempt_count(), 1);

    let events = drain_events(&mut events);
    assert!(matches!(events.first(), Some(EngineEvent::Started { .. })));
    assert!(matches!(events.last(), Some(EngineEvent::Stopped { .. })));
}

#[tokio::test(start_paused = true)]
async fn stop_before_first_tick_fetches_nothing() {
    let (feed, feed_probe) = ScriptedFeed::snapshots(vec![vec![record(1, Some("Boarding"))]]);
    let (sink, sink_probe) = RecordingSink::new(SinkMode::Deliver);
    let (engine, _events) =
        PollEngine::new(Box::new(feed), Box::new(sink), engine_config()).unwrap();

    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let (engine, result) = spawn_engine(engine, shutdown).await.unwrap();

    assert_ok!(result);
    assert_eq!(engine.state(), LoopState::Stopped);
    assert_eq!(feed_probe.fetch_count(), 0);
    assert_eq!(feed_probe.disconnect_count(), 1);
    assert_eq!(sink_probe.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn tick_in_progress_completes_before_stop() {
    let (feed, feed_probe) = ScriptedFeed::new(vec![FetchStep::Hang]);
    let (sink, _) = RecordingSink::new(SinkMode::Deliver);
    let (engine, mut events) =
        PollEngine::new(Box::new(feed), Box::new(sink), engine_config()).unwrap();

    let shutdown = CancellationToken::new();
    let handle = spawn_engine(engine, shutdown.clone());

    // The first tick is now waiting on the hung fetch
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(feed_probe.fetch_count(), 1);
    shutdown.cancel();

    let (engine, result) = handle.await.unwrap();
    assert_ok!(result);
    assert_eq!(engine.state(), LoopState::Stopped);
    assert_eq!(feed_probe.fetch_count(), 1);

    let events = drain_events(&mut events);
    let failed = events
        .iter()
        .position(|e| matches!(e, EngineEvent::FetchFailed { .. }))
        .expect("tick finished with a fetch timeout");
    let stopped = events
        .iter()
        .position(|e| matches!(e, EngineEvent::Stopped { .. }))
        .expect("engine reported stop");
    assert!(failed < stopped);
}

#[tokio::test]
async fn unreachable_feed_fails_start() {
    let (feed, feed_probe) = ScriptedFeed::unreachable();
    let (sink, _) = RecordingSink::new(SinkMode::Deliver);
    let (mut engine, _events) =
        PollEngine::new(Box::new(feed), Box::new(sink), engine_config()).unwrap();

    let err = assert_err!(engine.run_with_shutdown(CancellationToken::new()).await);

    assert!(matches!(err, Error::Feed(_)));
    assert_eq!(engine.state(), LoopState::Stopped);
    assert_eq!(feed_probe.fetch_count(), 0);
    assert_eq!(feed_probe.disconnect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn engine_can_restart_and_keeps_registry() {
    let snapshot = vec![record(1, Some("Boarding"))];
    let (feed, feed_probe) = ScriptedFeed::snapshots(vec![snapshot.clone(), snapshot]);
    let (sink, sink_probe) = RecordingSink::new(SinkMode::Deliver);
    let (engine, _events) =
        PollEngine::new(Box::new(feed), Box::new(sink), engine_config()).unwrap();

    let shutdown = CancellationToken::new();
    let handle = spawn_engine(engine, shutdown.clone());
    tokio::time::sleep(Duration::from_secs(1)).await;
    shutdown.cancel();
    let (engine, _) = handle.await.unwrap();
    assert_eq!(engine.registry().len(), 1);

    let shutdown = CancellationToken::new();
    let handle = spawn_engine(engine, shutdown.clone());
    tokio::time::sleep(Duration::from_secs(1)).await;
    shutdown.cancel();
    let (engine, result) = handle.await.unwrap();

    assert_ok!(result);
    assert_eq!(engine.state(), LoopState::Stopped);
    assert_eq!(feed_probe.connect_count(), 2);
    assert_eq!(feed_probe.disconnect_count(), 2);
    assert_eq!(engine.registry().len(), 1);
    assert_eq!(sink_probe.attempt_count(), 1, "state survives a restart");
}
