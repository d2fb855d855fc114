//! Timing tests for `KeepaliveScheduler`.
//!
//! All tests run on a paused tokio clock, so intervals elapse instantly and
//! deterministically.

use std::time::Duration;

use axum::extract::ws::Message;
use curfew_api::ws::registry::WsReceiver;
use curfew_api::ws::{ConnectionHandle, KeepaliveScheduler};

const INTERVAL: Duration = Duration::from_secs(60);

/// Let spawned tasks run without crossing an interval boundary.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn drain_pings(rx: &mut WsReceiver) -> usize {
    let mut pings = 0;
    while let Ok(msg) = rx.try_recv() {
        if matches!(msg, Message::Ping(_)) {
            pings += 1;
        }
    }
    pings
}

// ---------------------------------------------------------------------------
// Test: first probe is immediate, then one per interval
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn pings_immediately_then_every_interval() {
    let scheduler = KeepaliveScheduler::new(INTERVAL);
    let (handle, mut rx) = ConnectionHandle::channel();

    scheduler.start("s1", handle);
    settle().await;
    assert_eq!(drain_pings(&mut rx), 1);

    tokio::time::sleep(INTERVAL).await;
    assert_eq!(drain_pings(&mut rx), 1);

    tokio::time::sleep(INTERVAL * 2).await;
    assert_eq!(drain_pings(&mut rx), 2);
    assert!(scheduler.is_active("s1"));
}

// ---------------------------------------------------------------------------
// Test: no probe is sent after cancel() returns
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancel_stops_further_pings() {
    let scheduler = KeepaliveScheduler::new(INTERVAL);
    let (handle, mut rx) = ConnectionHandle::channel();

    scheduler.start("s1", handle);
    settle().await;
    assert_eq!(drain_pings(&mut rx), 1);

    assert!(scheduler.cancel("s1"));
    assert!(!scheduler.is_active("s1"));

    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(drain_pings(&mut rx), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_is_idempotent() {
    let scheduler = KeepaliveScheduler::new(INTERVAL);
    let (handle, _rx) = ConnectionHandle::channel();

    scheduler.start("s1", handle);

    assert!(scheduler.cancel("s1"));
    assert!(!scheduler.cancel("s1"));
    assert!(!scheduler.cancel("never-started"));
}

// ---------------------------------------------------------------------------
// Test: start() replaces an existing task for the same session
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn restart_leaves_exactly_one_task() {
    let scheduler = KeepaliveScheduler::new(INTERVAL);
    let (handle, mut rx) = ConnectionHandle::channel();

    scheduler.start("s1", handle.clone());
    scheduler.start("s1", handle);
    assert_eq!(scheduler.active_count(), 1);

    settle().await;
    assert_eq!(drain_pings(&mut rx), 1);

    tokio::time::sleep(INTERVAL).await;
    assert_eq!(drain_pings(&mut rx), 1);
}

// ---------------------------------------------------------------------------
// Test: a closed connection ends its task
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn closed_handle_stops_task() {
    let scheduler = KeepaliveScheduler::new(INTERVAL);
    let (handle, mut rx) = ConnectionHandle::channel();

    handle.close();
    scheduler.start("s1", handle);
    settle().await;

    assert!(!scheduler.is_active("s1"));
    assert_eq!(drain_pings(&mut rx), 0);
}

#[tokio::test(start_paused = true)]
async fn stopped_writer_stops_task() {
    let scheduler = KeepaliveScheduler::new(INTERVAL);
    let (handle, mut rx) = ConnectionHandle::channel();

    scheduler.start("s1", handle);
    settle().await;
    assert_eq!(drain_pings(&mut rx), 1);

    drop(rx);
    tokio::time::sleep(INTERVAL).await;

    assert!(!scheduler.is_active("s1"));
}

// ---------------------------------------------------------------------------
// Test: shutdown() cancels every task
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_all() {
    let scheduler = KeepaliveScheduler::new(INTERVAL);
    let (h1, mut rx1) = ConnectionHandle::channel();
    let (h2, mut rx2) = ConnectionHandle::channel();

    scheduler.start("s1", h1);
    scheduler.start("s2", h2);
    settle().await;
    assert_eq!(scheduler.active_count(), 2);
    drain_pings(&mut rx1);
    drain_pings(&mut rx2);

    scheduler.shutdown();
    assert_eq!(scheduler.active_count(), 0);

    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(drain_pings(&mut rx1), 0);
    assert_eq!(drain_pings(&mut rx2), 0);
}
