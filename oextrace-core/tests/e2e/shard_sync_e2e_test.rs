// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Shard Sync E2E Tests

use std::sync::Arc;

use super::common::{at, tracer};
use oextrace_core::{
    Coordinate, DaySecret, DiagnosisKey, ManualClock, MockBackend, RawTrackPoint, SyncKind,
    TraceEvent, TrackPoint,
};

/// A first query returns five keys up to timestamp 1000; the cursor lands
/// on 1000 and the next query returns nothing.
#[tokio::test]
async fn test_cursor_follows_newest_key() {
    let clock = Arc::new(ManualClock::new(at(100, 0)));
    let backend = Arc::new(MockBackend::new());
    backend.publish_keys(
        [200, 1000, 400, 600, 800]
            .into_iter()
            .map(|tst| DiagnosisKey::new(DaySecret::generate(), 99, tst)),
    );
    let (tracer, events) = tracer(clock.clone(), backend.clone());
    let here = Coordinate::new(46.2, 6.1);
    let shard = tracer.spatial_index().shard_for(&here);
    assert_eq!(tracer.spatial_index().cursor_for(&shard, SyncKind::Keys), 0);

    // Step 1: first cycle from cursor 0
    let first = tracer
        .on_location(RawTrackPoint::new(TrackPoint::new(here.lat, here.lng, at(100, 0)), 5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.keys_fetched, 5);
    assert_eq!(tracer.spatial_index().cursor_for(&shard, SyncKind::Keys), 1000);

    // Step 2: repeat query from cursor 1000
    let second = tracer.sync_now().await.unwrap();
    assert_eq!(second.keys_fetched, 0);
    assert_eq!(tracer.spatial_index().cursor_for(&shard, SyncKind::Keys), 1000);

    assert_eq!(
        events
            .events()
            .iter()
            .filter(|e| matches!(e, TraceEvent::SyncCompleted { .. }))
            .count(),
        2
    );
}

/// Each shard keeps its own cursor.
#[tokio::test]
async fn test_moving_to_another_shard_starts_from_zero() {
    let clock = Arc::new(ManualClock::new(at(100, 0)));
    let backend = Arc::new(MockBackend::new());
    backend.publish_keys(vec![DiagnosisKey::new(DaySecret::generate(), 99, 500)]);
    let (tracer, _) = tracer(clock.clone(), backend.clone());

    let geneva = RawTrackPoint::new(TrackPoint::new(46.2, 6.1, at(100, 0)), 5);
    tracer.on_location(geneva).await.unwrap();

    clock.advance(61_000);
    let zurich = RawTrackPoint::new(TrackPoint::new(47.4, 8.5, at(100, 0) + 61_000), 5);
    let report = tracer.on_location(zurich).await.unwrap().unwrap();

    assert_eq!(report.keys_fetched, 1);
    assert_ne!(
        report.shard,
        tracer.spatial_index().shard_for(&Coordinate::new(46.2, 6.1))
    );
}
