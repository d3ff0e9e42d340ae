// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Spatial Sync Index Tests

mod common;

use common::{at, Device};
use oextrace_core::{Coordinate, SyncKind};

#[test]
fn test_cursor_moves_only_forward() {
    let device = Device::at(at(100, 0));
    let shard = device.spatial.shard_for(&Coordinate::new(46.2, 6.1));

    assert_eq!(device.spatial.cursor_for(&shard, SyncKind::Keys), 0);
    assert!(device.spatial.advance_cursor(&shard, SyncKind::Keys, 500).unwrap());
    assert!(!device.spatial.advance_cursor(&shard, SyncKind::Keys, 500).unwrap());
    assert!(!device.spatial.advance_cursor(&shard, SyncKind::Keys, 200).unwrap());
    assert_eq!(device.spatial.cursor_for(&shard, SyncKind::Keys), 500);

    assert!(device.spatial.advance_cursor(&shard, SyncKind::Keys, 501).unwrap());
    assert_eq!(device.spatial.cursor_for(&shard, SyncKind::Keys), 501);
}

#[test]
fn test_kinds_and_shards_are_independent() {
    let device = Device::at(at(100, 0));
    let geneva = device.spatial.shard_for(&Coordinate::new(46.2, 6.1));
    let zurich = device.spatial.shard_for(&Coordinate::new(47.4, 8.5));

    device.spatial.advance_cursor(&geneva, SyncKind::Keys, 1_000).unwrap();

    assert_ne!(geneva, zurich);
    assert_eq!(device.spatial.cursor_for(&geneva, SyncKind::Tracks), 0);
    assert_eq!(device.spatial.cursor_for(&zurich, SyncKind::Keys), 0);
}

#[test]
fn test_shard_contains_its_coordinate() {
    let device = Device::at(at(100, 0));

    for coordinate in [
        Coordinate::new(46.2, 6.1),
        Coordinate::new(-33.9, 151.2),
        Coordinate::new(-0.5, -0.5),
    ] {
        let shard = device.spatial.shard_for(&coordinate);
        assert!(shard.bounds().contains(&coordinate), "{coordinate:?}");
    }

    let shard = device.spatial.shard_for(&Coordinate::new(-0.5, -0.5));
    assert_eq!((shard.lat_index, shard.lng_index), (-1, -1));
}

#[test]
fn test_cursors_survive_reopen() {
    let device = Device::at(at(100, 0));
    let shard = device.spatial.shard_for(&Coordinate::new(46.2, 6.1));
    device.spatial.advance_cursor(&shard, SyncKind::Tracks, 42).unwrap();

    let reopened = Device::with_storage(device.storage.clone(), device.clock.clone());

    assert_eq!(reopened.spatial.cursor_for(&shard, SyncKind::Tracks), 42);
}
