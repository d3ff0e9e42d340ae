// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Spatial Sync Index
//!
//! Discretizes coordinates into a fixed lat/lng grid and keeps two
//! independent, monotonic sync cursors per cell: one for diagnosis keys and
//! one for tracks. A device only queries the cell it is in, and only for
//! entries newer than its last successful fetch there.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::clock::Clock;
use crate::crypto::Coordinate;
use crate::storage::{Collection, Snapshot, StorageError, StoragePort};

/// Default grid cell size in degrees.
pub const DEFAULT_CELL_DEGREES: f64 = 1.0;

const MICRO: f64 = 1_000_000.0;

/// A grid cell. The cell size is stored in micro-degrees so shards stay
/// hashable and comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationShard {
    pub lat_index: i32,
    pub lng_index: i32,
    pub cell_micro: u32,
}

/// Query filter of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl ShardBounds {
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coordinate.lat)
            && (self.min_lng..=self.max_lng).contains(&coordinate.lng)
    }
}

impl LocationShard {
    pub fn cell_degrees(&self) -> f64 {
        f64::from(self.cell_micro) / MICRO
    }

    pub fn bounds(&self) -> ShardBounds {
        let cell = self.cell_degrees();
        let min_lat = f64::from(self.lat_index) * cell;
        let min_lng = f64::from(self.lng_index) * cell;
        ShardBounds {
            min_lat: min_lat.max(-90.0),
            max_lat: (min_lat + cell).min(90.0),
            min_lng: min_lng.max(-180.0),
            max_lng: (min_lng + cell).min(180.0),
        }
    }
}

/// Which cursor of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    Keys,
    Tracks,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct ShardCursors {
    keys: i64,
    tracks: i64,
    /// Local time of the last cursor advance.
    touched_at: i64,
}

impl ShardCursors {
    fn get(&self, kind: SyncKind) -> i64 {
        match kind {
            SyncKind::Keys => self.keys,
            SyncKind::Tracks => self.tracks,
        }
    }

    fn get_mut(&mut self, kind: SyncKind) -> &mut i64 {
        match kind {
            SyncKind::Keys => &mut self.keys,
            SyncKind::Tracks => &mut self.tracks,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CursorTable {
    #[serde_as(as = "Vec<(_, _)>")]
    shards: BTreeMap<LocationShard, ShardCursors>,
}

pub struct SpatialSyncIndex {
    cell_micro: u32,
    cursors: Snapshot<CursorTable>,
    clock: Arc<dyn Clock>,
}

impl SpatialSyncIndex {
    /// Opens the index with a grid of `cell_degrees`. Non-positive or
    /// non-finite sizes fall back to [`DEFAULT_CELL_DEGREES`].
    pub fn open(
        storage: Arc<dyn StoragePort>,
        clock: Arc<dyn Clock>,
        cell_degrees: f64,
    ) -> Result<Self, StorageError> {
        let cell = if cell_degrees.is_finite() && cell_degrees > 0.0 {
            cell_degrees
        } else {
            tracing::warn!(cell_degrees, "invalid shard cell size, using default");
            DEFAULT_CELL_DEGREES
        };

        Ok(SpatialSyncIndex {
            cell_micro: (cell * MICRO).round().max(1.0) as u32,
            cursors: Snapshot::load(storage, Collection::SyncCursors)?,
            clock,
        })
    }

    /// The grid cell containing `coordinate`.
    pub fn shard_for(&self, coordinate: &Coordinate) -> LocationShard {
        let cell = f64::from(self.cell_micro) / MICRO;
        LocationShard {
            lat_index: (coordinate.lat / cell).floor() as i32,
            lng_index: (coordinate.lng / cell).floor() as i32,
            cell_micro: self.cell_micro,
        }
    }

    /// Last synced timestamp of `kind` in `shard`; 0 when never synced.
    pub fn cursor_for(&self, shard: &LocationShard, kind: SyncKind) -> i64 {
        self.cursors
            .read()
            .shards
            .get(shard)
            .map_or(0, |c| c.get(kind))
    }

    /// Moves the cursor forward to `timestamp`.
    ///
    /// A timestamp not greater than the current cursor is a no-op, so late
    /// responses cannot regress it. Returns whether the cursor moved.
    pub fn advance_cursor(
        &self,
        shard: &LocationShard,
        kind: SyncKind,
        timestamp: i64,
    ) -> Result<bool, StorageError> {
        if timestamp <= self.cursor_for(shard, kind) {
            return Ok(false);
        }

        let now = self.clock.now_millis();
        let moved = self.cursors.update(|table| {
            let entry = table.shards.entry(*shard).or_default();
            let cursor = entry.get_mut(kind);
            // Re-checked under the write lock.
            if timestamp <= *cursor {
                return false;
            }
            *cursor = timestamp;
            entry.touched_at = now;
            true
        })?;

        if moved {
            tracing::debug!(?shard, ?kind, timestamp, "sync cursor advanced");
        }
        Ok(moved)
    }

    /// Drops shards whose cursors were last advanced before `horizon_millis`.
    pub fn purge_before(&self, horizon_millis: i64) -> Result<usize, StorageError> {
        if self
            .cursors
            .read()
            .shards
            .values()
            .all(|c| c.touched_at >= horizon_millis)
        {
            return Ok(0);
        }

        self.cursors.update(|table| {
            let before = table.shards.len();
            table.shards.retain(|_, c| c.touched_at >= horizon_millis);
            before - table.shards.len()
        })
    }
}
