// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::polyline::{segment, Polyline};
use super::{RawTrackPoint, Track, TrackPoint};
use crate::crypto::DaySecret;
use crate::storage::{Collection, Snapshot, StorageError, StoragePort};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TrackState {
    /// Own route, append order.
    local: Vec<TrackPoint>,
    /// Routes of diagnosed users, one entry per signing key.
    remote: Vec<Track>,
}

/// Local route history plus downloaded routes.
pub struct TrackStore {
    state: Snapshot<TrackState>,
    accuracy_threshold: i32,
    interval_ms: i64,
}

impl TrackStore {
    pub fn open(
        storage: Arc<dyn StoragePort>,
        accuracy_threshold: i32,
        interval_ms: i64,
    ) -> Result<Self, StorageError> {
        Ok(TrackStore {
            state: Snapshot::load(storage, Collection::Tracks)?,
            accuracy_threshold,
            interval_ms,
        })
    }

    /// Appends a location sample to the local track.
    ///
    /// Samples with an accuracy worse than the threshold (or a negative,
    /// i.e. invalid, accuracy) are discarded. Returns whether the sample
    /// was kept.
    pub fn add_point(&self, raw: RawTrackPoint) -> Result<bool, StorageError> {
        if raw.accuracy < 0 || raw.accuracy > self.accuracy_threshold {
            tracing::debug!(accuracy = raw.accuracy, "track point discarded");
            return Ok(false);
        }

        self.state.update(|s| s.local.push(raw.point))?;
        Ok(true)
    }

    /// Stores downloaded tracks, skipping the ones signed with one of the
    /// device's own secrets. Tracks sharing a key are merged.
    ///
    /// Returns the number of tracks accepted.
    pub fn add_remote_tracks(
        &self,
        tracks: Vec<Track>,
        own_secrets: &[DaySecret],
    ) -> Result<usize, StorageError> {
        let incoming: Vec<Track> = tracks
            .into_iter()
            .filter(|t| !own_secrets.contains(&t.key))
            .filter(|t| !t.points.is_empty())
            .collect();
        if incoming.is_empty() {
            return Ok(0);
        }

        self.state.update(|s| {
            let accepted = incoming.len();
            for track in incoming {
                match s.remote.iter_mut().find(|t| t.key == track.key) {
                    Some(existing) => {
                        for point in track.points {
                            if !existing.points.iter().any(|p| p.tst == point.tst) {
                                existing.points.push(point);
                            }
                        }
                    }
                    None => s.remote.push(track),
                }
            }
            accepted
        })
    }

    pub fn local_points(&self) -> Vec<TrackPoint> {
        self.state.read().local.clone()
    }

    /// Own points recorded on `day`, for disclosure.
    pub fn local_points_for_day(&self, day: i64) -> Vec<TrackPoint> {
        self.state
            .read()
            .local
            .iter()
            .filter(|p| p.day() == day)
            .copied()
            .collect()
    }

    pub fn remote_tracks(&self) -> Vec<Track> {
        self.state.read().remote.clone()
    }

    pub fn local_polylines(&self) -> Vec<Polyline> {
        segment(&self.state.read().local, self.interval_ms)
    }

    /// Polylines of every downloaded track; segments never span two tracks.
    pub fn remote_polylines(&self) -> Vec<Polyline> {
        self.state
            .read()
            .remote
            .iter()
            .flat_map(|t| segment(&t.points, self.interval_ms))
            .collect()
    }

    /// Removes points older than `horizon_millis`, and remote tracks left
    /// without points.
    pub fn purge_before(&self, horizon_millis: i64) -> Result<usize, StorageError> {
        self.state.update(|s| {
            let before = s.local.len();
            s.local.retain(|p| p.tst >= horizon_millis);
            let mut removed = before - s.local.len();

            for track in &mut s.remote {
                let before = track.points.len();
                track.points.retain(|p| p.tst >= horizon_millis);
                removed += before - track.points.len();
            }
            s.remote.retain(|t| !t.points.is_empty());
            removed
        })
    }
}
