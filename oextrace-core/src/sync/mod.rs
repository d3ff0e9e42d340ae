// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync Driver
//!
//! Location-triggered, throttled sync cycle for the shard the device is in:
//!
//! 1. fetch diagnosis keys newer than the keys cursor, match them, advance
//!    the cursor to the newest key;
//! 2. fetch tracks newer than the tracks cursor, store the foreign ones,
//!    advance the cursor to the newest point;
//! 3. while the user reports exposure, disclose own day secrets and
//!    completed days of the local track.
//!
//! A backend failure in one step is recorded in the report and leaves that
//! step's cursor where it was; the next cycle retries.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{Backend, BackendError, StorageQuery, UploadKeysRequest, UploadTracksRequest};
use crate::contacts::{ContactStore, DiagnosisKey, MatchOutcome};
use crate::crypto::{Coordinate, CryptoEngine};
use crate::spatial::{LocationShard, SpatialSyncIndex, SyncKind};
use crate::status::{UserStatus, UserStatusStore};
use crate::storage::StorageError;
use crate::tracks::{RawTrackPoint, Track, TrackStore};

/// Default minimum time between two sync cycles.
pub const DEFAULT_SYNC_INTERVAL_MS: i64 = 60_000;

/// Outcome of one sync cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub shard: LocationShard,
    pub keys_fetched: usize,
    /// Matching result, absent when the key fetch failed.
    pub outcome: Option<MatchOutcome>,
    pub tracks_fetched: usize,
    pub tracks_added: usize,
    pub keys_uploaded: usize,
    pub tracks_uploaded: usize,
    /// Failed backend calls, by step name.
    pub errors: Vec<(&'static str, BackendError)>,
}

impl SyncReport {
    fn new(shard: LocationShard) -> Self {
        SyncReport {
            shard,
            keys_fetched: 0,
            outcome: None,
            tracks_fetched: 0,
            tracks_added: 0,
            keys_uploaded: 0,
            tracks_uploaded: 0,
            errors: Vec::new(),
        }
    }

    pub fn newly_exposed(&self) -> usize {
        self.outcome.as_ref().map_or(0, |o| o.newly_exposed)
    }
}

pub struct SyncDriver {
    crypto: Arc<CryptoEngine>,
    contacts: Arc<ContactStore>,
    tracks: Arc<TrackStore>,
    spatial: Arc<SpatialSyncIndex>,
    status: Arc<UserStatusStore>,
    backend: Arc<dyn Backend>,
    interval_ms: i64,
    last_cycle: Mutex<Option<i64>>,
}

impl SyncDriver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        crypto: Arc<CryptoEngine>,
        contacts: Arc<ContactStore>,
        tracks: Arc<TrackStore>,
        spatial: Arc<SpatialSyncIndex>,
        status: Arc<UserStatusStore>,
        backend: Arc<dyn Backend>,
        interval_ms: i64,
    ) -> Self {
        SyncDriver {
            crypto,
            contacts,
            tracks,
            spatial,
            status,
            backend,
            interval_ms,
            last_cycle: Mutex::new(None),
        }
    }

    /// Handles a location update: records it, and runs a sync cycle unless
    /// one ran less than the sync interval ago.
    pub async fn on_location(&self, raw: RawTrackPoint) -> Result<Option<SyncReport>, StorageError> {
        let coordinate = raw.point.coordinate();
        self.crypto.update_location(coordinate);
        self.tracks.add_point(raw)?;

        let now = self.crypto.clock().now_millis();
        {
            let mut last = self.last_cycle.lock();
            if let Some(at) = *last {
                if now - at < self.interval_ms {
                    return Ok(None);
                }
            }
            *last = Some(now);
        }

        self.sync_now(coordinate).await.map(Some)
    }

    /// Runs one sync cycle for the shard containing `coordinate`.
    pub async fn sync_now(&self, coordinate: Coordinate) -> Result<SyncReport, StorageError> {
        let shard = self.spatial.shard_for(&coordinate);
        let mut report = SyncReport::new(shard);

        self.sync_keys(&shard, &mut report).await?;
        self.sync_tracks(&shard, &mut report).await?;

        if self.status.status() == UserStatus::Exposed {
            self.upload_keys(&shard, &mut report).await?;
            self.upload_tracks(&mut report).await?;
        }

        tracing::info!(
            ?shard,
            keys = report.keys_fetched,
            tracks = report.tracks_fetched,
            errors = report.errors.len(),
            "sync cycle finished"
        );
        Ok(report)
    }

    async fn sync_keys(&self, shard: &LocationShard, report: &mut SyncReport) -> Result<(), StorageError> {
        let cursor = self.spatial.cursor_for(shard, SyncKind::Keys);
        let query = StorageQuery::new(cursor, shard.bounds());

        let keys = match self.backend.fetch_keys(&query).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "diagnosis key fetch failed");
                report.errors.push(("fetch_keys", e));
                return Ok(());
            }
        };

        report.keys_fetched = keys.len();
        report.outcome = Some(self.contacts.match_against(&keys)?);

        if let Some(newest) = keys.iter().map(|k| k.tst).max() {
            self.spatial.advance_cursor(shard, SyncKind::Keys, newest)?;
        }
        Ok(())
    }

    async fn sync_tracks(&self, shard: &LocationShard, report: &mut SyncReport) -> Result<(), StorageError> {
        let cursor = self.spatial.cursor_for(shard, SyncKind::Tracks);
        let query = StorageQuery::new(cursor, shard.bounds());

        let tracks = match self.backend.fetch_tracks(&query).await {
            Ok(tracks) => tracks,
            Err(e) => {
                tracing::warn!(error = %e, "track fetch failed");
                report.errors.push(("fetch_tracks", e));
                return Ok(());
            }
        };

        report.tracks_fetched = tracks.len();
        let newest = tracks.iter().filter_map(Track::max_tst).max();

        let own: Vec<_> = self
            .crypto
            .latest_day_secrets()
            .into_iter()
            .map(|(_, secret)| secret)
            .collect();
        report.tracks_added = self.tracks.add_remote_tracks(tracks, &own)?;

        if let Some(newest) = newest {
            self.spatial.advance_cursor(shard, SyncKind::Tracks, newest)?;
        }
        Ok(())
    }

    /// Discloses every own day secret not yet published, today's included.
    async fn upload_keys(&self, shard: &LocationShard, report: &mut SyncReport) -> Result<(), StorageError> {
        // Make sure today's secret exists before disclosing.
        self.crypto.today_secret()?;

        let now = self.crypto.clock().now_millis();
        let keys: Vec<DiagnosisKey> = self
            .crypto
            .latest_day_secrets()
            .into_iter()
            .filter(|(day, _)| !self.status.is_key_uploaded(*day))
            .map(|(day, secret)| DiagnosisKey::new(secret, day, now))
            .collect();
        if keys.is_empty() {
            return Ok(());
        }

        let days: Vec<i64> = keys.iter().map(|k| k.day).collect();
        let request = UploadKeysRequest {
            keys,
            border: shard.bounds(),
        };

        match self.backend.upload_keys(&request).await {
            Ok(()) => {
                self.status.mark_keys_uploaded(&days)?;
                report.keys_uploaded = days.len();
                tracing::info!(count = days.len(), "day secrets disclosed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "day secret upload failed");
                report.errors.push(("upload_keys", e));
            }
        }
        Ok(())
    }

    /// Discloses the local track of every completed day not yet published.
    async fn upload_tracks(&self, report: &mut SyncReport) -> Result<(), StorageError> {
        let today = self.crypto.current_day();
        let tracks: Vec<(i64, Track)> = self
            .crypto
            .latest_day_secrets()
            .into_iter()
            .filter(|(day, _)| *day < today && !self.status.is_track_uploaded(*day))
            .filter_map(|(day, secret)| {
                let points = self.tracks.local_points_for_day(day);
                (!points.is_empty()).then(|| (day, Track::new(secret, points)))
            })
            .collect();
        if tracks.is_empty() {
            return Ok(());
        }

        let (days, tracks): (Vec<i64>, Vec<Track>) = tracks.into_iter().unzip();
        let request = UploadTracksRequest { tracks };

        match self.backend.upload_tracks(&request).await {
            Ok(()) => {
                self.status.mark_tracks_uploaded(&days)?;
                report.tracks_uploaded = days.len();
            }
            Err(e) => {
                tracing::warn!(error = %e, "track upload failed");
                report.errors.push(("upload_tracks", e));
            }
        }
        Ok(())
    }
}
