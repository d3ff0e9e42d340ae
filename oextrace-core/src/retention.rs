// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Retention Manager
//!
//! Unconditional purge of every store. An entry is removed once
//! `day_number(now) - day_number(entry) > retention_days`; timestamped
//! entries are compared against the start of the first retained day, which
//! is the same boundary.

use std::sync::Arc;

use crate::contacts::ContactStore;
use crate::crypto::{day_number, day_start_millis, CryptoEngine};
use crate::direct::InvitationKeyStore;
use crate::logs::ProtocolLog;
use crate::spatial::SpatialSyncIndex;
use crate::status::UserStatusStore;
use crate::storage::StorageError;
use crate::tracks::TrackStore;

/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 14;

/// Entries removed per store by one purge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub day_secrets: usize,
    pub contacts: usize,
    pub invitation_keys: usize,
    pub track_points: usize,
    pub shard_cursors: usize,
    pub log_entries: usize,
    pub status_records: usize,
}

impl PurgeReport {
    pub fn total(&self) -> usize {
        self.day_secrets
            + self.contacts
            + self.invitation_keys
            + self.track_points
            + self.shard_cursors
            + self.log_entries
            + self.status_records
    }
}

pub struct RetentionManager {
    retention_days: i64,
    crypto: Arc<CryptoEngine>,
    contacts: Arc<ContactStore>,
    invitation_keys: Arc<InvitationKeyStore>,
    tracks: Arc<TrackStore>,
    spatial: Arc<SpatialSyncIndex>,
    log: Arc<ProtocolLog>,
    status: Arc<UserStatusStore>,
}

impl RetentionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        retention_days: i64,
        crypto: Arc<CryptoEngine>,
        contacts: Arc<ContactStore>,
        invitation_keys: Arc<InvitationKeyStore>,
        tracks: Arc<TrackStore>,
        spatial: Arc<SpatialSyncIndex>,
        log: Arc<ProtocolLog>,
        status: Arc<UserStatusStore>,
    ) -> Self {
        RetentionManager {
            retention_days,
            crypto,
            contacts,
            invitation_keys,
            tracks,
            spatial,
            log,
            status,
        }
    }

    pub fn retention_days(&self) -> i64 {
        self.retention_days
    }

    /// First day still retained at `now`.
    pub fn horizon_day(&self, now: i64) -> i64 {
        day_number(now) - self.retention_days
    }

    /// Purges every store. Stops at the first storage failure; stores
    /// already purged stay purged.
    pub fn purge(&self, now: i64) -> Result<PurgeReport, StorageError> {
        let horizon_day = self.horizon_day(now);
        let horizon_millis = day_start_millis(horizon_day);

        let report = PurgeReport {
            day_secrets: self.crypto.purge_before(horizon_day)?,
            contacts: self.contacts.purge_before(horizon_day)?,
            invitation_keys: self.invitation_keys.purge_before(horizon_millis)?,
            track_points: self.tracks.purge_before(horizon_millis)?,
            shard_cursors: self.spatial.purge_before(horizon_millis)?,
            log_entries: self.log.purge_before(horizon_millis)?,
            status_records: self.status.purge_before(horizon_day)?,
        };

        tracing::info!(horizon_day, removed = report.total(), "retention purge finished");
        Ok(report)
    }
}
