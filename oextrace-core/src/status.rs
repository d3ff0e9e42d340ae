// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! User Status
//!
//! Self-reported diagnosis state. While `Exposed`, the sync driver discloses
//! the device's day secrets and local track; the store remembers what was
//! already uploaded so each day is disclosed once.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::storage::{Collection, Snapshot, StorageError, StoragePort};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserStatus {
    #[default]
    Normal,
    Exposed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StatusState {
    status: UserStatus,
    /// Days whose secret has been published.
    uploaded_key_days: BTreeSet<i64>,
    /// Days whose local track has been published.
    uploaded_track_days: BTreeSet<i64>,
}

pub struct UserStatusStore {
    state: Snapshot<StatusState>,
}

impl UserStatusStore {
    pub fn open(storage: Arc<dyn StoragePort>) -> Result<Self, StorageError> {
        Ok(UserStatusStore {
            state: Snapshot::load(storage, Collection::UserStatus)?,
        })
    }

    pub fn status(&self) -> UserStatus {
        self.state.read().status
    }

    pub fn set_status(&self, status: UserStatus) -> Result<(), StorageError> {
        tracing::info!(?status, "user status changed");
        self.state.update(|s| s.status = status)
    }

    pub fn is_key_uploaded(&self, day: i64) -> bool {
        self.state.read().uploaded_key_days.contains(&day)
    }

    pub fn is_track_uploaded(&self, day: i64) -> bool {
        self.state.read().uploaded_track_days.contains(&day)
    }

    pub fn mark_keys_uploaded(&self, days: &[i64]) -> Result<(), StorageError> {
        self.state
            .update(|s| s.uploaded_key_days.extend(days.iter().copied()))
    }

    pub fn mark_tracks_uploaded(&self, days: &[i64]) -> Result<(), StorageError> {
        self.state
            .update(|s| s.uploaded_track_days.extend(days.iter().copied()))
    }

    /// Forgets upload records of days before `horizon_day`.
    pub fn purge_before(&self, horizon_day: i64) -> Result<usize, StorageError> {
        self.state.update(|s| {
            let before = s.uploaded_key_days.len() + s.uploaded_track_days.len();
            s.uploaded_key_days.retain(|d| *d >= horizon_day);
            s.uploaded_track_days.retain(|d| *d >= horizon_day);
            before - (s.uploaded_key_days.len() + s.uploaded_track_days.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_status_persists_across_reopen() {
        let storage: Arc<dyn StoragePort> = Arc::new(MemoryStorage::new());
        let store = UserStatusStore::open(storage.clone()).unwrap();
        assert_eq!(store.status(), UserStatus::Normal);

        store.set_status(UserStatus::Exposed).unwrap();
        store.mark_keys_uploaded(&[10, 11]).unwrap();

        let reopened = UserStatusStore::open(storage).unwrap();
        assert_eq!(reopened.status(), UserStatus::Exposed);
        assert!(reopened.is_key_uploaded(11));
        assert!(!reopened.is_track_uploaded(11));
    }

    #[test]
    fn test_purge_forgets_old_days() {
        let store = UserStatusStore::open(Arc::new(MemoryStorage::new())).unwrap();
        store.mark_keys_uploaded(&[1, 5]).unwrap();
        store.mark_tracks_uploaded(&[1]).unwrap();

        assert_eq!(store.purge_before(2).unwrap(), 2);
        assert!(store.is_key_uploaded(5));
    }
}
