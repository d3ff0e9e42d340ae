// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Protocol Log
//!
//! Persisted, tagged record of protocol steps for on-device diagnostics.
//! Appending never fails the caller: a storage error is traced and dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::storage::{Collection, Snapshot, StorageError, StoragePort};

/// Tag of advertiser-role entries.
pub const TAG_ADVERTISER: &str = "ADV";
/// Tag of scanner-role entries.
pub const TAG_SCANNER: &str = "SCAN";
/// Tag of sync and direct-contact entries.
pub const TAG_APP: &str = "APP";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolLogEntry {
    pub tag: String,
    pub text: String,
    pub tst: i64,
}

pub struct ProtocolLog {
    entries: Snapshot<Vec<ProtocolLogEntry>>,
    clock: Arc<dyn Clock>,
}

impl ProtocolLog {
    pub fn open(storage: Arc<dyn StoragePort>, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        Ok(ProtocolLog {
            entries: Snapshot::load(storage, Collection::ProtocolLog)?,
            clock,
        })
    }

    pub fn append(&self, tag: &str, text: impl Into<String>) {
        let entry = ProtocolLogEntry {
            tag: tag.to_string(),
            text: text.into(),
            tst: self.clock.now_millis(),
        };
        if let Err(e) = self.entries.update(|entries| entries.push(entry)) {
            tracing::warn!(tag, error = %e, "failed to persist protocol log entry");
        }
    }

    /// Entries in append order.
    pub fn entries(&self) -> Vec<ProtocolLogEntry> {
        self.entries.read().clone()
    }

    /// Entries carrying `tag`, in append order.
    pub fn entries_with_tag(&self, tag: &str) -> Vec<ProtocolLogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.tag == tag)
            .cloned()
            .collect()
    }

    /// Removes entries older than `horizon_millis`.
    pub fn purge_before(&self, horizon_millis: i64) -> Result<usize, StorageError> {
        if self.entries.read().iter().all(|e| e.tst >= horizon_millis) {
            return Ok(0);
        }
        self.entries.update(|entries| {
            let before = entries.len();
            entries.retain(|e| e.tst >= horizon_millis);
            before - entries.len()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_append_and_purge() {
        let clock = Arc::new(ManualClock::new(1_000));
        let log = ProtocolLog::open(Arc::new(MemoryStorage::new()), clock.clone()).unwrap();

        log.append(TAG_SCANNER, "discovered peer");
        clock.set(5_000);
        log.append(TAG_ADVERTISER, "read request");

        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries_with_tag(TAG_ADVERTISER)[0].tst, 5_000);

        assert_eq!(log.purge_before(2_000).unwrap(), 1);
        assert_eq!(log.entries()[0].tag, TAG_ADVERTISER);
        assert_eq!(log.purge_before(2_000).unwrap(), 0);
    }
}
