// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact storage operations.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::{BluetoothContact, ContactSummary, Encounter, QrContact};
use crate::crypto::RollingIdentifier;
use crate::storage::{Collection, Snapshot, StorageError, StoragePort};

/// A diagnosis key already applied by the matcher.
///
/// A key is applied once. Encounters recorded on the key's day after it was
/// applied are not matched by it, which matters when today's secret is
/// disclosed while the peer is still being met.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub(super) struct AppliedKey {
    pub day: i64,
    /// SHA-256 fingerprint of the disclosed secret.
    pub fingerprint: String,
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ContactState {
    #[serde_as(as = "Vec<(_, _)>")]
    pub bluetooth: BTreeMap<(i64, RollingIdentifier), BluetoothContact>,
    pub qr: Vec<QrContact>,
    pub applied: BTreeSet<AppliedKey>,
}

/// Persistent store of observed contacts.
///
/// Shared between the radio loop and the sync driver; every mutation is one
/// atomic snapshot update.
pub struct ContactStore {
    pub(super) state: Snapshot<ContactState>,
}

impl ContactStore {
    pub fn open(storage: Arc<dyn StoragePort>) -> Result<Self, StorageError> {
        Ok(ContactStore {
            state: Snapshot::load(storage, Collection::Contacts)?,
        })
    }

    /// Appends an encounter to the contact for `(identifier, day)`,
    /// creating the contact on first sight.
    ///
    /// Duplicate suppression happens upstream in the scanner; the store
    /// records every call.
    pub fn add_encounter(
        &self,
        identifier: RollingIdentifier,
        day: i64,
        encounter: Encounter,
    ) -> Result<(), StorageError> {
        self.state.update(|state| {
            state
                .bluetooth
                .entry((day, identifier))
                .or_insert_with(|| BluetoothContact {
                    identifier,
                    day,
                    encounters: Vec::new(),
                    exposed: false,
                    revealed: None,
                })
                .encounters
                .push(encounter);
        })?;

        tracing::debug!(id = %identifier.short_hex(), day, "encounter recorded");
        Ok(())
    }

    /// Stores a direct contact.
    pub fn add_qr_contact(&self, contact: QrContact) -> Result<(), StorageError> {
        tracing::debug!(id = %contact.identifier.short_hex(), day = contact.day, "direct contact recorded");
        self.state.update(|state| state.qr.push(contact))
    }

    pub fn bluetooth_contact(&self, identifier: &RollingIdentifier, day: i64) -> Option<BluetoothContact> {
        self.state.read().bluetooth.get(&(day, *identifier)).cloned()
    }

    pub fn bluetooth_contacts(&self) -> Vec<BluetoothContact> {
        self.state.read().bluetooth.values().cloned().collect()
    }

    pub fn qr_contacts(&self) -> Vec<QrContact> {
        self.state.read().qr.clone()
    }

    /// Total number of encounters recorded across all Bluetooth contacts.
    pub fn encounter_count(&self) -> usize {
        self.state
            .read()
            .bluetooth
            .values()
            .map(|c| c.encounters.len())
            .sum()
    }

    /// All contacts, newest day first; within a day, contacts with revealed
    /// metadata come first, most recent first.
    pub fn contacts(&self) -> Vec<ContactSummary> {
        let mut all: Vec<ContactSummary> = {
            let state = self.state.read();
            state
                .bluetooth
                .values()
                .cloned()
                .map(ContactSummary::Bluetooth)
                .chain(state.qr.iter().cloned().map(ContactSummary::Qr))
                .collect()
        };

        all.sort_by(|a, b| {
            b.day().cmp(&a.day()).then_with(|| {
                let ta = a.revealed().map(|m| m.timestamp);
                let tb = b.revealed().map(|m| m.timestamp);
                // Some(_) sorts after None, so reverse for "revealed first".
                tb.cmp(&ta)
            })
        });
        all
    }

    /// True if any stored contact has been matched.
    pub fn is_exposed(&self) -> bool {
        let state = self.state.read();
        state.bluetooth.values().any(|c| c.exposed) || state.qr.iter().any(|c| c.exposed)
    }

    /// Removes contacts and applied-key records of days before `horizon_day`.
    pub fn purge_before(&self, horizon_day: i64) -> Result<usize, StorageError> {
        self.state.update(|state| {
            let before = state.bluetooth.len() + state.qr.len() + state.applied.len();
            state.bluetooth.retain(|(day, _), _| *day >= horizon_day);
            state.qr.retain(|c| c.day >= horizon_day);
            state.applied.retain(|k| k.day >= horizon_day);
            before - (state.bluetooth.len() + state.qr.len() + state.applied.len())
        })
    }
}
