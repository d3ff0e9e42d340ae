// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exposure matching.
//!
//! For each disclosed day secret, re-derive every identifier of its day and
//! test membership against the contacts observed on that day. A hit is
//! confirmed by opening the stored metadata with the same secret.

use std::collections::HashSet;

use super::store::{AppliedKey, ContactState};
use super::{ContactStore, DiagnosisKey, MatchOutcome};
use crate::crypto::{decrypt_metadata, derive_all_identifiers, RollingIdentifier};
use crate::storage::StorageError;

impl ContactStore {
    /// Applies diagnosis keys to the stored contacts.
    ///
    /// Keys applied by an earlier pass are skipped, so the operation is
    /// idempotent. A skipped key does not see encounters added since it was
    /// first applied. The whole pass runs under the store's write lock and is
    /// therefore serialized with encounter appends.
    pub fn match_against(&self, keys: &[DiagnosisKey]) -> Result<MatchOutcome, StorageError> {
        let outcome = self.state.update(|state| {
            let mut newly_exposed = 0;

            for key in keys {
                let applied = AppliedKey {
                    day: key.day,
                    fingerprint: key.value.fingerprint(),
                };
                if state.applied.contains(&applied) {
                    tracing::debug!(day = key.day, "diagnosis key already applied");
                    continue;
                }

                let identifiers: HashSet<RollingIdentifier> =
                    derive_all_identifiers(&key.value, key.day).into_iter().collect();

                newly_exposed += match_bluetooth(state, key, &identifiers);
                newly_exposed += match_qr(state, key, &identifiers);

                state.applied.insert(applied);
            }

            outcome_of(state, newly_exposed)
        })?;

        if outcome.newly_exposed > 0 {
            tracing::info!(newly_exposed = outcome.newly_exposed, "exposure detected");
        }
        Ok(outcome)
    }
}

fn match_bluetooth(
    state: &mut ContactState,
    key: &DiagnosisKey,
    identifiers: &HashSet<RollingIdentifier>,
) -> usize {
    let mut exposed = 0;

    for identifier in identifiers {
        let Some(contact) = state.bluetooth.get_mut(&(key.day, *identifier)) else {
            continue;
        };
        if contact.exposed {
            continue;
        }

        let revealed = contact
            .encounters
            .iter()
            .find_map(|e| decrypt_metadata(&e.metadata, &key.value).ok());

        match revealed {
            Some(metadata) => {
                contact.exposed = true;
                contact.revealed = Some(metadata);
                exposed += 1;
            }
            None => tracing::warn!(
                id = %identifier.short_hex(),
                day = key.day,
                "identifier matched but metadata did not decrypt; record left unexposed"
            ),
        }
    }

    exposed
}

fn match_qr(
    state: &mut ContactState,
    key: &DiagnosisKey,
    identifiers: &HashSet<RollingIdentifier>,
) -> usize {
    let mut exposed = 0;

    for contact in state
        .qr
        .iter_mut()
        .filter(|c| c.day == key.day && !c.exposed && identifiers.contains(&c.identifier))
    {
        match contact.metadata.as_ref() {
            // Submitting side: the identifier came straight from the inviter.
            None => {
                contact.exposed = true;
                exposed += 1;
            }
            Some(ciphertext) => match decrypt_metadata(ciphertext, &key.value) {
                Ok(metadata) => {
                    contact.exposed = true;
                    contact.revealed = Some(metadata);
                    exposed += 1;
                }
                Err(e) => tracing::warn!(
                    id = %contact.identifier.short_hex(),
                    error = %e,
                    "direct contact matched but metadata did not decrypt"
                ),
            },
        }
    }

    exposed
}

fn outcome_of(state: &ContactState, newly_exposed: usize) -> MatchOutcome {
    let bt = state
        .bluetooth
        .values()
        .filter(|c| c.exposed)
        .map(|c| c.revealed.as_ref());
    let qr = state.qr.iter().filter(|c| c.exposed).map(|c| c.revealed.as_ref());

    let mut exposed = false;
    let mut latest: Option<(i64, crate::crypto::Coordinate)> = None;
    for revealed in bt.chain(qr) {
        exposed = true;
        if let Some(meta) = revealed {
            if let Some(coord) = meta.coordinate {
                if latest.map_or(true, |(ts, _)| meta.timestamp > ts) {
                    latest = Some((meta.timestamp, coord));
                }
            }
        }
    }

    MatchOutcome {
        exposed,
        last_exposed_coordinate: latest.map(|(_, coord)| coord),
        newly_exposed,
    }
}
