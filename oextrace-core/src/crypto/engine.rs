// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Crypto Engine
//!
//! Owns the device's day secret history (single writer, many readers) and
//! produces the identifier/metadata pair that both exchange protocols
//! transmit.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use super::identifiers::{day_number, interval_index, DaySecret};
use super::metadata::{ContactMetadata, Coordinate};
use super::payload::ExchangePayload;
use super::EncryptionError;
use crate::clock::Clock;
use crate::storage::{Collection, Snapshot, StorageError, StoragePort};

/// Crypto engine error types.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("encryption error: {0}")]
    Encryption(#[from] EncryptionError),
}

/// Day secrets keyed by day number.
type SecretHistory = BTreeMap<i64, DaySecret>;

/// Derives identifiers and seals metadata with the local day secrets.
pub struct CryptoEngine {
    secrets: Snapshot<SecretHistory>,
    location: RwLock<Option<Coordinate>>,
    clock: Arc<dyn Clock>,
}

impl CryptoEngine {
    /// Loads the secret history from storage.
    pub fn open(storage: Arc<dyn StoragePort>, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        Ok(CryptoEngine {
            secrets: Snapshot::load(storage, Collection::DaySecrets)?,
            location: RwLock::new(None),
            clock,
        })
    }

    /// Returns the clock this engine timestamps metadata with.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the current day number.
    pub fn current_day(&self) -> i64 {
        day_number(self.clock.now_millis())
    }

    /// Records the latest known location, embedded in future metadata.
    pub fn update_location(&self, coordinate: Coordinate) {
        *self.location.write() = Some(coordinate);
    }

    /// Returns the latest known location.
    pub fn current_location(&self) -> Option<Coordinate> {
        *self.location.read()
    }

    /// Returns today's secret, generating and persisting it on first use.
    pub fn today_secret(&self) -> Result<DaySecret, StorageError> {
        let day = self.current_day();
        if let Some(secret) = self.secrets.read().get(&day) {
            return Ok(secret.clone());
        }

        // Another caller may have generated it between the read and write lock.
        self.secrets.update(|history| {
            history
                .entry(day)
                .or_insert_with(|| {
                    tracing::info!(day, "generated new day secret");
                    DaySecret::generate()
                })
                .clone()
        })
    }

    /// Returns the secret for a past day, if still retained.
    pub fn secret_for_day(&self, day: i64) -> Option<DaySecret> {
        self.secrets.read().get(&day).cloned()
    }

    /// Returns the identifier for the current interval together with the
    /// current metadata sealed under today's secret.
    ///
    /// Both exchange protocols call this, so BLE and direct contacts follow
    /// the same rules.
    pub fn current_rolling_identifier_and_metadata(&self) -> Result<ExchangePayload, CryptoError> {
        let now = self.clock.now_millis();
        let secret = self.today_secret()?;

        let identifier = secret.rolling_identifier(day_number(now), interval_index(now));
        let metadata =
            ContactMetadata::new(now, self.current_location()).seal(&secret.metadata_key())?;

        Ok(ExchangePayload {
            identifier,
            metadata,
        })
    }

    /// Own secrets still inside the retention window, newest first.
    pub fn latest_day_secrets(&self) -> Vec<(i64, DaySecret)> {
        self.secrets
            .read()
            .iter()
            .rev()
            .map(|(day, secret)| (*day, secret.clone()))
            .collect()
    }

    /// Destroys every secret of a day before `horizon_day`.
    pub fn purge_before(&self, horizon_day: i64) -> Result<usize, StorageError> {
        if self.secrets.read().range(..horizon_day).next().is_none() {
            return Ok(0);
        }

        self.secrets.update(|history| {
            let kept = history.split_off(&horizon_day);
            let removed = history.len();
            *history = kept;
            removed
        })
    }
}
