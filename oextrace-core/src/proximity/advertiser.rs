// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Advertiser (peripheral) role.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::{ProximityError, RadioState, CHARACTERISTIC_UUID, SERVICE_UUID};
use crate::contacts::{ContactStore, Encounter};
use crate::crypto::{CryptoEngine, ExchangePayload, PAYLOAD_LENGTH};
use crate::logs::{ProtocolLog, TAG_ADVERTISER};

/// How long the blob served to a central stays available for continuation
/// reads.
pub const SERVED_PAYLOAD_TTL_MS: i64 = 30_000;

/// Commands the advertiser issues to the platform peripheral stack.
pub trait PeripheralRadio: Send + Sync {
    /// Publishes the primary service with its read/write characteristic.
    fn add_service(&self, service: Uuid, characteristic: Uuid) -> Result<(), ProximityError>;

    /// Starts broadcasting the service identifier.
    fn start_advertising(&self, service: Uuid) -> Result<(), ProximityError>;
}

/// Serves the local payload and records payloads written by scanners.
pub struct Advertiser<P: PeripheralRadio> {
    radio: P,
    crypto: Arc<CryptoEngine>,
    contacts: Arc<ContactStore>,
    log: Arc<ProtocolLog>,
    /// Blob served to each central, kept between the first (offset 0) read
    /// and its continuation reads.
    served: HashMap<Uuid, ServedPayload>,
}

#[derive(Debug, Clone, Copy)]
struct ServedPayload {
    blob: [u8; PAYLOAD_LENGTH],
    served_at: i64,
}

impl<P: PeripheralRadio> Advertiser<P> {
    pub fn new(
        radio: P,
        crypto: Arc<CryptoEngine>,
        contacts: Arc<ContactStore>,
        log: Arc<ProtocolLog>,
    ) -> Self {
        Advertiser {
            radio,
            crypto,
            contacts,
            log,
            served: HashMap::new(),
        }
    }

    pub fn radio(&self) -> &P {
        &self.radio
    }

    /// Number of centrals with a cached payload.
    pub fn cached_centrals(&self) -> usize {
        self.served.len()
    }

    /// Reacts to a peripheral power state change.
    pub fn handle_state(&mut self, state: RadioState) -> Result<(), ProximityError> {
        self.log.append(TAG_ADVERTISER, state.name());
        tracing::info!(state = state.name(), "peripheral state changed");

        match state {
            RadioState::PoweredOn => {
                self.radio.add_service(SERVICE_UUID, CHARACTERISTIC_UUID)?;
                self.radio.start_advertising(SERVICE_UUID)?;
                self.log.append(TAG_ADVERTISER, "Advertising has started");
                Ok(())
            }
            RadioState::PoweredOff => {
                self.served.clear();
                Err(ProximityError::RadioUnavailable)
            }
            RadioState::Unknown | RadioState::Unauthorized => Ok(()),
        }
    }

    /// Serves the payload from `offset`.
    ///
    /// An offset-0 read produces a fresh payload; a continuation read gets
    /// the rest of the payload served to the same central, so a long read
    /// never mixes two different blobs. Cached blobs older than
    /// [`SERVED_PAYLOAD_TTL_MS`] are evicted.
    pub fn handle_read(&mut self, central: Uuid, offset: usize) -> Result<Vec<u8>, ProximityError> {
        let now = self.crypto.clock().now_millis();
        self.served
            .retain(|_, served| now - served.served_at < SERVED_PAYLOAD_TTL_MS);

        let blob = match self.served.get(&central) {
            Some(served) if offset > 0 => served.blob,
            _ => {
                let blob = self.crypto.current_rolling_identifier_and_metadata()?.to_bytes();
                self.served.insert(
                    central,
                    ServedPayload {
                        blob,
                        served_at: now,
                    },
                );
                blob
            }
        };

        if offset > blob.len() {
            tracing::debug!(%central, offset, "read past end of payload");
            return Err(ProximityError::InvalidOffset {
                offset,
                len: blob.len(),
            });
        }

        self.log
            .append(TAG_ADVERTISER, format!("Sent RPI to {central}"));
        Ok(blob[offset..].to_vec())
    }

    /// Records the payload written by a scanning central.
    ///
    /// The signal strength of the writer cannot be measured in this role,
    /// so the encounter is stored with an RSSI of 0.
    pub fn handle_write(&mut self, central: Uuid, data: &[u8]) -> Result<(), ProximityError> {
        let payload = match ExchangePayload::from_bytes(data) {
            Ok(payload) => payload,
            Err(e) => {
                self.log.append(
                    TAG_ADVERTISER,
                    format!("Received unexpected data length: {}", data.len()),
                );
                tracing::debug!(%central, len = data.len(), "rejected write");
                return Err(e.into());
            }
        };

        let now = self.crypto.clock().now_millis();
        self.contacts.add_encounter(
            payload.identifier,
            self.crypto.current_day(),
            Encounter::new(0, payload.metadata, now),
        )?;

        self.log
            .append(TAG_ADVERTISER, format!("Received RPI from {central}"));
        tracing::debug!(%central, id = %payload.identifier.short_hex(), "recorded written payload");
        Ok(())
    }
}
