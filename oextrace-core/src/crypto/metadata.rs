// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Metadata
//!
//! The timestamp and optional coordinate of an encounter, sealed under the
//! day secret's metadata key with ChaCha20-Poly1305. The sealed form has
//! exactly [`IDENTIFIER_LENGTH`] bytes so that it fits the second half of
//! the radio payload:
//!
//! `nonce (12 bytes) || ciphertext (20 bytes) || tag (16 bytes)`
//!
//! Plaintext layout (20 bytes, big endian):
//! `timestamp_ms (8) || flags (1) || lat_e7 (4) || lng_e7 (4) || padding (3)`

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;

use super::encryption::{SymmetricKey, TAG_SIZE};
use super::identifiers::{DaySecret, IDENTIFIER_LENGTH};
use super::EncryptionError;

const NONCE_SIZE: usize = 12;
const PLAINTEXT_SIZE: usize = IDENTIFIER_LENGTH - NONCE_SIZE - TAG_SIZE;

const FLAG_HAS_COORDINATE: u8 = 0x01;

/// Fixed-point scale for coordinates (1e-7 degree resolution).
const COORD_SCALE: f64 = 10_000_000.0;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Coordinate { lat, lng }
    }
}

/// Plaintext metadata of an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactMetadata {
    /// Capture time in epoch milliseconds.
    pub timestamp: i64,
    /// Where the encounter happened, if a location fix was available.
    pub coordinate: Option<Coordinate>,
}

/// Sealed [`ContactMetadata`].
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataCiphertext(#[serde_as(as = "Base64")] [u8; IDENTIFIER_LENGTH]);

impl std::fmt::Debug for MetadataCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MetadataCiphertext({})", hex::encode(&self.0[..4]))
    }
}

impl MetadataCiphertext {
    pub fn from_bytes(bytes: [u8; IDENTIFIER_LENGTH]) -> Self {
        MetadataCiphertext(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LENGTH] {
        &self.0
    }
}

impl ContactMetadata {
    pub fn new(timestamp: i64, coordinate: Option<Coordinate>) -> Self {
        ContactMetadata {
            timestamp,
            coordinate,
        }
    }

    fn to_plaintext(self) -> [u8; PLAINTEXT_SIZE] {
        let mut out = [0u8; PLAINTEXT_SIZE];
        out[..8].copy_from_slice(&self.timestamp.to_be_bytes());

        if let Some(coord) = self.coordinate {
            out[8] = FLAG_HAS_COORDINATE;
            let lat = (coord.lat * COORD_SCALE).round() as i32;
            let lng = (coord.lng * COORD_SCALE).round() as i32;
            out[9..13].copy_from_slice(&lat.to_be_bytes());
            out[13..17].copy_from_slice(&lng.to_be_bytes());
        }

        out
    }

    fn from_plaintext(plain: &[u8]) -> Result<Self, EncryptionError> {
        if plain.len() != PLAINTEXT_SIZE {
            return Err(EncryptionError::DecryptionFailed);
        }

        let read_i32 = |range: std::ops::Range<usize>| -> Result<i32, EncryptionError> {
            plain[range]
                .try_into()
                .map(i32::from_be_bytes)
                .map_err(|_| EncryptionError::DecryptionFailed)
        };

        let timestamp = plain[..8]
            .try_into()
            .map(i64::from_be_bytes)
            .map_err(|_| EncryptionError::DecryptionFailed)?;

        let coordinate = match plain[8] {
            0 => None,
            FLAG_HAS_COORDINATE => Some(Coordinate {
                lat: f64::from(read_i32(9..13)?) / COORD_SCALE,
                lng: f64::from(read_i32(13..17)?) / COORD_SCALE,
            }),
            _ => return Err(EncryptionError::DecryptionFailed),
        };

        Ok(ContactMetadata {
            timestamp,
            coordinate,
        })
    }

    /// Seals the metadata under `key`.
    pub fn seal(&self, key: &SymmetricKey) -> Result<MetadataCiphertext, EncryptionError> {
        let rng = SystemRandom::new();
        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill(&mut nonce)
            .map_err(|_| EncryptionError::EncryptionFailed)?;

        let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), self.to_plaintext().as_slice())
            .map_err(|_| EncryptionError::EncryptionFailed)?;

        let mut out = [0u8; IDENTIFIER_LENGTH];
        out[..NONCE_SIZE].copy_from_slice(&nonce);
        out[NONCE_SIZE..].copy_from_slice(&sealed);
        Ok(MetadataCiphertext(out))
    }

    /// Opens sealed metadata. Fails closed on a wrong key or tampered data.
    pub fn open(
        ciphertext: &MetadataCiphertext,
        key: &SymmetricKey,
    ) -> Result<Self, EncryptionError> {
        let (nonce, sealed) = ciphertext.0.split_at(NONCE_SIZE);
        let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
        let plain = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| EncryptionError::DecryptionFailed)?;

        Self::from_plaintext(&plain)
    }
}

/// Decrypts metadata that was sealed under a day secret.
pub fn decrypt_metadata(
    ciphertext: &MetadataCiphertext,
    secret: &DaySecret,
) -> Result<ContactMetadata, EncryptionError> {
    ContactMetadata::open(ciphertext, &secret.metadata_key())
}
