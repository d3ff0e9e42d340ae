// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Exchange payload: `identifier (48 bytes) || metadata ciphertext (48 bytes)`.
//!
//! Carried verbatim over the GATT characteristic and sealed under the
//! ephemeral key for direct contacts.

use thiserror::Error;

use super::encryption::{self, SymmetricKey, SEAL_OVERHEAD};
use super::identifiers::{RollingIdentifier, IDENTIFIER_LENGTH};
use super::metadata::MetadataCiphertext;
use super::EncryptionError;

/// Exact length of an exchange payload.
pub const PAYLOAD_LENGTH: usize = 2 * IDENTIFIER_LENGTH;

/// Exact length of a payload sealed with [`ExchangePayload::seal`].
pub const SEALED_PAYLOAD_LENGTH: usize = PAYLOAD_LENGTH + SEAL_OVERHEAD;

/// Payload length did not match [`PAYLOAD_LENGTH`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid payload length: expected {PAYLOAD_LENGTH} bytes, got {actual}")]
pub struct InvalidPayloadLength {
    pub actual: usize,
}

/// A rolling identifier with its co-transmitted metadata ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangePayload {
    pub identifier: RollingIdentifier,
    pub metadata: MetadataCiphertext,
}

impl ExchangePayload {
    pub fn to_bytes(&self) -> [u8; PAYLOAD_LENGTH] {
        let mut out = [0u8; PAYLOAD_LENGTH];
        out[..IDENTIFIER_LENGTH].copy_from_slice(self.identifier.as_bytes());
        out[IDENTIFIER_LENGTH..].copy_from_slice(self.metadata.as_bytes());
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, InvalidPayloadLength> {
        if data.len() != PAYLOAD_LENGTH {
            return Err(InvalidPayloadLength { actual: data.len() });
        }

        let (id, meta) = data.split_at(IDENTIFIER_LENGTH);
        let identifier: [u8; IDENTIFIER_LENGTH] = id
            .try_into()
            .map_err(|_| InvalidPayloadLength { actual: data.len() })?;
        let metadata: [u8; IDENTIFIER_LENGTH] = meta
            .try_into()
            .map_err(|_| InvalidPayloadLength { actual: data.len() })?;

        Ok(ExchangePayload {
            identifier: RollingIdentifier::from_bytes(identifier),
            metadata: MetadataCiphertext::from_bytes(metadata),
        })
    }

    /// Seals the payload under an externally supplied key.
    ///
    /// Fixed size in, fixed size out: the result is always
    /// [`SEALED_PAYLOAD_LENGTH`] bytes.
    pub fn seal(&self, key: &SymmetricKey) -> Result<Vec<u8>, EncryptionError> {
        encryption::encrypt(key, &self.to_bytes())
    }

    /// Opens a payload sealed with [`ExchangePayload::seal`].
    pub fn open(sealed: &[u8], key: &SymmetricKey) -> Result<Self, EncryptionError> {
        if sealed.len() != SEALED_PAYLOAD_LENGTH {
            return Err(EncryptionError::DecryptionFailed);
        }
        let plain = encryption::decrypt(key, sealed)?;
        Self::from_bytes(&plain).map_err(|_| EncryptionError::DecryptionFailed)
    }
}
