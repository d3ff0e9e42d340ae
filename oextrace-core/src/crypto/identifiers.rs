// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Day Secrets and Rolling Identifiers
//!
//! Each calendar day (UTC) the device owns one random 32-byte day secret.
//! The day is split into fixed 10-minute intervals and each interval has
//! a rolling identifier derived with HKDF from the day secret, the day
//! number and the interval index. The same secret also yields the key that
//! seals the metadata broadcast alongside each identifier.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ring::rand::SystemRandom;
use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;
use zeroize::Zeroize;

use super::encryption::SymmetricKey;
use super::kdf::HKDF;
use super::EncryptionError;

/// Length in bytes of a rolling identifier (and of a metadata ciphertext).
pub const IDENTIFIER_LENGTH: usize = 48;

/// Milliseconds in one day.
pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Width of one identifier interval.
pub const INTERVAL_MILLIS: i64 = 10 * 60 * 1000;

/// Number of identifier intervals per day.
pub const INTERVALS_PER_DAY: u32 = (DAY_MILLIS / INTERVAL_MILLIS) as u32;

/// KDF info constants for domain separation.
const ROLLING_ID_INFO: &[u8] = b"OExTrace_Rolling_Id";
const METADATA_KEY_INFO: &[u8] = b"OExTrace_Metadata_Key";

/// Returns the day number (days since the Unix epoch, UTC) of a timestamp.
///
/// This is the join key shared by every store.
pub fn day_number(timestamp_millis: i64) -> i64 {
    timestamp_millis.div_euclid(DAY_MILLIS)
}

/// Returns the identifier interval a timestamp falls into.
pub fn interval_index(timestamp_millis: i64) -> u32 {
    (timestamp_millis.rem_euclid(DAY_MILLIS) / INTERVAL_MILLIS) as u32
}

/// Returns the first millisecond of a day.
pub fn day_start_millis(day: i64) -> i64 {
    day * DAY_MILLIS
}

/// A per-day root secret.
#[serde_as]
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DaySecret {
    #[serde_as(as = "Base64")]
    bytes: [u8; 32],
}

impl std::fmt::Debug for DaySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaySecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Drop for DaySecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl PartialEq for DaySecret {
    fn eq(&self, other: &Self) -> bool {
        ring::constant_time::verify_slices_are_equal(&self.bytes, &other.bytes).is_ok()
    }
}

impl Eq for DaySecret {}

impl DaySecret {
    /// Generates a fresh random day secret.
    pub fn generate() -> Self {
        let rng = SystemRandom::new();
        let bytes = ring::rand::generate::<[u8; 32]>(&rng)
            .expect("System RNG should not fail")
            .expose();
        DaySecret { bytes }
    }

    /// Creates a secret from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        DaySecret { bytes }
    }

    /// Returns the raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Encodes the secret as standard base64 (diagnosis key wire format).
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes)
    }

    /// Decodes a secret from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, EncryptionError> {
        let decoded = BASE64
            .decode(encoded)
            .map_err(|_| EncryptionError::InvalidKey)?;
        let bytes: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| EncryptionError::InvalidKey)?;
        Ok(DaySecret { bytes })
    }

    /// Returns a one-way fingerprint of the secret (hex SHA-256).
    ///
    /// Stored in place of the secret wherever only "seen before" matters.
    pub fn fingerprint(&self) -> String {
        hex::encode(ring::digest::digest(&ring::digest::SHA256, &self.bytes))
    }

    /// Derives the rolling identifier for one interval of `day`.
    pub fn rolling_identifier(&self, day: i64, interval: u32) -> RollingIdentifier {
        let mut info = Vec::with_capacity(ROLLING_ID_INFO.len() + 12);
        info.extend_from_slice(ROLLING_ID_INFO);
        info.extend_from_slice(&day.to_be_bytes());
        info.extend_from_slice(&interval.to_be_bytes());

        RollingIdentifier(HKDF::derive::<IDENTIFIER_LENGTH>(None, &self.bytes, &info))
    }

    /// Derives the key that seals contact metadata for this day.
    pub fn metadata_key(&self) -> SymmetricKey {
        SymmetricKey::from_bytes(HKDF::derive_key(None, &self.bytes, METADATA_KEY_INFO))
    }
}

/// Enumerates the rolling identifier of every interval of `day`.
pub fn derive_all_identifiers(secret: &DaySecret, day: i64) -> Vec<RollingIdentifier> {
    (0..INTERVALS_PER_DAY)
        .map(|interval| secret.rolling_identifier(day, interval))
        .collect()
}

/// A short-lived pseudorandom identifier broadcast to nearby devices.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollingIdentifier(#[serde_as(as = "Base64")] [u8; IDENTIFIER_LENGTH]);

impl std::fmt::Debug for RollingIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RollingIdentifier({})", self.short_hex())
    }
}

impl RollingIdentifier {
    /// Wraps raw identifier bytes.
    pub fn from_bytes(bytes: [u8; IDENTIFIER_LENGTH]) -> Self {
        RollingIdentifier(bytes)
    }

    /// Returns the raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LENGTH] {
        &self.0
    }

    /// Standard base64 encoding (contact link `r` parameter).
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Decodes an identifier from standard base64.
    pub fn from_base64(encoded: &str) -> Option<Self> {
        let decoded = BASE64.decode(encoded).ok()?;
        let bytes: [u8; IDENTIFIER_LENGTH] = decoded.as_slice().try_into().ok()?;
        Some(RollingIdentifier(bytes))
    }

    /// First eight hex characters, for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_number_boundaries() {
        assert_eq!(day_number(0), 0);
        assert_eq!(day_number(DAY_MILLIS - 1), 0);
        assert_eq!(day_number(DAY_MILLIS), 1);
        assert_eq!(day_number(-1), -1);
    }

    #[test]
    fn test_interval_index() {
        assert_eq!(INTERVALS_PER_DAY, 144);
        assert_eq!(interval_index(day_start_millis(100)), 0);
        assert_eq!(interval_index(day_start_millis(100) + 3 * INTERVAL_MILLIS + 5), 3);
        assert_eq!(interval_index(day_start_millis(101) - 1), INTERVALS_PER_DAY - 1);
    }

    #[test]
    fn test_intervals_have_distinct_identifiers() {
        let secret = DaySecret::generate();
        let ids = derive_all_identifiers(&secret, 100);
        let unique: std::collections::HashSet<_> = ids.iter().collect();

        assert_eq!(ids.len(), INTERVALS_PER_DAY as usize);
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = DaySecret::from_bytes([7u8; 32]);
        assert!(format!("{:?}", secret).contains("REDACTED"));
    }

    #[test]
    fn test_identifier_serializes_as_base64() {
        let id = DaySecret::from_bytes([1u8; 32]).rolling_identifier(1, 2);
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, format!("\"{}\"", id.to_base64()));
        assert_eq!(serde_json::from_str::<RollingIdentifier>(&json).unwrap(), id);
    }
}
