// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod encryption;
pub mod engine;
pub mod identifiers;
pub mod kdf;
pub mod metadata;
pub mod payload;

pub use encryption::{decrypt, encrypt, EncryptionError, SymmetricKey};
pub use engine::{CryptoEngine, CryptoError};
pub use identifiers::{
    day_number, day_start_millis, derive_all_identifiers, interval_index, DaySecret,
    RollingIdentifier, DAY_MILLIS, IDENTIFIER_LENGTH, INTERVALS_PER_DAY, INTERVAL_MILLIS,
};
pub use kdf::HKDF;
pub use metadata::{decrypt_metadata, ContactMetadata, Coordinate, MetadataCiphertext};
pub use payload::{
    ExchangePayload, InvalidPayloadLength, PAYLOAD_LENGTH, SEALED_PAYLOAD_LENGTH,
};
