// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Radio exchange error types.

use thiserror::Error;

use crate::crypto::{CryptoError, InvalidPayloadLength};
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ProximityError {
    /// A payload did not have exactly two identifier-sized fields.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] InvalidPayloadLength),

    /// A partial read started past the end of the blob.
    #[error("invalid read offset {offset} for blob of {len} bytes")]
    InvalidOffset { offset: usize, len: usize },

    /// The radio is powered off.
    #[error("radio unavailable")]
    RadioUnavailable,

    /// The platform radio stack reported a failure.
    #[error("radio error: {0}")]
    Radio(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
