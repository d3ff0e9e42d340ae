// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the tracer facade.

use thiserror::Error;

use crate::backend::BackendError;
use crate::crypto::{CryptoError, EncryptionError};
use crate::direct::DirectContactError;
use crate::proximity::ProximityError;
use crate::storage::StorageError;

/// Unified error type for tracer operations.
#[derive(Error, Debug)]
pub enum TraceError {
    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Identifier or metadata derivation failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    /// Radio exchange failed.
    #[error("proximity error: {0}")]
    Proximity(#[from] ProximityError),

    /// Direct contact failed.
    #[error("direct contact error: {0}")]
    DirectContact(#[from] DirectContactError),

    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for tracer operations.
pub type TraceResult<T> = Result<T, TraceError>;
