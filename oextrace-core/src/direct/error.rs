// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

use crate::backend::BackendError;
use crate::crypto::{CryptoError, EncryptionError};
use crate::storage::StorageError;

/// Direct-contact error types.
#[derive(Error, Debug)]
pub enum DirectContactError {
    /// The invitation is outside its validity window; nothing was sent.
    #[error("contact code expired (issued at {tst}, now {now})")]
    ContactExpired { tst: i64, now: i64 },

    /// The invitation link could not be parsed.
    #[error("invalid invitation: {0}")]
    InvalidInvitation(String),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
