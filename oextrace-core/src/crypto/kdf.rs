// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HKDF-SHA256 key derivation.

use ring::hkdf;

/// Output length wrapper for `ring::hkdf`.
struct OutputLen(usize);

impl hkdf::KeyType for OutputLen {
    fn len(&self) -> usize {
        self.0
    }
}

/// HKDF-SHA256 (RFC 5869).
pub struct HKDF;

impl HKDF {
    /// Derives `N` bytes of output keying material.
    ///
    /// `N` must not exceed 255 * 32 bytes; every caller in this crate uses
    /// at most 48.
    pub fn derive<const N: usize>(salt: Option<&[u8]>, ikm: &[u8], info: &[u8]) -> [u8; N] {
        let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, salt.unwrap_or(&[]));
        let prk = salt.extract(ikm);
        let info = [info];

        let mut out = [0u8; N];
        prk.expand(&info, OutputLen(N))
            .and_then(|okm| okm.fill(&mut out))
            .expect("HKDF output length within RFC 5869 limit");
        out
    }

    /// Derives a 32-byte key.
    pub fn derive_key(salt: Option<&[u8]>, ikm: &[u8], info: &[u8]) -> [u8; 32] {
        Self::derive::<32>(salt, ikm, info)
    }
}
