// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact Store Module
//!
//! Bluetooth encounters and direct (scanned-code) contacts observed by this
//! device, plus the matcher that reconciles them against published
//! diagnosis keys.

mod matcher;
mod store;

pub use store::ContactStore;

use serde::{Deserialize, Serialize};

use crate::crypto::{ContactMetadata, Coordinate, DaySecret, MetadataCiphertext, RollingIdentifier};

/// One observed radio exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    /// Signal strength in dBm, 0 when unknown.
    pub rssi: i16,
    /// Metadata ciphertext received with the identifier.
    pub metadata: MetadataCiphertext,
    /// Local capture time in epoch milliseconds.
    pub captured_at: i64,
}

impl Encounter {
    pub fn new(rssi: i16, metadata: MetadataCiphertext, captured_at: i64) -> Self {
        Encounter {
            rssi,
            metadata,
            captured_at,
        }
    }
}

/// Encounters sharing one observed identifier on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BluetoothContact {
    pub identifier: RollingIdentifier,
    pub day: i64,
    pub encounters: Vec<Encounter>,
    /// Set once a diagnosis key matched this contact.
    pub exposed: bool,
    /// Metadata revealed by the matching diagnosis key.
    pub revealed: Option<ContactMetadata>,
}

/// A contact registered through the direct-contact protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrContact {
    pub identifier: RollingIdentifier,
    pub day: i64,
    /// Peer metadata ciphertext. Absent on the submitting side, which only
    /// knows the inviter's advertised identifier.
    pub metadata: Option<MetadataCiphertext>,
    pub exposed: bool,
    pub revealed: Option<ContactMetadata>,
}

impl QrContact {
    pub fn new(identifier: RollingIdentifier, day: i64, metadata: Option<MetadataCiphertext>) -> Self {
        QrContact {
            identifier,
            day,
            metadata,
            exposed: false,
            revealed: None,
        }
    }
}

/// A day secret disclosed by a diagnosed device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisKey {
    /// The disclosed day secret (base64 on the wire).
    pub value: DaySecret,
    /// Day the secret was used on.
    pub day: i64,
    /// Backend publication time, drives the sync cursor.
    #[serde(default)]
    pub tst: i64,
}

impl DiagnosisKey {
    pub fn new(value: DaySecret, day: i64, tst: i64) -> Self {
        DiagnosisKey { value, day, tst }
    }
}

/// Result of a matching pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchOutcome {
    /// Device-level exposure state after the pass.
    pub exposed: bool,
    /// Coordinate of the most recent exposed contact, if known.
    pub last_exposed_coordinate: Option<Coordinate>,
    /// Contacts flipped to exposed by this pass.
    pub newly_exposed: usize,
}

/// Either kind of contact, for listing.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactSummary {
    Bluetooth(BluetoothContact),
    Qr(QrContact),
}

impl ContactSummary {
    pub fn day(&self) -> i64 {
        match self {
            ContactSummary::Bluetooth(c) => c.day,
            ContactSummary::Qr(c) => c.day,
        }
    }

    pub fn is_exposed(&self) -> bool {
        match self {
            ContactSummary::Bluetooth(c) => c.exposed,
            ContactSummary::Qr(c) => c.exposed,
        }
    }

    pub fn revealed(&self) -> Option<&ContactMetadata> {
        match self {
            ContactSummary::Bluetooth(c) => c.revealed.as_ref(),
            ContactSummary::Qr(c) => c.revealed.as_ref(),
        }
    }
}
