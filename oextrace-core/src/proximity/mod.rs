// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proximity Exchange Module
//!
//! Dual-role radio exchange of rolling identifiers. Every device advertises
//! one service with one read/write characteristic and, at the same time,
//! scans for the same service on other devices:
//!
//! - the [`Advertiser`] serves the local payload on read and records the
//!   payload a scanner writes;
//! - the [`Scanner`] drives each discovered peer through connect, write and
//!   read, then tears the connection down.
//!
//! Both payload directions carry exactly
//! [`PAYLOAD_LENGTH`](crate::crypto::PAYLOAD_LENGTH) bytes:
//! the rolling identifier followed by the sealed metadata.
//!
//! The platform radio stack is abstracted by [`PeripheralRadio`] and
//! [`CentralRadio`] (commands) and by the event enums delivered over
//! `tokio` channels (callbacks).

mod advertiser;
mod error;
mod scanner;
mod service;

pub use advertiser::{Advertiser, PeripheralRadio, SERVED_PAYLOAD_TTL_MS};
pub use error::ProximityError;
pub use scanner::{CentralEvent, CentralRadio, PeerState, RadioWarning, Scanner};
pub use service::{PeripheralEvent, ProximityService};

use uuid::Uuid;

/// GATT service advertised by every device.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x7c6a1d2e_3f4b_4a59_9c1e_0e5f2b8d6a10);

/// The read/write characteristic carrying the exchange payload.
pub const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x7c6a1d2e_3f4b_4a59_9c1e_0e5f2b8d6a11);

/// Rediscoveries of the same peer inside this window are ignored.
pub const DEDUP_WINDOW_MS: i64 = 5_000;

/// Power state reported by the platform radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    Unknown,
    PoweredOn,
    PoweredOff,
    Unauthorized,
}

impl RadioState {
    pub fn name(&self) -> &'static str {
        match self {
            RadioState::Unknown => "unknown",
            RadioState::PoweredOn => "powered on",
            RadioState::PoweredOff => "powered off",
            RadioState::Unauthorized => "unauthorized",
        }
    }
}
