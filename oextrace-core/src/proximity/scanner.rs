// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Scanner (central) role.
//!
//! Each discovered peer runs through
//! `Discovered → Connecting → ServiceDiscovery → CharacteristicWrite →
//! CharacteristicRead → Disconnected`. Any failure moves the peer straight
//! to `Disconnected`; nothing is retried explicitly, the scan re-offers the
//! peer once the de-dup window has passed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::{ProximityError, RadioState, CHARACTERISTIC_UUID, DEDUP_WINDOW_MS, SERVICE_UUID};
use crate::contacts::{ContactStore, Encounter};
use crate::crypto::{CryptoEngine, ExchangePayload};
use crate::logs::{ProtocolLog, TAG_SCANNER};

/// Callback from the platform central stack.
#[derive(Debug, Clone, PartialEq)]
pub enum CentralEvent {
    StateChanged(RadioState),
    Discovered { peer: Uuid, rssi: i16 },
    Connected { peer: Uuid },
    ConnectFailed { peer: Uuid, reason: String },
    /// Service and characteristic lookup finished.
    ServicesDiscovered { peer: Uuid, result: Result<(), String> },
    CharacteristicWritten { peer: Uuid, result: Result<(), String> },
    CharacteristicRead { peer: Uuid, result: Result<Vec<u8>, String> },
    Disconnected { peer: Uuid },
}

/// Commands the scanner issues to the platform central stack. Each command
/// completes asynchronously with a [`CentralEvent`].
pub trait CentralRadio: Send + Sync {
    fn start_scan(&self, service: Uuid) -> Result<(), ProximityError>;
    fn connect(&self, peer: Uuid) -> Result<(), ProximityError>;
    fn discover(&self, peer: Uuid, service: Uuid, characteristic: Uuid) -> Result<(), ProximityError>;
    fn write(&self, peer: Uuid, characteristic: Uuid, data: &[u8]) -> Result<(), ProximityError>;
    fn read(&self, peer: Uuid, characteristic: Uuid) -> Result<(), ProximityError>;
    fn disconnect(&self, peer: Uuid);
}

/// Receives the radio power-off warning.
pub trait RadioWarning: Send + Sync {
    fn bluetooth_off(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Discovered,
    Connecting,
    ServiceDiscovery,
    CharacteristicWrite,
    CharacteristicRead,
    Disconnected,
}

#[derive(Debug, Clone, Copy)]
struct PeerEntry {
    state: PeerState,
    rssi: i16,
    discovered_at: i64,
}

/// Drives the per-peer exchange state machine.
pub struct Scanner<R: CentralRadio> {
    radio: R,
    crypto: Arc<CryptoEngine>,
    contacts: Arc<ContactStore>,
    log: Arc<ProtocolLog>,
    warning: Arc<dyn RadioWarning>,
    peers: HashMap<Uuid, PeerEntry>,
}

impl<R: CentralRadio> Scanner<R> {
    pub fn new(
        radio: R,
        crypto: Arc<CryptoEngine>,
        contacts: Arc<ContactStore>,
        log: Arc<ProtocolLog>,
        warning: Arc<dyn RadioWarning>,
    ) -> Self {
        Scanner {
            radio,
            crypto,
            contacts,
            log,
            warning,
            peers: HashMap::new(),
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn peer_state(&self, peer: &Uuid) -> Option<PeerState> {
        self.peers.get(peer).map(|e| e.state)
    }

    /// Number of peers currently tracked.
    pub fn tracked_peers(&self) -> usize {
        self.peers.len()
    }

    /// Processes events until the channel closes.
    pub async fn run(&mut self, mut events: mpsc::Receiver<CentralEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        tracing::debug!("central event channel closed");
    }

    /// Applies one radio callback. Failures are logged and reset the peer;
    /// they never escape the scanner.
    pub fn handle_event(&mut self, event: CentralEvent) {
        match event {
            CentralEvent::StateChanged(state) => self.on_state(state),
            CentralEvent::Discovered { peer, rssi } => self.on_discovered(peer, rssi),
            CentralEvent::Connected { peer } => {
                self.log.append(TAG_SCANNER, format!("Device connected: {peer}"));
                self.step(peer, PeerState::Connecting, PeerState::ServiceDiscovery, |radio| {
                    radio.discover(peer, SERVICE_UUID, CHARACTERISTIC_UUID)
                });
            }
            CentralEvent::ConnectFailed { peer, reason } => {
                self.fail(peer, &format!("Failed to connect to: {peer} ({reason})"));
            }
            CentralEvent::ServicesDiscovered { peer, result } => match result {
                Ok(()) => self.write_payload(peer),
                Err(e) => self.fail(peer, &format!("Error discovering services: {e}")),
            },
            CentralEvent::CharacteristicWritten { peer, result } => match result {
                Ok(()) => {
                    self.log.append(TAG_SCANNER, format!("Sent RPI to {peer}"));
                    self.step(
                        peer,
                        PeerState::CharacteristicWrite,
                        PeerState::CharacteristicRead,
                        |radio| radio.read(peer, CHARACTERISTIC_UUID),
                    );
                }
                Err(e) => self.fail(peer, &format!("Error write value for characteristic: {e}")),
            },
            CentralEvent::CharacteristicRead { peer, result } => match result {
                Ok(data) => self.on_read(peer, &data),
                Err(e) => self.fail(peer, &format!("Error reading characteristic: {e}")),
            },
            CentralEvent::Disconnected { peer } => {
                self.log.append(TAG_SCANNER, format!("Device disconnected: {peer}"));
                if let Some(entry) = self.peers.get_mut(&peer) {
                    entry.state = PeerState::Disconnected;
                }
            }
        }
    }

    fn on_state(&mut self, state: RadioState) {
        self.log.append(TAG_SCANNER, state.name());
        tracing::info!(state = state.name(), "central state changed");

        match state {
            RadioState::PoweredOn => match self.radio.start_scan(SERVICE_UUID) {
                Ok(()) => self.log.append(TAG_SCANNER, "Scanning has started"),
                Err(e) => tracing::warn!(error = %e, "failed to start scan"),
            },
            RadioState::PoweredOff => {
                self.peers.clear();
                tracing::warn!("{}", ProximityError::RadioUnavailable);
                self.warning.bluetooth_off();
            }
            RadioState::Unknown | RadioState::Unauthorized => {}
        }
    }

    fn on_discovered(&mut self, peer: Uuid, rssi: i16) {
        let now = self.crypto.clock().now_millis();

        // Peer addresses rotate; finished exchanges are only needed for de-dup.
        self.peers.retain(|_, entry| {
            entry.state != PeerState::Disconnected || now - entry.discovered_at < DEDUP_WINDOW_MS
        });

        if let Some(entry) = self.peers.get(&peer) {
            if entry.state != PeerState::Disconnected {
                tracing::debug!(%peer, state = ?entry.state, "exchange in flight, ignoring discovery");
                return;
            }
            if now - entry.discovered_at < DEDUP_WINDOW_MS {
                tracing::debug!(%peer, "recently seen, ignoring discovery");
                return;
            }
        }

        self.peers.insert(
            peer,
            PeerEntry {
                state: PeerState::Discovered,
                rssi,
                discovered_at: now,
            },
        );
        tracing::debug!(%peer, rssi, "connecting to peer");
        self.step(peer, PeerState::Discovered, PeerState::Connecting, |radio| {
            radio.connect(peer)
        });
    }

    fn write_payload(&mut self, peer: Uuid) {
        let payload = match self.crypto.current_rolling_identifier_and_metadata() {
            Ok(payload) => payload.to_bytes(),
            Err(e) => {
                self.fail(peer, &format!("Failed to build payload: {e}"));
                return;
            }
        };
        self.step(
            peer,
            PeerState::ServiceDiscovery,
            PeerState::CharacteristicWrite,
            |radio| radio.write(peer, CHARACTERISTIC_UUID, &payload),
        );
    }

    fn on_read(&mut self, peer: Uuid, data: &[u8]) {
        let Some(entry) = self.peers.get(&peer).copied() else {
            self.log
                .append(TAG_SCANNER, "Failed to record contact: no peripheral data");
            self.radio.disconnect(peer);
            return;
        };
        if entry.state != PeerState::CharacteristicRead {
            self.fail(peer, &format!("Unexpected read in state {:?}", entry.state));
            return;
        }

        match ExchangePayload::from_bytes(data) {
            Ok(payload) => {
                let now = self.crypto.clock().now_millis();
                let recorded = self.contacts.add_encounter(
                    payload.identifier,
                    self.crypto.current_day(),
                    Encounter::new(entry.rssi, payload.metadata, now),
                );
                match recorded {
                    Ok(()) => self.log.append(
                        TAG_SCANNER,
                        format!("Received RPI from {peer} RSSI {}", entry.rssi),
                    ),
                    Err(e) => tracing::warn!(%peer, error = %e, "failed to record encounter"),
                }
            }
            Err(e) => {
                self.log.append(
                    TAG_SCANNER,
                    format!("Received unexpected data length: {}", e.actual),
                );
            }
        }

        self.disconnect(peer);
    }

    /// Moves `peer` from `from` to `to` if the radio accepts the command.
    fn step(
        &mut self,
        peer: Uuid,
        from: PeerState,
        to: PeerState,
        command: impl FnOnce(&R) -> Result<(), ProximityError>,
    ) {
        let current = self.peers.get(&peer).map(|e| e.state);
        if current != Some(from) {
            self.fail(
                peer,
                &format!("Unexpected transition to {to:?} from {current:?}"),
            );
            return;
        }

        match command(&self.radio) {
            Ok(()) => {
                if let Some(entry) = self.peers.get_mut(&peer) {
                    entry.state = to;
                }
            }
            Err(e) => self.fail(peer, &format!("Radio command failed: {e}")),
        }
    }

    fn fail(&mut self, peer: Uuid, message: &str) {
        self.log.append(TAG_SCANNER, message);
        tracing::debug!(%peer, message, "exchange aborted");
        self.disconnect(peer);
    }

    fn disconnect(&mut self, peer: Uuid) {
        self.radio.disconnect(peer);
        if let Some(entry) = self.peers.get_mut(&peer) {
            entry.state = PeerState::Disconnected;
        }
    }
}
