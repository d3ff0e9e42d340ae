// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proximity Exchange Tests
//!
//! Advertiser and scanner driven through fake radios.
//!
//! These tests verify:
//! - Both sides record the other's identifier
//! - Discovery de-duplication window
//! - Payload and offset validation
//! - Power-off handling

mod common;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use common::{at, run_exchange, CentralCommand, Device, WarningCounter};
use oextrace_core::crypto::PAYLOAD_LENGTH;
use oextrace_core::proximity::{DEDUP_WINDOW_MS, SERVED_PAYLOAD_TTL_MS};
use oextrace_core::{
    CentralEvent, PeerState, PeripheralEvent, ProximityError, ProximityService, RadioState,
};

// ============================================================
// Exchange
// ============================================================

#[test]
fn test_exchange_records_both_sides() {
    let alice = Device::at(at(100, 3));
    let bob = Device::at(at(100, 3));
    let mut advertiser = alice.advertiser();
    let mut scanner = bob.scanner(Arc::new(WarningCounter::default()));
    let (peer, central) = (Uuid::new_v4(), Uuid::new_v4());

    run_exchange(&mut scanner, &mut advertiser, peer, central, -55);

    let alice_id = alice.crypto.current_rolling_identifier_and_metadata().unwrap().identifier;
    let bob_id = bob.crypto.current_rolling_identifier_and_metadata().unwrap().identifier;

    let seen_by_bob = bob.contacts.bluetooth_contact(&alice_id, 100).unwrap();
    assert_eq!(seen_by_bob.encounters.len(), 1);
    assert_eq!(seen_by_bob.encounters[0].rssi, -55);

    let seen_by_alice = alice.contacts.bluetooth_contact(&bob_id, 100).unwrap();
    assert_eq!(seen_by_alice.encounters[0].rssi, 0);

    assert_eq!(scanner.peer_state(&peer), Some(PeerState::Disconnected));
    assert_eq!(
        scanner.radio().commands().last(),
        Some(&CentralCommand::Disconnect(peer))
    );
}

#[test]
fn test_rediscovery_within_five_seconds_is_ignored() {
    let alice = Device::at(at(100, 3));
    let bob = Device::at(at(100, 3));
    let mut advertiser = alice.advertiser();
    let mut scanner = bob.scanner(Arc::new(WarningCounter::default()));
    let (peer, central) = (Uuid::new_v4(), Uuid::new_v4());

    run_exchange(&mut scanner, &mut advertiser, peer, central, -55);
    bob.clock.advance(4_000);
    scanner.handle_event(CentralEvent::Discovered { peer, rssi: -55 });

    assert_eq!(scanner.radio().connects(), 1);
    assert_eq!(bob.contacts.encounter_count(), 1);
}

#[test]
fn test_rediscovery_after_six_seconds_records_again() {
    let alice = Device::at(at(100, 3));
    let bob = Device::at(at(100, 3));
    let mut advertiser = alice.advertiser();
    let mut scanner = bob.scanner(Arc::new(WarningCounter::default()));
    let (peer, central) = (Uuid::new_v4(), Uuid::new_v4());

    run_exchange(&mut scanner, &mut advertiser, peer, central, -55);
    bob.clock.advance(6_000);
    run_exchange(&mut scanner, &mut advertiser, peer, central, -60);

    assert_eq!(scanner.radio().connects(), 2);
    assert_eq!(bob.contacts.encounter_count(), 2);
}

#[test]
fn test_connect_failure_resets_peer() {
    let bob = Device::at(at(100, 3));
    let mut scanner = bob.scanner(Arc::new(WarningCounter::default()));
    let peer = Uuid::new_v4();

    scanner.handle_event(CentralEvent::Discovered { peer, rssi: -70 });
    scanner.handle_event(CentralEvent::ConnectFailed {
        peer,
        reason: "timeout".into(),
    });

    assert_eq!(scanner.peer_state(&peer), Some(PeerState::Disconnected));
    assert_eq!(bob.contacts.encounter_count(), 0);
}

#[test]
fn test_finished_peers_are_forgotten_after_window() {
    let bob = Device::at(at(100, 3));
    let mut scanner = bob.scanner(Arc::new(WarningCounter::default()));

    for _ in 0..1000 {
        let peer = Uuid::new_v4();
        scanner.handle_event(CentralEvent::Discovered { peer, rssi: -70 });
        scanner.handle_event(CentralEvent::ConnectFailed {
            peer,
            reason: "timeout".into(),
        });
    }
    assert_eq!(scanner.tracked_peers(), 1000);

    bob.clock.advance(DEDUP_WINDOW_MS + 1);
    let fresh = Uuid::new_v4();
    scanner.handle_event(CentralEvent::Discovered { peer: fresh, rssi: -50 });

    assert_eq!(scanner.tracked_peers(), 1);
    assert_eq!(scanner.peer_state(&fresh), Some(PeerState::Connecting));
}

#[test]
fn test_served_payloads_expire() {
    let alice = Device::at(at(100, 3));
    let mut advertiser = alice.advertiser();

    for _ in 0..50 {
        advertiser.handle_read(Uuid::new_v4(), 0).unwrap();
    }
    assert_eq!(advertiser.cached_centrals(), 50);

    alice.clock.advance(SERVED_PAYLOAD_TTL_MS);
    advertiser.handle_read(Uuid::new_v4(), 0).unwrap();

    assert_eq!(advertiser.cached_centrals(), 1);
}

// ============================================================
// Validation
// ============================================================

#[test]
fn test_short_write_is_rejected() {
    let alice = Device::at(at(100, 3));
    let mut advertiser = alice.advertiser();

    let result = advertiser.handle_write(Uuid::new_v4(), &[0u8; PAYLOAD_LENGTH - 1]);

    assert!(matches!(result, Err(ProximityError::InvalidPayload(_))));
    assert_eq!(alice.contacts.encounter_count(), 0);
}

#[test]
fn test_malformed_read_is_not_recorded() {
    let alice = Device::at(at(100, 3));
    let bob = Device::at(at(100, 3));
    let mut advertiser = alice.advertiser();
    let mut scanner = bob.scanner(Arc::new(WarningCounter::default()));
    let (peer, central) = (Uuid::new_v4(), Uuid::new_v4());

    scanner.handle_event(CentralEvent::Discovered { peer, rssi: -40 });
    scanner.handle_event(CentralEvent::Connected { peer });
    scanner.handle_event(CentralEvent::ServicesDiscovered { peer, result: Ok(()) });
    let written = scanner.radio().written_to(peer).unwrap();
    advertiser.handle_write(central, &written).unwrap();
    scanner.handle_event(CentralEvent::CharacteristicWritten { peer, result: Ok(()) });
    scanner.handle_event(CentralEvent::CharacteristicRead {
        peer,
        result: Ok(vec![7u8; 12]),
    });

    assert_eq!(bob.contacts.encounter_count(), 0);
    assert_eq!(scanner.peer_state(&peer), Some(PeerState::Disconnected));
}

#[test]
fn test_continuation_read_serves_same_payload() {
    let alice = Device::at(at(100, 3));
    let mut advertiser = alice.advertiser();
    let central = Uuid::new_v4();

    let full = advertiser.handle_read(central, 0).unwrap();
    let rest = advertiser.handle_read(central, 40).unwrap();
    let end = advertiser.handle_read(central, PAYLOAD_LENGTH).unwrap();

    assert_eq!(full.len(), PAYLOAD_LENGTH);
    assert_eq!(rest, full[40..].to_vec());
    assert!(end.is_empty());
}

#[test]
fn test_read_past_end_is_rejected() {
    let alice = Device::at(at(100, 3));
    let mut advertiser = alice.advertiser();

    let result = advertiser.handle_read(Uuid::new_v4(), PAYLOAD_LENGTH + 1);

    assert!(matches!(
        result,
        Err(ProximityError::InvalidOffset { offset, len }) if offset == PAYLOAD_LENGTH + 1 && len == PAYLOAD_LENGTH
    ));
}

// ============================================================
// Radio state
// ============================================================

#[test]
fn test_power_off_clears_peers_and_warns() {
    let bob = Device::at(at(100, 3));
    let warnings = Arc::new(WarningCounter::default());
    let mut scanner = bob.scanner(warnings.clone());

    scanner.handle_event(CentralEvent::StateChanged(RadioState::PoweredOn));
    scanner.handle_event(CentralEvent::Discovered {
        peer: Uuid::new_v4(),
        rssi: -40,
    });
    assert_eq!(scanner.tracked_peers(), 1);

    scanner.handle_event(CentralEvent::StateChanged(RadioState::PoweredOff));

    assert_eq!(scanner.tracked_peers(), 0);
    assert_eq!(warnings.count(), 1);
    assert_eq!(scanner.radio().commands()[0], CentralCommand::Scan);
}

#[test]
fn test_advertiser_power_cycle() {
    let alice = Device::at(at(100, 3));
    let mut advertiser = alice.advertiser();

    advertiser.handle_state(RadioState::PoweredOn).unwrap();
    let off = advertiser.handle_state(RadioState::PoweredOff);

    assert!(matches!(off, Err(ProximityError::RadioUnavailable)));
    assert_eq!(advertiser.radio().advertising_starts(), 1);
}

// ============================================================
// Service loop
// ============================================================

#[tokio::test]
async fn test_service_answers_peripheral_requests() {
    let alice = Device::at(at(100, 3));
    let bob = Device::at(at(100, 3));
    let service = ProximityService::new(
        alice.advertiser(),
        alice.scanner(Arc::new(WarningCounter::default())),
    );
    let (peripheral_tx, peripheral_rx) = mpsc::channel(8);
    let (central_tx, central_rx) = mpsc::channel(8);
    let handle = service.spawn(peripheral_rx, central_rx);

    let central = Uuid::new_v4();
    let bob_payload = bob.crypto.current_rolling_identifier_and_metadata().unwrap();

    let (respond, written) = oneshot::channel();
    peripheral_tx
        .send(PeripheralEvent::WriteRequest {
            central,
            data: bob_payload.to_bytes().to_vec(),
            respond,
        })
        .await
        .unwrap();
    written.await.unwrap().unwrap();

    let (respond, read) = oneshot::channel();
    peripheral_tx
        .send(PeripheralEvent::ReadRequest {
            central,
            offset: 0,
            respond,
        })
        .await
        .unwrap();
    assert_eq!(read.await.unwrap().unwrap().len(), PAYLOAD_LENGTH);

    drop(peripheral_tx);
    drop(central_tx);
    let service = handle.await.unwrap();

    assert_eq!(service.scanner().tracked_peers(), 0);
    assert!(alice
        .contacts
        .bluetooth_contact(&bob_payload.identifier, 100)
        .is_some());
}
