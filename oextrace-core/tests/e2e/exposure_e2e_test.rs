// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Radio Exchange and Exposure E2E Tests

use std::sync::Arc;

use uuid::Uuid;

use super::common::{at, run_exchange, Device, WarningCounter};
use oextrace_core::{derive_all_identifiers, Coordinate, DiagnosisKey};

/// Device A advertises during interval 3 of day 100, device B scans it;
/// each ends up with an encounter of the other's identifier.
#[test]
fn test_exchange_then_disclosure_exposes_contact() {
    // Step 1: Both devices in interval 3 of day 100
    let a = Device::at(at(100, 3));
    let b = Device::at(at(100, 3));
    a.crypto.update_location(Coordinate::new(46.5197, 6.6323));

    let mut advertiser = a.advertiser();
    let mut scanner = b.scanner(Arc::new(WarningCounter::default()));

    // Step 2: B discovers A and runs the exchange
    run_exchange(&mut scanner, &mut advertiser, Uuid::new_v4(), Uuid::new_v4(), -48);

    let x = a.crypto.current_rolling_identifier_and_metadata().unwrap().identifier;
    let y = b.crypto.current_rolling_identifier_and_metadata().unwrap().identifier;
    let a_secret = a.crypto.secret_for_day(100).unwrap();
    assert_eq!(derive_all_identifiers(&a_secret, 100)[3], x);

    let on_b = b.contacts.bluetooth_contact(&x, 100).unwrap();
    let on_a = a.contacts.bluetooth_contact(&y, 100).unwrap();
    assert_eq!(on_b.day, 100);
    assert_eq!(on_a.day, 100);
    assert!(!on_b.exposed);

    // Step 3: A is diagnosed; B downloads A's key for day 100
    let outcome = b
        .contacts
        .match_against(&[DiagnosisKey::new(a_secret, 100, 5_000)])
        .unwrap();

    // Step 4: B's contact flips to exposed with A's metadata revealed
    assert!(outcome.exposed);
    assert_eq!(outcome.newly_exposed, 1);

    let on_b = b.contacts.bluetooth_contact(&x, 100).unwrap();
    assert!(on_b.exposed);
    let revealed = on_b.revealed.unwrap();
    assert_eq!(revealed.timestamp, at(100, 3));
    let coordinate = revealed.coordinate.unwrap();
    assert!((coordinate.lat - 46.5197).abs() < 1e-6);

    // A's own view is unaffected by its own key
    assert!(!a.contacts.is_exposed());
}

/// Exchanges across several intervals all match one day key.
#[test]
fn test_day_key_matches_every_interval() {
    let a = Device::at(at(100, 0));
    let b = Device::at(at(100, 0));
    let mut advertiser = a.advertiser();
    let mut scanner = b.scanner(Arc::new(WarningCounter::default()));
    let peer = Uuid::new_v4();

    for interval in [0, 7, 143] {
        a.clock.set(at(100, interval));
        b.clock.set(at(100, interval));
        run_exchange(&mut scanner, &mut advertiser, peer, Uuid::new_v4(), -50);
    }

    assert_eq!(b.contacts.bluetooth_contacts().len(), 3);

    let key = DiagnosisKey::new(a.crypto.secret_for_day(100).unwrap(), 100, 1);
    let outcome = b.contacts.match_against(&[key]).unwrap();

    assert_eq!(outcome.newly_exposed, 3);
}
