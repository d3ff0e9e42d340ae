// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Direct Contact E2E Tests

use std::sync::Arc;

use super::common::{at, tracer};
use oextrace_core::{
    DiagnosisKey, DirectContactError, ManualClock, MockBackend, TraceError, TraceEvent,
};

/// C invites at T; D answers after 30 s, E after 90 s.
#[tokio::test]
async fn test_invitation_accepted_within_a_minute_only() {
    let t = at(100, 3);
    let backend = Arc::new(MockBackend::new());
    let e_backend = Arc::new(MockBackend::new());

    let (c, _) = tracer(Arc::new(ManualClock::new(t)), backend.clone());
    let (d, _) = tracer(Arc::new(ManualClock::new(t + 30_000)), backend.clone());
    let (e, e_events) = tracer(Arc::new(ManualClock::new(t + 90_000)), e_backend.clone());

    // Step 1: C shows its invitation
    let invitation = c.create_invitation("c-token", "ios").unwrap();
    let link = c.invitation_link(&invitation);

    // Step 2: D scans and answers in time
    let contact = d.make_contact_from_link(link.as_str()).await.unwrap();
    assert_eq!(contact.identifier, invitation.identifier);

    // Step 3: E scans too late and nothing leaves the device
    let late = e.make_contact_from_link(link.as_str()).await;
    assert!(matches!(
        late,
        Err(TraceError::DirectContact(DirectContactError::ContactExpired { .. }))
    ));
    assert_eq!(e_backend.call_count("make_contact"), 0);
    assert_eq!(e_events.events(), vec![TraceEvent::ContactExpired]);

    // Step 4: the relay notifies C, which stores D as a contact
    for notification in backend.relay_notifications() {
        c.handle_relay_notification(&notification).unwrap();
    }
    assert_eq!(c.contacts().len(), 1);
    assert!(e.contacts().is_empty());
}

/// A direct contact is matched like a radio contact once its owner
/// discloses.
#[tokio::test]
async fn test_direct_contacts_match_disclosed_keys() {
    let t = at(100, 3);
    let backend = Arc::new(MockBackend::new());
    let (c, c_events) = tracer(Arc::new(ManualClock::new(t)), backend.clone());
    let (d, d_events) = tracer(Arc::new(ManualClock::new(t + 5_000)), backend.clone());

    let invitation = c.create_invitation("c-token", "android").unwrap();
    d.make_contact(&invitation).await.unwrap();
    let notification = backend.relay_notifications().remove(0);
    c.handle_relay_notification(&notification).unwrap();

    // D is diagnosed: C's copy carries D's metadata, so it is revealed.
    let d_key = DiagnosisKey::new(d.crypto().secret_for_day(100).unwrap(), 100, 1);
    let outcome = c.match_keys(&[d_key]).unwrap();
    assert_eq!(outcome.newly_exposed, 1);
    assert!(c.contacts()[0].revealed().is_some());
    assert!(c_events
        .events()
        .iter()
        .any(|e| matches!(e, TraceEvent::ExposureDetected { .. })));

    // C is diagnosed: D only knows C's identifier, no metadata to reveal.
    let c_key = DiagnosisKey::new(c.crypto().secret_for_day(100).unwrap(), 100, 2);
    let outcome = d.match_keys(&[c_key]).unwrap();
    assert_eq!(outcome.newly_exposed, 1);
    assert!(d.is_exposed());
    assert!(d.contacts()[0].revealed().is_none());
    assert!(d_events
        .events()
        .contains(&TraceEvent::ExposureDetected {
            newly_exposed: 1,
            last_exposed_coordinate: None,
        }));
}
