// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common Test Utilities
//!
//! Shared devices, fake radios and event recorders used across test
//! modules.

#![allow(dead_code)]

pub mod strategies;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use oextrace_core::crypto::{DAY_MILLIS, INTERVAL_MILLIS};
use oextrace_core::{
    Advertiser, CentralEvent, CentralRadio, ContactStore, CryptoEngine, EventHandler,
    InvitationKeyStore, ManualClock, MemoryStorage, MockBackend, PeripheralRadio, ProtocolLog,
    ProximityError, RadioWarning, Scanner, SpatialSyncIndex, TraceEvent, Tracer, TrackStore,
    UserStatusStore,
};

/// Epoch milliseconds inside `interval` of `day`.
pub fn at(day: i64, interval: i64) -> i64 {
    day * DAY_MILLIS + interval * INTERVAL_MILLIS + 1_000
}

// ============================================================
// Devices
// ============================================================

/// One device's stores over a shared in-memory storage.
pub struct Device {
    pub clock: Arc<ManualClock>,
    pub storage: Arc<MemoryStorage>,
    pub crypto: Arc<CryptoEngine>,
    pub contacts: Arc<ContactStore>,
    pub invitation_keys: Arc<InvitationKeyStore>,
    pub tracks: Arc<TrackStore>,
    pub spatial: Arc<SpatialSyncIndex>,
    pub status: Arc<UserStatusStore>,
    pub log: Arc<ProtocolLog>,
}

impl Device {
    pub fn at(now: i64) -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()), Arc::new(ManualClock::new(now)))
    }

    /// Reopens every store over `storage`, as after an app restart.
    pub fn with_storage(storage: Arc<MemoryStorage>, clock: Arc<ManualClock>) -> Self {
        Device {
            crypto: Arc::new(CryptoEngine::open(storage.clone(), clock.clone()).unwrap()),
            contacts: Arc::new(ContactStore::open(storage.clone()).unwrap()),
            invitation_keys: Arc::new(InvitationKeyStore::open(storage.clone()).unwrap()),
            tracks: Arc::new(TrackStore::open(storage.clone(), 30, 60_000).unwrap()),
            spatial: Arc::new(SpatialSyncIndex::open(storage.clone(), clock.clone(), 1.0).unwrap()),
            status: Arc::new(UserStatusStore::open(storage.clone()).unwrap()),
            log: Arc::new(ProtocolLog::open(storage.clone(), clock.clone()).unwrap()),
            clock,
            storage,
        }
    }

    pub fn advertiser(&self) -> Advertiser<FakePeripheral> {
        Advertiser::new(
            FakePeripheral::default(),
            self.crypto.clone(),
            self.contacts.clone(),
            self.log.clone(),
        )
    }

    pub fn scanner(&self, warning: Arc<dyn RadioWarning>) -> Scanner<FakeCentral> {
        Scanner::new(
            FakeCentral::default(),
            self.crypto.clone(),
            self.contacts.clone(),
            self.log.clone(),
            warning,
        )
    }
}

/// Builds a tracer over in-memory storage, a manual clock and a mock
/// backend, recording every event.
pub fn tracer(clock: Arc<ManualClock>, backend: Arc<MockBackend>) -> (Tracer, Arc<EventRecorder>) {
    let events = Arc::new(EventRecorder::default());
    let tracer = Tracer::builder()
        .clock(clock)
        .storage(Arc::new(MemoryStorage::new()))
        .backend(backend)
        .event_handler(events.clone())
        .build()
        .unwrap();
    (tracer, events)
}

// ============================================================
// Fake radios
// ============================================================

/// Central command issued by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum CentralCommand {
    Scan,
    Connect(Uuid),
    Discover(Uuid),
    Write(Uuid, Vec<u8>),
    Read(Uuid),
    Disconnect(Uuid),
}

/// Central radio recording every command.
#[derive(Clone, Default)]
pub struct FakeCentral {
    commands: Arc<Mutex<Vec<CentralCommand>>>,
}

impl FakeCentral {
    pub fn commands(&self) -> Vec<CentralCommand> {
        self.commands.lock().clone()
    }

    pub fn connects(&self) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|c| matches!(c, CentralCommand::Connect(_)))
            .count()
    }

    /// Last payload written to `peer`.
    pub fn written_to(&self, peer: Uuid) -> Option<Vec<u8>> {
        self.commands.lock().iter().rev().find_map(|c| match c {
            CentralCommand::Write(p, data) if *p == peer => Some(data.clone()),
            _ => None,
        })
    }
}

impl CentralRadio for FakeCentral {
    fn start_scan(&self, _service: Uuid) -> Result<(), ProximityError> {
        self.commands.lock().push(CentralCommand::Scan);
        Ok(())
    }

    fn connect(&self, peer: Uuid) -> Result<(), ProximityError> {
        self.commands.lock().push(CentralCommand::Connect(peer));
        Ok(())
    }

    fn discover(&self, peer: Uuid, _service: Uuid, _characteristic: Uuid) -> Result<(), ProximityError> {
        self.commands.lock().push(CentralCommand::Discover(peer));
        Ok(())
    }

    fn write(&self, peer: Uuid, _characteristic: Uuid, data: &[u8]) -> Result<(), ProximityError> {
        self.commands
            .lock()
            .push(CentralCommand::Write(peer, data.to_vec()));
        Ok(())
    }

    fn read(&self, peer: Uuid, _characteristic: Uuid) -> Result<(), ProximityError> {
        self.commands.lock().push(CentralCommand::Read(peer));
        Ok(())
    }

    fn disconnect(&self, peer: Uuid) {
        self.commands.lock().push(CentralCommand::Disconnect(peer));
    }
}

/// Peripheral radio counting advertising starts.
#[derive(Clone, Default)]
pub struct FakePeripheral {
    advertising: Arc<AtomicUsize>,
}

impl FakePeripheral {
    pub fn advertising_starts(&self) -> usize {
        self.advertising.load(Ordering::SeqCst)
    }
}

impl PeripheralRadio for FakePeripheral {
    fn add_service(&self, _service: Uuid, _characteristic: Uuid) -> Result<(), ProximityError> {
        Ok(())
    }

    fn start_advertising(&self, _service: Uuid) -> Result<(), ProximityError> {
        self.advertising.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Runs one full exchange between a scanner and an advertiser, relaying
/// each radio command to the other side as the platform stacks would.
///
/// `peer` is the advertiser as seen by the scanner, `central` the scanner
/// as seen by the advertiser.
pub fn run_exchange(
    scanner: &mut Scanner<FakeCentral>,
    advertiser: &mut Advertiser<FakePeripheral>,
    peer: Uuid,
    central: Uuid,
    rssi: i16,
) {
    scanner.handle_event(CentralEvent::Discovered { peer, rssi });
    scanner.handle_event(CentralEvent::Connected { peer });
    scanner.handle_event(CentralEvent::ServicesDiscovered { peer, result: Ok(()) });

    let Some(written) = scanner.radio().written_to(peer) else {
        return;
    };
    let result = advertiser
        .handle_write(central, &written)
        .map_err(|e| e.to_string());
    scanner.handle_event(CentralEvent::CharacteristicWritten { peer, result });

    let result = advertiser.handle_read(central, 0).map_err(|e| e.to_string());
    scanner.handle_event(CentralEvent::CharacteristicRead { peer, result });
    scanner.handle_event(CentralEvent::Disconnected { peer });
}

// ============================================================
// Observers
// ============================================================

/// Counts Bluetooth-off warnings.
#[derive(Default)]
pub struct WarningCounter {
    count: AtomicUsize,
}

impl WarningCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl RadioWarning for WarningCounter {
    fn bluetooth_off(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records tracer events.
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<TraceEvent>>,
}

impl EventRecorder {
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }
}

impl EventHandler for EventRecorder {
    fn on_event(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }
}
