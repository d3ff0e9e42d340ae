// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! OExTrace Core Library
//!
//! Decentralized, privacy-preserving proximity exposure detection.
//! Devices exchange short-lived rolling identifiers over Bluetooth or a
//! scanned contact code; diagnosed users later publish the day secrets that
//! produced their identifiers, and every other device re-derives and matches
//! them locally.

pub mod api;
pub mod backend;
pub mod clock;
pub mod contacts;
pub mod crypto;
pub mod direct;
pub mod logs;
pub mod proximity;
pub mod retention;
pub mod spatial;
pub mod status;
pub mod storage;
pub mod sync;
pub mod tracks;

pub use api::{
    CallbackHandler, EventDispatcher, EventHandler, TraceConfig, TraceError, TraceEvent,
    TraceResult, Tracer, TracerBuilder,
};
pub use backend::{Backend, BackendError, HttpBackend, MockBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use contacts::{
    BluetoothContact, ContactStore, ContactSummary, DiagnosisKey, Encounter, MatchOutcome,
    QrContact,
};
pub use crypto::{
    day_number, decrypt_metadata, derive_all_identifiers, ContactMetadata, Coordinate,
    CryptoEngine, DaySecret, EncryptionError, ExchangePayload, MetadataCiphertext,
    RollingIdentifier, SymmetricKey, IDENTIFIER_LENGTH,
};
pub use direct::{
    ContactInvitation, DirectContactError, DirectContactProtocol, InvitationKeyStore,
    RelayNotification,
};
pub use logs::{ProtocolLog, ProtocolLogEntry};
pub use proximity::{
    Advertiser, CentralEvent, CentralRadio, PeerState, PeripheralEvent, PeripheralRadio,
    ProximityError, ProximityService, RadioState, RadioWarning, Scanner,
};
pub use retention::{PurgeReport, RetentionManager};
pub use spatial::{LocationShard, ShardBounds, SpatialSyncIndex, SyncKind};
pub use status::{UserStatus, UserStatusStore};
pub use storage::{Collection, MemoryStorage, SqliteStorage, StorageError, StoragePort};
pub use sync::{SyncDriver, SyncReport};
pub use tracks::{Polyline, RawTrackPoint, Track, TrackPoint, TrackStore};
