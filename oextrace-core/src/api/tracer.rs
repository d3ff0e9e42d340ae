// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tracer
//!
//! Wires the stores and protocols together over one storage backend and
//! exposes the operations the platform layer calls.

use std::sync::Arc;

use url::Url;

use super::config::TraceConfig;
use super::error::{TraceError, TraceResult};
use super::events::{EventDispatcher, EventHandler, TraceEvent};
use crate::backend::{Backend, BackendError, HttpBackend, RelayNotification};
use crate::clock::{Clock, SystemClock};
use crate::contacts::{ContactStore, ContactSummary, DiagnosisKey, MatchOutcome, QrContact};
use crate::crypto::{CryptoEngine, SymmetricKey};
use crate::direct::{ContactInvitation, DirectContactError, DirectContactProtocol, InvitationKeyStore};
use crate::logs::ProtocolLog;
use crate::proximity::{
    Advertiser, CentralRadio, PeripheralRadio, ProximityService, RadioWarning, Scanner,
};
use crate::retention::{PurgeReport, RetentionManager};
use crate::spatial::SpatialSyncIndex;
use crate::status::{UserStatus, UserStatusStore};
use crate::storage::{SqliteStorage, StoragePort};
use crate::sync::{SyncDriver, SyncReport};
use crate::tracks::{Polyline, RawTrackPoint, TrackStore};

/// Main entry point of the library.
pub struct Tracer {
    config: TraceConfig,
    link_base: Url,
    crypto: Arc<CryptoEngine>,
    contacts: Arc<ContactStore>,
    tracks: Arc<TrackStore>,
    spatial: Arc<SpatialSyncIndex>,
    log: Arc<ProtocolLog>,
    status: Arc<UserStatusStore>,
    direct: DirectContactProtocol,
    sync: SyncDriver,
    retention: RetentionManager,
    events: Arc<EventDispatcher>,
}

impl Tracer {
    pub fn builder() -> TracerBuilder {
        TracerBuilder::new()
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn crypto(&self) -> &Arc<CryptoEngine> {
        &self.crypto
    }

    pub fn contact_store(&self) -> &Arc<ContactStore> {
        &self.contacts
    }

    pub fn track_store(&self) -> &Arc<TrackStore> {
        &self.tracks
    }

    pub fn spatial_index(&self) -> &Arc<SpatialSyncIndex> {
        &self.spatial
    }

    pub fn protocol_log(&self) -> &Arc<ProtocolLog> {
        &self.log
    }

    pub fn events(&self) -> &Arc<EventDispatcher> {
        &self.events
    }

    // === Radio exchange ===

    /// Builds the dual-role radio service over the platform radios.
    /// Bluetooth-off warnings are routed to the event handlers.
    pub fn proximity_service<P, C>(&self, peripheral: P, central: C) -> ProximityService<P, C>
    where
        P: PeripheralRadio + 'static,
        C: CentralRadio + 'static,
    {
        let warning: Arc<dyn RadioWarning> = self.events.clone();
        ProximityService::new(
            Advertiser::new(
                peripheral,
                self.crypto.clone(),
                self.contacts.clone(),
                self.log.clone(),
            ),
            Scanner::new(
                central,
                self.crypto.clone(),
                self.contacts.clone(),
                self.log.clone(),
                warning,
            ),
        )
    }

    // === Direct contacts ===

    pub fn create_invitation(&self, routing_token: &str, platform: &str) -> TraceResult<ContactInvitation> {
        Ok(self.direct.create_invitation(routing_token, platform)?)
    }

    pub fn invitation_link(&self, invitation: &ContactInvitation) -> Url {
        invitation.to_link(&self.link_base)
    }

    pub fn invitation_qr(&self, invitation: &ContactInvitation) -> TraceResult<String> {
        Ok(invitation.to_qr_image_string(&self.link_base)?)
    }

    /// Answers a scanned invitation. Expiry and backend status failures
    /// are also reported as events.
    pub async fn make_contact(&self, invitation: &ContactInvitation) -> TraceResult<QrContact> {
        match self.direct.make_contact(invitation).await {
            Ok(contact) => {
                self.events
                    .dispatch(TraceEvent::ContactRecorded { day: contact.day });
                Ok(contact)
            }
            Err(e) => {
                match &e {
                    DirectContactError::ContactExpired { .. } => {
                        self.events.dispatch(TraceEvent::ContactExpired)
                    }
                    DirectContactError::Backend(BackendError::Status(code)) => self
                        .events
                        .dispatch(TraceEvent::BackendStatus { code: *code }),
                    _ => {}
                }
                Err(e.into())
            }
        }
    }

    /// Parses a contact link and answers it.
    pub async fn make_contact_from_link(&self, link: &str) -> TraceResult<QrContact> {
        let invitation = ContactInvitation::from_link(link)?;
        self.make_contact(&invitation).await
    }

    pub fn handle_relay_notification(
        &self,
        notification: &RelayNotification,
    ) -> TraceResult<Option<QrContact>> {
        let contact = self.direct.handle_relay_notification(notification)?;
        if let Some(contact) = &contact {
            self.events
                .dispatch(TraceEvent::ContactRecorded { day: contact.day });
        }
        Ok(contact)
    }

    // === Sync and matching ===

    /// Feeds a location sample; runs a sync cycle when one is due.
    pub async fn on_location(&self, raw: RawTrackPoint) -> TraceResult<Option<SyncReport>> {
        let report = self.sync.on_location(raw).await?;
        if let Some(report) = &report {
            self.report_sync(report);
        }
        Ok(report)
    }

    /// Runs a sync cycle at the last known location regardless of the
    /// throttle.
    pub async fn sync_now(&self) -> TraceResult<SyncReport> {
        let coordinate = self
            .crypto
            .current_location()
            .ok_or_else(|| TraceError::Configuration("no location known yet".into()))?;
        let report = self.sync.sync_now(coordinate).await?;
        self.report_sync(&report);
        Ok(report)
    }

    fn report_sync(&self, report: &SyncReport) {
        if let Some(outcome) = &report.outcome {
            self.report_exposure(outcome);
        }
        for (step, error) in &report.errors {
            if let BackendError::Status(code) = error {
                self.events.dispatch(TraceEvent::BackendStatus { code: *code });
            } else {
                self.events.dispatch(TraceEvent::Error {
                    message: format!("{step}: {error}"),
                });
            }
        }
        self.events.dispatch(TraceEvent::SyncCompleted {
            keys: report.keys_fetched,
            tracks: report.tracks_fetched,
        });
    }

    fn report_exposure(&self, outcome: &MatchOutcome) {
        if outcome.newly_exposed > 0 {
            self.events.dispatch(TraceEvent::ExposureDetected {
                newly_exposed: outcome.newly_exposed,
                last_exposed_coordinate: outcome.last_exposed_coordinate,
            });
        }
    }

    /// Matches diagnosis keys obtained out of band.
    pub fn match_keys(&self, keys: &[DiagnosisKey]) -> TraceResult<MatchOutcome> {
        let outcome = self.contacts.match_against(keys)?;
        self.report_exposure(&outcome);
        Ok(outcome)
    }

    pub fn contacts(&self) -> Vec<ContactSummary> {
        self.contacts.contacts()
    }

    pub fn is_exposed(&self) -> bool {
        self.contacts.is_exposed()
    }

    pub fn local_polylines(&self) -> Vec<Polyline> {
        self.tracks.local_polylines()
    }

    pub fn remote_polylines(&self) -> Vec<Polyline> {
        self.tracks.remote_polylines()
    }

    // === User status ===

    pub fn user_status(&self) -> UserStatus {
        self.status.status()
    }

    /// Sets the self-reported status. `Exposed` starts disclosure on the
    /// next sync cycle.
    pub fn set_user_status(&self, status: UserStatus) -> TraceResult<()> {
        Ok(self.status.set_status(status)?)
    }

    // === Retention ===

    /// Purges everything past the retention window. Meant to run on every
    /// foreground activation.
    pub fn purge_expired(&self) -> TraceResult<PurgeReport> {
        let now = self.crypto.clock().now_millis();
        Ok(self.retention.purge(now)?)
    }
}

/// Builder for creating tracer instances.
pub struct TracerBuilder {
    config: TraceConfig,
    clock: Option<Arc<dyn Clock>>,
    storage: Option<Arc<dyn StoragePort>>,
    backend: Option<Arc<dyn Backend>>,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl TracerBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        TracerBuilder {
            config: TraceConfig::default(),
            clock: None,
            storage: None,
            backend: None,
            handlers: Vec::new(),
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: TraceConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the storage path.
    pub fn storage_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config.storage_path = path.into();
        self
    }

    /// Sets the key the database snapshots are encrypted with.
    ///
    /// The same key must be supplied on every launch, typically from the
    /// platform keychain.
    pub fn storage_key(mut self, key: SymmetricKey) -> Self {
        self.config.storage_key = Some(key);
        self
    }

    /// Sets the backend URL.
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.config.backend_url = url.into();
        self
    }

    /// Replaces the wall clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Uses `storage` instead of the SQLite database at the storage path.
    pub fn storage(mut self, storage: Arc<dyn StoragePort>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Uses `backend` instead of the HTTP backend at the backend URL.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Adds an event handler.
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Builds the tracer instance.
    pub fn build(self) -> TraceResult<Tracer> {
        let config = self.config;
        let link_base = Url::parse(&config.link_base_url)
            .map_err(|e| TraceError::Configuration(format!("invalid link base URL: {e}")))?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let storage = match self.storage {
            Some(storage) => storage,
            None => {
                // The key must be the same on every launch.
                let key = config.storage_key.clone().ok_or_else(|| {
                    TraceError::Configuration(
                        "a storage key is required to open the database".into(),
                    )
                })?;
                if let Some(parent) = config.storage_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)
                            .map_err(|e| TraceError::Configuration(e.to_string()))?;
                    }
                }
                Arc::new(SqliteStorage::open(&config.storage_path, key)?) as Arc<dyn StoragePort>
            }
        };

        let backend = match self.backend {
            Some(backend) => backend,
            None => Arc::new(HttpBackend::new(
                &config.backend_url,
                config.timeout,
                config.proxy_url.as_deref(),
            )?) as Arc<dyn Backend>,
        };

        let mut dispatcher = EventDispatcher::new();
        for handler in self.handlers {
            dispatcher.add_handler(handler);
        }
        let events = Arc::new(dispatcher);

        let crypto = Arc::new(CryptoEngine::open(storage.clone(), clock.clone())?);
        let contacts = Arc::new(ContactStore::open(storage.clone())?);
        let invitation_keys = Arc::new(InvitationKeyStore::open(storage.clone())?);
        let tracks = Arc::new(TrackStore::open(
            storage.clone(),
            config.accuracy_threshold,
            config.tracking_interval_ms(),
        )?);
        let spatial = Arc::new(SpatialSyncIndex::open(
            storage.clone(),
            clock.clone(),
            config.shard_cell_degrees,
        )?);
        let log = Arc::new(ProtocolLog::open(storage.clone(), clock)?);
        let status = Arc::new(UserStatusStore::open(storage)?);

        let direct = DirectContactProtocol::new(
            crypto.clone(),
            contacts.clone(),
            invitation_keys.clone(),
            backend.clone(),
            log.clone(),
        );
        let sync = SyncDriver::new(
            crypto.clone(),
            contacts.clone(),
            tracks.clone(),
            spatial.clone(),
            status.clone(),
            backend,
            config.sync_interval_ms(),
        );
        let retention = RetentionManager::new(
            config.retention_days,
            crypto.clone(),
            contacts.clone(),
            invitation_keys,
            tracks.clone(),
            spatial.clone(),
            log.clone(),
            status.clone(),
        );

        tracing::info!(retention_days = config.retention_days, "tracer ready");

        Ok(Tracer {
            config,
            link_base,
            crypto,
            contacts,
            tracks,
            spatial,
            log,
            status,
            direct,
            sync,
            retention,
            events,
        })
    }
}

impl Default for TracerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
