// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock backend for testing.
//!
//! Behaves like a minimal server: published keys and tracks are returned to
//! queries whose cursor they are newer than, and direct-contact submissions
//! are queued as relay notifications.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    Backend, BackendError, MakeContactRequest, RelayNotification, StorageQuery,
    UploadKeysRequest, UploadTracksRequest,
};
use crate::contacts::DiagnosisKey;
use crate::tracks::Track;

#[derive(Default)]
struct MockState {
    keys: Vec<DiagnosisKey>,
    tracks: Vec<Track>,
    contact_requests: Vec<MakeContactRequest>,
    key_uploads: Vec<UploadKeysRequest>,
    track_uploads: Vec<UploadTracksRequest>,
    failure: Option<BackendError>,
    calls: HashMap<&'static str, usize>,
}

/// In-memory backend.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with `error`; `None` restores
    /// normal operation.
    pub fn set_failure(&self, error: Option<BackendError>) {
        self.state.lock().failure = error;
    }

    /// Publishes diagnosis keys as if another device had disclosed them.
    pub fn publish_keys(&self, keys: impl IntoIterator<Item = DiagnosisKey>) {
        self.state.lock().keys.extend(keys);
    }

    pub fn publish_tracks(&self, tracks: impl IntoIterator<Item = Track>) {
        self.state.lock().tracks.extend(tracks);
    }

    pub fn contact_requests(&self) -> Vec<MakeContactRequest> {
        self.state.lock().contact_requests.clone()
    }

    /// Relay notifications for every accepted direct-contact submission.
    pub fn relay_notifications(&self) -> Vec<RelayNotification> {
        self.state
            .lock()
            .contact_requests
            .iter()
            .map(|r| RelayNotification {
                secret: r.secret.clone(),
                tst: r.tst,
            })
            .collect()
    }

    pub fn key_uploads(&self) -> Vec<UploadKeysRequest> {
        self.state.lock().key_uploads.clone()
    }

    pub fn track_uploads(&self) -> Vec<UploadTracksRequest> {
        self.state.lock().track_uploads.clone()
    }

    /// Number of calls made to `endpoint` (the trait method name),
    /// including failed ones.
    pub fn call_count(&self, endpoint: &str) -> usize {
        self.state.lock().calls.get(endpoint).copied().unwrap_or(0)
    }

    fn enter(&self, endpoint: &'static str) -> Result<parking_lot::MutexGuard<'_, MockState>, BackendError> {
        let mut state = self.state.lock();
        *state.calls.entry(endpoint).or_insert(0) += 1;
        if let Some(e) = state.failure.clone() {
            return Err(e);
        }
        Ok(state)
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn make_contact(&self, request: &MakeContactRequest) -> Result<(), BackendError> {
        self.enter("make_contact")?
            .contact_requests
            .push(request.clone());
        Ok(())
    }

    async fn fetch_keys(&self, query: &StorageQuery) -> Result<Vec<DiagnosisKey>, BackendError> {
        let state = self.enter("fetch_keys")?;
        Ok(state
            .keys
            .iter()
            .filter(|k| k.tst > query.last_update_timestamp)
            .cloned()
            .collect())
    }

    async fn fetch_tracks(&self, query: &StorageQuery) -> Result<Vec<Track>, BackendError> {
        let state = self.enter("fetch_tracks")?;
        Ok(state
            .tracks
            .iter()
            .filter_map(|t| {
                let points: Vec<_> = t
                    .points
                    .iter()
                    .filter(|p| p.tst > query.last_update_timestamp)
                    .filter(|p| query.bounds.contains(&p.coordinate()))
                    .copied()
                    .collect();
                (!points.is_empty()).then(|| Track::new(t.key.clone(), points))
            })
            .collect())
    }

    async fn upload_keys(&self, request: &UploadKeysRequest) -> Result<(), BackendError> {
        let mut state = self.enter("upload_keys")?;
        state.keys.extend(request.keys.iter().cloned());
        state.key_uploads.push(request.clone());
        Ok(())
    }

    async fn upload_tracks(&self, request: &UploadTracksRequest) -> Result<(), BackendError> {
        let mut state = self.enter("upload_tracks")?;
        state.tracks.extend(request.tracks.iter().cloned());
        state.track_uploads.push(request.clone());
        Ok(())
    }
}
