// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Backend Client Module
//!
//! The remote contracts consumed by the core: the direct-contact relay and
//! the diagnosis key / track storage. [`HttpBackend`] talks to a real
//! server (feature `network`); [`MockBackend`] is an in-process stand-in
//! for tests.

mod http;
mod mock;
mod types;

pub use http::HttpBackend;
pub use mock::MockBackend;
pub use types::{
    KeysResponse, MakeContactRequest, RelayNotification, StorageQuery, TracksResponse,
    UploadKeysRequest, UploadTracksRequest,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::contacts::DiagnosisKey;
use crate::tracks::Track;

/// Backend request failure. Callers leave their state untouched and retry
/// on the next cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Non-success HTTP status.
    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("decode error: {0}")]
    Decode(String),

    /// Built without the `network` feature.
    #[error("network feature disabled")]
    FeatureDisabled,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Submits a direct-contact payload to the relay.
    async fn make_contact(&self, request: &MakeContactRequest) -> Result<(), BackendError>;

    /// Diagnosis keys published after the query cursor inside its bounds.
    async fn fetch_keys(&self, query: &StorageQuery) -> Result<Vec<DiagnosisKey>, BackendError>;

    /// Tracks published after the query cursor inside its bounds.
    async fn fetch_tracks(&self, query: &StorageQuery) -> Result<Vec<Track>, BackendError>;

    /// Publishes the device's own day secrets.
    async fn upload_keys(&self, request: &UploadKeysRequest) -> Result<(), BackendError>;

    /// Publishes the device's own track.
    async fn upload_tracks(&self, request: &UploadTracksRequest) -> Result<(), BackendError>;
}
