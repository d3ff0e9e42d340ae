// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration for the tracer

use std::path::PathBuf;
use std::time::Duration;

use crate::crypto::SymmetricKey;

/// Tracer configuration.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// SQLite database file
    pub storage_path: PathBuf,

    /// Key encrypting every persisted snapshot; required unless a storage
    /// port is injected
    pub storage_key: Option<SymmetricKey>,

    /// Backend base URL (relay and key/track storage)
    pub backend_url: String,

    /// Base URL of contact invitation links
    pub link_base_url: String,

    /// Days of history kept by the retention purge
    pub retention_days: i64,

    /// Minimum interval between two sync cycles
    pub sync_interval: Duration,

    /// Nominal location sampling interval
    pub tracking_interval: Duration,

    /// Location samples less accurate than this (meters) are discarded
    pub accuracy_threshold: i32,

    /// Grid cell size of sync shards, in degrees
    pub shard_cell_degrees: f64,

    /// HTTP timeout for backend calls
    pub timeout: Duration,

    /// Proxy URL (for Tor support)
    pub proxy_url: Option<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("oextrace.db"),
            storage_key: None,
            backend_url: "https://api.oextrace.org".to_string(),
            link_base_url: "https://oextrace.org/app".to_string(),
            retention_days: 14,
            sync_interval: Duration::from_secs(60),
            tracking_interval: Duration::from_secs(60),
            accuracy_threshold: 30,
            shard_cell_degrees: 1.0,
            timeout: Duration::from_secs(30),
            proxy_url: None,
        }
    }
}

impl TraceConfig {
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    pub fn with_storage_key(mut self, key: SymmetricKey) -> Self {
        self.storage_key = Some(key);
        self
    }

    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    pub fn with_link_base_url(mut self, url: impl Into<String>) -> Self {
        self.link_base_url = url.into();
        self
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    pub fn with_tracking_interval(mut self, interval: Duration) -> Self {
        self.tracking_interval = interval;
        self
    }

    pub fn with_accuracy_threshold(mut self, meters: i32) -> Self {
        self.accuracy_threshold = meters;
        self
    }

    pub fn with_shard_cell_degrees(mut self, degrees: f64) -> Self {
        self.shard_cell_degrees = degrees;
        self
    }

    /// Configure with Tor proxy
    ///
    /// Uses the default Tor SOCKS5 proxy at 127.0.0.1:9050 and
    /// increases the timeout to 60 seconds to account for Tor latency.
    pub fn with_tor(mut self) -> Self {
        self.proxy_url = Some("socks5://127.0.0.1:9050".to_string());
        self.timeout = Duration::from_secs(60);
        self
    }

    /// Configure with custom proxy
    pub fn with_proxy(mut self, proxy_url: String) -> Self {
        self.proxy_url = Some(proxy_url);
        self
    }

    pub(crate) fn sync_interval_ms(&self) -> i64 {
        self.sync_interval.as_millis() as i64
    }

    pub(crate) fn tracking_interval_ms(&self) -> i64 {
        self.tracking_interval.as_millis() as i64
    }
}
