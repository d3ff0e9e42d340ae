// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTP backend client.
//!
//! - Configurable timeout
//! - Proxy support (for Tor)

use std::time::Duration;

#[cfg(feature = "network")]
use async_trait::async_trait;
#[cfg(feature = "network")]
use reqwest::Client;

#[cfg(feature = "network")]
use super::{
    Backend, KeysResponse, MakeContactRequest, StorageQuery, TracksResponse, UploadKeysRequest,
    UploadTracksRequest,
};
use super::BackendError;
#[cfg(feature = "network")]
use crate::contacts::DiagnosisKey;
#[cfg(feature = "network")]
use crate::tracks::Track;

/// Backend reached over HTTPS.
#[cfg(feature = "network")]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

#[cfg(feature = "network")]
impl HttpBackend {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        proxy_url: Option<&str>,
    ) -> Result<Self, BackendError> {
        let mut builder = Client::builder().timeout(timeout).user_agent(format!(
            "OExTrace/{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("0.1.0")
        ));

        if let Some(proxy_url) = proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(HttpBackend {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: serde::Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), BackendError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &StorageQuery,
    ) -> Result<T, BackendError> {
        let response = self
            .client
            .get(self.url(path))
            .query(&query.pairs())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[cfg(feature = "network")]
#[async_trait]
impl Backend for HttpBackend {
    async fn make_contact(&self, request: &MakeContactRequest) -> Result<(), BackendError> {
        tracing::debug!(tst = request.tst, "submitting direct contact");
        self.post("/contact/makeContact", request).await
    }

    async fn fetch_keys(&self, query: &StorageQuery) -> Result<Vec<DiagnosisKey>, BackendError> {
        let response: KeysResponse = self.get("/storage/keys", query).await?;
        Ok(response.keys)
    }

    async fn fetch_tracks(&self, query: &StorageQuery) -> Result<Vec<Track>, BackendError> {
        let response: TracksResponse = self.get("/storage/tracks", query).await?;
        Ok(response.tracks)
    }

    async fn upload_keys(&self, request: &UploadKeysRequest) -> Result<(), BackendError> {
        self.post("/storage/keys", request).await
    }

    async fn upload_tracks(&self, request: &UploadTracksRequest) -> Result<(), BackendError> {
        self.post("/storage/tracks", request).await
    }
}

#[cfg(feature = "network")]
impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            BackendError::Status(status.as_u16())
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

/// Stub backend when the network feature is not enabled
#[cfg(not(feature = "network"))]
pub struct HttpBackend {
    _private: (),
}

#[cfg(not(feature = "network"))]
impl HttpBackend {
    /// Always fails without the network feature.
    pub fn new(
        _base_url: &str,
        _timeout: Duration,
        _proxy_url: Option<&str>,
    ) -> Result<Self, BackendError> {
        Err(BackendError::FeatureDisabled)
    }
}

#[cfg(all(test, feature = "network"))]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let backend =
            HttpBackend::new("https://api.example.org/", Duration::from_secs(5), None).unwrap();
        assert_eq!(backend.url("/storage/keys"), "https://api.example.org/storage/keys");
    }
}
