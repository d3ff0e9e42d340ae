// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Request and response bodies of the backend contracts.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::contacts::DiagnosisKey;
use crate::spatial::ShardBounds;
use crate::tracks::Track;

/// `POST /contact/makeContact`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeContactRequest {
    /// Routing token of the invitation.
    pub token: String,
    /// Platform tag of the invitation.
    pub platform: String,
    /// Sealed exchange payload, base64.
    pub secret: String,
    /// Invitation timestamp.
    pub tst: i64,
}

/// Query of `GET /storage/keys` and `GET /storage/tracks`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageQuery {
    pub last_update_timestamp: i64,
    pub bounds: ShardBounds,
}

impl StorageQuery {
    pub fn new(last_update_timestamp: i64, bounds: ShardBounds) -> Self {
        StorageQuery {
            last_update_timestamp,
            bounds,
        }
    }

    /// Query string pairs.
    pub fn pairs(&self) -> [(&'static str, String); 5] {
        [
            ("lastUpdateTimestamp", self.last_update_timestamp.to_string()),
            ("minLat", self.bounds.min_lat.to_string()),
            ("maxLat", self.bounds.max_lat.to_string()),
            ("minLng", self.bounds.min_lng.to_string()),
            ("maxLng", self.bounds.max_lng.to_string()),
        ]
    }
}

/// Entries that fail to decode are skipped, so one bad record cannot hold
/// back the cursor of its shard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeysResponse {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub keys: Vec<DiagnosisKey>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracksResponse {
    #[serde(default, deserialize_with = "skip_malformed")]
    pub tracks: Vec<Track>,
}

fn skip_malformed<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping malformed backend entry");
                None
            }
        })
        .collect())
}

/// `POST /storage/keys`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadKeysRequest {
    pub keys: Vec<DiagnosisKey>,
    /// Cell the disclosing device was in.
    pub border: ShardBounds,
}

/// `POST /storage/tracks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadTracksRequest {
    pub tracks: Vec<Track>,
}

/// Push notification forwarded by the relay to the inviting device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayNotification {
    /// Sealed exchange payload, base64.
    pub secret: String,
    /// Invitation timestamp, used to look up the ephemeral key.
    pub tst: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DaySecret;

    #[test]
    fn test_malformed_key_is_skipped() {
        let good = serde_json::to_value(DiagnosisKey::new(DaySecret::generate(), 99, 700)).unwrap();
        let body = serde_json::json!({
            "keys": [
                { "value": "not base64!", "day": 99, "tst": 900 },
                good,
            ]
        });

        let response: KeysResponse = serde_json::from_value(body).unwrap();

        assert_eq!(response.keys.len(), 1);
        assert_eq!(response.keys[0].tst, 700);
    }

    #[test]
    fn test_missing_tracks_field_is_empty() {
        let response: TracksResponse = serde_json::from_str("{}").unwrap();
        assert!(response.tracks.is_empty());
    }
}
