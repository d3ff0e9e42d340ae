// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Contact invitation and its link encoding.
//!
//! Link format: `<base>/contact?r=<identifier>&k=<key>&d=<token>&p=<platform>&t=<tst>`
//! where identifier and key are standard base64.

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use super::DirectContactError;
use crate::crypto::{RollingIdentifier, SymmetricKey};
use crate::storage::{Collection, Snapshot, StorageError, StoragePort};

/// Final path segment of a contact link.
pub const CONTACT_PATH: &str = "contact";

/// Out-of-band invitation shown by the inviting device.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactInvitation {
    /// Relay routing token of the inviting device.
    pub routing_token: String,
    /// Single-use key the peer seals its payload with.
    pub ephemeral_key: SymmetricKey,
    /// Identifier the inviting device advertised when minting the invitation.
    pub identifier: RollingIdentifier,
    /// Platform tag the relay uses to pick a push transport.
    pub platform: String,
    pub tst: i64,
}

impl ContactInvitation {
    /// Encodes the invitation as a link under `base`.
    pub fn to_link(&self, base: &Url) -> Url {
        let mut url = base.clone();
        let path = format!("{}/{}", base.path().trim_end_matches('/'), CONTACT_PATH);
        url.set_path(&path);
        url.query_pairs_mut()
            .clear()
            .append_pair("r", &self.identifier.to_base64())
            .append_pair("k", &self.ephemeral_key.to_base64())
            .append_pair("d", &self.routing_token)
            .append_pair("p", &self.platform)
            .append_pair("t", &self.tst.to_string());
        url
    }

    /// Parses a contact link. Every parameter is required.
    pub fn from_link(link: &str) -> Result<Self, DirectContactError> {
        let url = Url::parse(link).map_err(|e| invalid(format!("not a URL: {e}")))?;

        let last_segment = url.path_segments().and_then(|mut s| s.next_back());
        if last_segment != Some(CONTACT_PATH) {
            return Err(invalid("not a contact link"));
        }

        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        let param = |name: &str| {
            params
                .get(name)
                .ok_or_else(|| invalid(format!("missing parameter {name}")))
        };

        let identifier = RollingIdentifier::from_base64(param("r")?)
            .ok_or_else(|| invalid("malformed identifier"))?;
        let ephemeral_key = SymmetricKey::from_base64(param("k")?)
            .map_err(|_| invalid("malformed key"))?;
        let tst = param("t")?
            .parse::<i64>()
            .map_err(|_| invalid("malformed timestamp"))?;

        Ok(ContactInvitation {
            routing_token: param("d")?.clone(),
            ephemeral_key,
            identifier,
            platform: param("p")?.clone(),
            tst,
        })
    }

    /// Renders the invitation link as a text QR code.
    pub fn to_qr_image_string(&self, base: &Url) -> Result<String, DirectContactError> {
        use qrcode::QrCode;

        let code = QrCode::new(self.to_link(base).as_str())
            .map_err(|e| invalid(format!("QR generation failed: {e}")))?;

        Ok(code
            .render()
            .light_color(' ')
            .dark_color('█')
            .quiet_zone(false)
            .build())
    }
}

fn invalid(reason: impl Into<String>) -> DirectContactError {
    DirectContactError::InvalidInvitation(reason.into())
}

/// Ephemeral keys of issued invitations, indexed by invitation timestamp.
pub struct InvitationKeyStore {
    keys: Snapshot<std::collections::BTreeMap<i64, String>>,
}

impl InvitationKeyStore {
    pub fn open(storage: Arc<dyn StoragePort>) -> Result<Self, StorageError> {
        Ok(InvitationKeyStore {
            keys: Snapshot::load(storage, Collection::InvitationKeys)?,
        })
    }

    pub fn insert(&self, tst: i64, key: &SymmetricKey) -> Result<(), StorageError> {
        let encoded = key.to_base64();
        self.keys.update(|keys| {
            keys.insert(tst, encoded);
        })
    }

    /// The key issued at `tst`, if still held.
    pub fn get(&self, tst: i64) -> Option<SymmetricKey> {
        let keys = self.keys.read();
        let encoded = keys.get(&tst)?;
        match SymmetricKey::from_base64(encoded) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(tst, error = %e, "stored invitation key unreadable");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Removes keys of invitations issued before `horizon_millis`.
    pub fn purge_before(&self, horizon_millis: i64) -> Result<usize, StorageError> {
        if self.keys.read().range(..horizon_millis).next().is_none() {
            return Ok(0);
        }
        self.keys.update(|keys| {
            let kept = keys.split_off(&horizon_millis);
            let removed = keys.len();
            *keys = kept;
            removed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DaySecret;
    use crate::storage::MemoryStorage;

    fn invitation() -> ContactInvitation {
        ContactInvitation {
            routing_token: "device-token/with+chars".into(),
            ephemeral_key: SymmetricKey::generate(),
            identifier: DaySecret::generate().rolling_identifier(1, 2),
            platform: "ios".into(),
            tst: 1_700_000_000_123,
        }
    }

    #[test]
    fn test_link_round_trip() {
        let base = Url::parse("https://oextrace.example/app").unwrap();
        let invitation = invitation();
        let link = invitation.to_link(&base);

        assert_eq!(link.path(), "/app/contact");
        assert_eq!(ContactInvitation::from_link(link.as_str()).unwrap(), invitation);
    }

    #[test]
    fn test_missing_parameter_rejected() {
        let link = "https://oextrace.example/app/contact?r=AA&k=BB&d=x&p=ios";
        assert!(matches!(
            ContactInvitation::from_link(link),
            Err(DirectContactError::InvalidInvitation(_))
        ));
    }

    #[test]
    fn test_wrong_path_rejected() {
        let base = Url::parse("https://oextrace.example/app").unwrap();
        let mut link = invitation().to_link(&base);
        link.set_path("/app/other");
        assert!(ContactInvitation::from_link(link.as_str()).is_err());
    }

    #[test]
    fn test_qr_render() {
        let base = Url::parse("https://oextrace.example/").unwrap();
        let qr = invitation().to_qr_image_string(&base).unwrap();
        assert!(qr.contains('█'));
    }

    #[test]
    fn test_key_store_purge() {
        let store = InvitationKeyStore::open(Arc::new(MemoryStorage::new())).unwrap();
        let key = SymmetricKey::generate();
        store.insert(100, &key).unwrap();
        store.insert(200, &SymmetricKey::generate()).unwrap();

        assert_eq!(store.get(100), Some(key));
        assert_eq!(store.purge_before(150).unwrap(), 1);
        assert!(store.get(100).is_none());
        assert_eq!(store.len(), 1);
    }
}
