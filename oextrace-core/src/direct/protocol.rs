// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};

use super::{ContactInvitation, DirectContactError, InvitationKeyStore};
use crate::backend::{Backend, MakeContactRequest, RelayNotification};
use crate::contacts::{ContactStore, QrContact};
use crate::crypto::{day_number, CryptoEngine, ExchangePayload, SymmetricKey};
use crate::logs::{ProtocolLog, TAG_APP};

/// How long an invitation can be answered, either side of its timestamp.
pub const CONTACT_VALIDITY_MS: i64 = 60_000;

/// Relay-based contact registration for scanned-code encounters.
///
/// Only the single-use ephemeral key leaves the device; day secrets never
/// do.
pub struct DirectContactProtocol {
    crypto: Arc<CryptoEngine>,
    contacts: Arc<ContactStore>,
    keys: Arc<InvitationKeyStore>,
    backend: Arc<dyn Backend>,
    log: Arc<ProtocolLog>,
}

impl DirectContactProtocol {
    pub fn new(
        crypto: Arc<CryptoEngine>,
        contacts: Arc<ContactStore>,
        keys: Arc<InvitationKeyStore>,
        backend: Arc<dyn Backend>,
        log: Arc<ProtocolLog>,
    ) -> Self {
        DirectContactProtocol {
            crypto,
            contacts,
            keys,
            backend,
            log,
        }
    }

    /// Mints an invitation and remembers its ephemeral key.
    pub fn create_invitation(
        &self,
        routing_token: &str,
        platform: &str,
    ) -> Result<ContactInvitation, DirectContactError> {
        let tst = self.crypto.clock().now_millis();
        let identifier = self.crypto.current_rolling_identifier_and_metadata()?.identifier;
        let ephemeral_key = SymmetricKey::generate();

        self.keys.insert(tst, &ephemeral_key)?;
        tracing::info!(tst, "contact invitation created");

        Ok(ContactInvitation {
            routing_token: routing_token.to_string(),
            ephemeral_key,
            identifier,
            platform: platform.to_string(),
            tst,
        })
    }

    /// Answers a scanned invitation.
    ///
    /// Fails with `ContactExpired`, without any network call, when the
    /// invitation is more than a minute away from the local clock. On
    /// success the inviter's advertised identifier is stored as a direct
    /// contact.
    pub async fn make_contact(
        &self,
        invitation: &ContactInvitation,
    ) -> Result<QrContact, DirectContactError> {
        let now = self.crypto.clock().now_millis();
        if (now - invitation.tst).abs() > CONTACT_VALIDITY_MS {
            tracing::info!(tst = invitation.tst, now, "contact code expired");
            return Err(DirectContactError::ContactExpired {
                tst: invitation.tst,
                now,
            });
        }

        let payload = self.crypto.current_rolling_identifier_and_metadata()?;
        let sealed = payload.seal(&invitation.ephemeral_key)?;

        let request = MakeContactRequest {
            token: invitation.routing_token.clone(),
            platform: invitation.platform.clone(),
            secret: STANDARD.encode(sealed),
            tst: invitation.tst,
        };

        if let Err(e) = self.backend.make_contact(&request).await {
            self.log.append(TAG_APP, format!("Contact request failed: {e}"));
            return Err(e.into());
        }

        let contact = QrContact::new(invitation.identifier, day_number(invitation.tst), None);
        self.contacts.add_qr_contact(contact.clone())?;
        self.log.append(TAG_APP, "Contact recorded");
        Ok(contact)
    }

    /// Completes a contact on the inviting side.
    ///
    /// Notifications for unknown invitations, and payloads that do not
    /// decode or decrypt, are dropped: the returned value is `None` and
    /// nothing is stored.
    pub fn handle_relay_notification(
        &self,
        notification: &RelayNotification,
    ) -> Result<Option<QrContact>, DirectContactError> {
        let Some(key) = self.keys.get(notification.tst) else {
            tracing::debug!(tst = notification.tst, "no invitation key for relay notification");
            return Ok(None);
        };

        let payload = STANDARD
            .decode(&notification.secret)
            .map_err(|e| e.to_string())
            .and_then(|sealed| ExchangePayload::open(&sealed, &key).map_err(|e| e.to_string()));

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(tst = notification.tst, error = %e, "dropping undecryptable relay notification");
                self.log.append(TAG_APP, format!("Relay notification dropped: {e}"));
                return Ok(None);
            }
        };

        // Filed under the invitation's day, not the day the push arrives.
        let contact = QrContact::new(
            payload.identifier,
            day_number(notification.tst),
            Some(payload.metadata),
        );
        self.contacts.add_qr_contact(contact.clone())?;
        self.log.append(TAG_APP, "Contact recorded from relay");
        Ok(Some(contact))
    }
}
