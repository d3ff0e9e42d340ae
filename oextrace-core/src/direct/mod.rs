// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Direct Contact Module
//!
//! Contact registration through a scanned code and a push relay:
//!
//! 1. The inviting device mints an ephemeral key and shows an invitation.
//! 2. The scanning device seals its own identifier and metadata under that
//!    key and submits it to the relay, then records the inviter.
//! 3. The relay notifies the inviting device, which decrypts the payload
//!    with the stored key and records the scanner.

mod error;
mod invitation;
mod protocol;

pub use error::DirectContactError;
pub use invitation::{ContactInvitation, InvitationKeyStore, CONTACT_PATH};
pub use protocol::{DirectContactProtocol, CONTACT_VALIDITY_MS};

pub use crate::backend::RelayNotification;
