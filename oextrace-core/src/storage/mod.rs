// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! Every store keeps its state as one snapshot per [`Collection`], written
//! through the [`StoragePort`] trait. The SQLite implementation encrypts
//! each snapshot with the storage key before it touches disk; the in-memory
//! implementation backs tests.

mod error;
mod memory;
pub mod migration;
mod snapshot;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub(crate) use snapshot::Snapshot;

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::crypto::SymmetricKey;

/// A persisted collection. One snapshot is stored per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    DaySecrets,
    Contacts,
    InvitationKeys,
    Tracks,
    SyncCursors,
    ProtocolLog,
    UserStatus,
}

impl Collection {
    /// Stable name used as the storage key.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::DaySecrets => "day_secrets",
            Collection::Contacts => "contacts",
            Collection::InvitationKeys => "invitation_keys",
            Collection::Tracks => "tracks",
            Collection::SyncCursors => "sync_cursors",
            Collection::ProtocolLog => "protocol_log",
            Collection::UserStatus => "user_status",
        }
    }
}

/// Storage port: persistence of opaque collection snapshots.
pub trait StoragePort: Send + Sync {
    /// Loads the snapshot of a collection, if one was saved.
    fn load(&self, collection: Collection) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replaces the snapshot of a collection.
    fn save(&self, collection: Collection, data: &[u8]) -> Result<(), StorageError>;

    /// Removes the snapshot of a collection.
    fn clear(&self, collection: Collection) -> Result<(), StorageError>;
}

/// SQLite-based storage implementation.
///
/// Snapshots are encrypted with the storage key (application-level
/// encryption) before being written.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    encryption_key: SymmetricKey,
}

impl SqliteStorage {
    /// Opens or creates a storage database at the given path.
    pub fn open<P: AsRef<Path>>(
        path: P,
        encryption_key: SymmetricKey,
    ) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, encryption_key)
    }

    /// Creates an in-memory database (for testing).
    pub fn in_memory(encryption_key: SymmetricKey) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, encryption_key)
    }

    fn with_connection(conn: Connection, encryption_key: SymmetricKey) -> Result<Self, StorageError> {
        migration::MigrationRunner::run(&conn, &migration::all_migrations())?;
        Ok(SqliteStorage {
            conn: Mutex::new(conn),
            encryption_key,
        })
    }

    /// Returns the current schema version.
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        migration::MigrationRunner::current_version(&self.conn.lock())
    }
}

impl StoragePort for SqliteStorage {
    fn load(&self, collection: Collection) -> Result<Option<Vec<u8>>, StorageError> {
        let encrypted: Option<Vec<u8>> = self
            .conn
            .lock()
            .query_row(
                "SELECT data FROM collections WHERE name = ?1",
                params![collection.name()],
                |row| row.get(0),
            )
            .optional()?;

        encrypted
            .map(|data| {
                crate::crypto::decrypt(&self.encryption_key, &data)
                    .map_err(|e| StorageError::Encryption(e.to_string()))
            })
            .transpose()
    }

    fn save(&self, collection: Collection, data: &[u8]) -> Result<(), StorageError> {
        let encrypted = crate::crypto::encrypt(&self.encryption_key, data)
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        self.conn.lock().execute(
            "INSERT OR REPLACE INTO collections (name, data, updated_at) VALUES (?1, ?2, ?3)",
            params![collection.name(), encrypted, now],
        )?;
        Ok(())
    }

    fn clear(&self, collection: Collection) -> Result<(), StorageError> {
        self.conn.lock().execute(
            "DELETE FROM collections WHERE name = ?1",
            params![collection.name()],
        )?;
        Ok(())
    }
}
