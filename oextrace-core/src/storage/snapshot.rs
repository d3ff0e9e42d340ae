// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Copy-on-write snapshot shared by the radio loop and the sync driver.
//!
//! This is the one place that enforces store atomicity: a writer clones the
//! current state under the write lock, mutates the copy, persists it and
//! only then swaps it in. Readers take the read lock and always see a
//! complete state. If persisting fails the old state stays in place.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Collection, StorageError, StoragePort};

pub(crate) struct Snapshot<T> {
    storage: Arc<dyn StoragePort>,
    collection: Collection,
    state: RwLock<T>,
}

impl<T> Snapshot<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    /// Loads the collection. An unreadable snapshot resets the collection.
    pub(crate) fn load(
        storage: Arc<dyn StoragePort>,
        collection: Collection,
    ) -> Result<Self, StorageError> {
        let state = match storage.load(collection) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        collection = collection.name(),
                        error = %e,
                        "unreadable snapshot, resetting store"
                    );
                    storage.clear(collection)?;
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(StorageError::Encryption(e)) | Err(StorageError::Serialization(e)) => {
                tracing::warn!(
                    collection = collection.name(),
                    error = %e,
                    "undecryptable snapshot, resetting store"
                );
                storage.clear(collection)?;
                T::default()
            }
            Err(e) => return Err(e),
        };

        Ok(Snapshot {
            storage,
            collection,
            state: RwLock::new(state),
        })
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, T> {
        self.state.read()
    }

    /// Applies `f` as one atomic read-modify-write step.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StorageError> {
        let mut guard = self.state.write();
        let mut next = guard.clone();
        let out = f(&mut next);

        let bytes = serde_json::to_vec(&next)?;
        self.storage.save(self.collection, &bytes)?;

        *guard = next;
        Ok(out)
    }
}
