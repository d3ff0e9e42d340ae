//! In-memory storage port.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{Collection, StorageError, StoragePort};

/// Non-persistent [`StoragePort`] for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    collections: Mutex<HashMap<Collection, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a snapshot with arbitrary bytes (corruption tests).
    pub fn put_raw(&self, collection: Collection, data: Vec<u8>) {
        self.collections.lock().insert(collection, data);
    }
}

impl StoragePort for MemoryStorage {
    fn load(&self, collection: Collection) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.collections.lock().get(&collection).cloned())
    }

    fn save(&self, collection: Collection, data: &[u8]) -> Result<(), StorageError> {
        self.collections.lock().insert(collection, data.to_vec());
        Ok(())
    }

    fn clear(&self, collection: Collection) -> Result<(), StorageError> {
        self.collections.lock().remove(&collection);
        Ok(())
    }
}
