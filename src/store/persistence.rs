//! Sled-backed persistence for history and library snapshots

use crate::error::StorageError;
use crate::library::SavedArtifact;
use crate::session::Session;
use crate::store::{HistoryPersistence, CURRENT_KEY, HISTORY_KEY, LIBRARY_KEY};
use crate::types::SessionId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

const TREE_NAME: &str = "flashui";

/// Stores each collection as one JSON document under a fixed key.
pub struct SledHistoryStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledHistoryStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory database removed on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { db, tree })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.tree.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Decode {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Encode {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.tree.insert(key, bytes)?;
        self.tree.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.tree.insert(key, bytes)?;
        Ok(())
    }
}

impl HistoryPersistence for SledHistoryStore {
    fn load_history(&self) -> Result<Vec<Session>, StorageError> {
        Ok(self.get_json(HISTORY_KEY)?.unwrap_or_default())
    }

    fn save_history(&self, sessions: &[Session]) -> Result<(), StorageError> {
        self.put_json(HISTORY_KEY, sessions)
    }

    fn load_library(&self) -> Result<Vec<SavedArtifact>, StorageError> {
        Ok(self.get_json(LIBRARY_KEY)?.unwrap_or_default())
    }

    fn save_library(&self, items: &[SavedArtifact]) -> Result<(), StorageError> {
        self.put_json(LIBRARY_KEY, items)
    }

    fn load_current(&self) -> Result<Option<SessionId>, StorageError> {
        self.get_json(CURRENT_KEY)
    }

    fn save_current(&self, current: Option<&SessionId>) -> Result<(), StorageError> {
        match current {
            Some(id) => self.put_json(CURRENT_KEY, id),
            None => {
                self.tree.remove(CURRENT_KEY)?;
                Ok(())
            }
        }
    }
}
