//! Persistence collaborator
//!
//! Session history and the saved-artifact library are stored as JSON
//! documents under fixed keys. Loading is best-effort: missing or corrupt
//! data yields an empty collection. The autosave task writes the history
//! back whenever the session store changes.

pub mod persistence;

pub use persistence::SledHistoryStore;

use crate::error::StorageError;
use crate::library::{ArtifactLibrary, SavedArtifact};
use crate::session::Session;
use crate::state::SessionStore;
use crate::types::SessionId;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const HISTORY_KEY: &str = "flash_ui_all_sessions";
pub const LIBRARY_KEY: &str = "flash_ui_saved_components";
pub const CURRENT_KEY: &str = "flash_ui_current_session";

/// Default quiet period used to coalesce bursts of fragment updates.
pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(250);

/// History persistence interface
pub trait HistoryPersistence: Send + Sync {
    fn load_history(&self) -> Result<Vec<Session>, StorageError>;
    fn save_history(&self, sessions: &[Session]) -> Result<(), StorageError>;
    fn load_library(&self) -> Result<Vec<SavedArtifact>, StorageError>;
    fn save_library(&self, items: &[SavedArtifact]) -> Result<(), StorageError>;
    /// Id of the session the user last focused.
    fn load_current(&self) -> Result<Option<SessionId>, StorageError>;
    fn save_current(&self, current: Option<&SessionId>) -> Result<(), StorageError>;
}

/// Rebuild the session store from persisted history, failing artifacts a
/// previous process left streaming. The last focused session becomes
/// current when it still exists, otherwise the newest one.
pub fn restore_store(persistence: &dyn HistoryPersistence) -> SessionStore {
    let sessions = persistence.load_history().unwrap_or_else(|e| {
        warn!(error = %e, "Discarding unreadable session history");
        Vec::new()
    });
    let store = SessionStore::restore(sessions);
    match persistence.load_current() {
        Ok(Some(id)) => {
            if store.select_session(&id).is_err() {
                debug!(session = %id, "Focused session no longer exists");
            }
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Discarding unreadable focused session"),
    }
    store
}

/// Persist which session is current.
pub fn save_current(
    store: &SessionStore,
    persistence: &dyn HistoryPersistence,
) -> Result<(), StorageError> {
    let current = store.current_session();
    persistence.save_current(current.as_ref().map(|s| s.id()))
}

pub fn restore_library(persistence: &dyn HistoryPersistence) -> ArtifactLibrary {
    let items = persistence.load_library().unwrap_or_else(|e| {
        warn!(error = %e, "Discarding unreadable artifact library");
        Vec::new()
    });
    ArtifactLibrary::new(items)
}

/// Write the current history if it is non-empty. Returns whether anything
/// was written.
pub fn save_snapshot(
    store: &SessionStore,
    persistence: &dyn HistoryPersistence,
) -> Result<bool, StorageError> {
    let sessions = store.sessions();
    if sessions.is_empty() {
        return Ok(false);
    }
    persistence.save_history(&sessions)?;
    Ok(true)
}

/// Persist the history after every change, waiting `debounce` after each
/// change so a burst of fragment merges results in a single write.
///
/// The task ends once the store is dropped. Write failures are logged and
/// retried on the next change.
pub fn spawn_autosave(
    store: &Arc<SessionStore>,
    persistence: Arc<dyn HistoryPersistence>,
    debounce: Duration,
) -> JoinHandle<()> {
    let mut changes = store.subscribe();
    let store: Weak<SessionStore> = Arc::downgrade(store);
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
            }
            let revision = *changes.borrow_and_update();
            let Some(store) = store.upgrade() else {
                break;
            };
            match save_snapshot(&store, persistence.as_ref()) {
                Ok(written) => debug!(revision, written, "Autosaved session history"),
                Err(e) => warn!(revision, error = %e, "Failed to persist session history"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ArtifactStatus;

    #[test]
    fn test_restore_fails_interrupted_artifacts() {
        let persistence = SledHistoryStore::temporary().unwrap();
        let live = SessionStore::new();
        let session = live.create_session("card", 2, "x");
        let first = session.artifacts()[0].id().clone();
        assert!(live.merge_fragment(session.id(), &first, "<p>").is_applied());
        persistence.save_history(&live.sessions()).unwrap();

        let restored = restore_store(&persistence);
        let snapshot = restored.snapshot();
        assert_eq!(snapshot.current, Some(0));
        let session = snapshot.current_session().unwrap();
        assert!(session.is_finished());
        assert_eq!(session.artifacts()[0].status(), ArtifactStatus::Error);
        assert_eq!(session.artifacts()[0].html(), "<p>");
    }

    #[test]
    fn test_restore_honors_focused_session() {
        let persistence = SledHistoryStore::temporary().unwrap();
        let live = SessionStore::new();
        let first = live.create_session("first", 1, "x");
        live.create_session("second", 1, "x");
        persistence.save_history(&live.sessions()).unwrap();

        assert_eq!(restore_store(&persistence).snapshot().current, Some(1));

        live.select_session(first.id()).unwrap();
        save_current(&live, &persistence).unwrap();
        assert_eq!(restore_store(&persistence).snapshot().current, Some(0));

        persistence
            .save_current(Some(&SessionId::from("gone")))
            .unwrap();
        assert_eq!(restore_store(&persistence).snapshot().current, Some(1));
    }

    #[test]
    fn test_corrupt_history_restores_empty() {
        let persistence = SledHistoryStore::temporary().unwrap();
        persistence.put_raw(HISTORY_KEY, b"[{").unwrap();
        persistence.put_raw(LIBRARY_KEY, b"oops").unwrap();
        assert!(restore_store(&persistence).is_empty());
        assert!(restore_library(&persistence).is_empty());
    }

    #[test]
    fn test_empty_history_is_not_written() {
        let persistence = SledHistoryStore::temporary().unwrap();
        let store = SessionStore::new();
        assert!(!save_snapshot(&store, &persistence).unwrap());

        store.create_session("card", 1, "x");
        assert!(save_snapshot(&store, &persistence).unwrap());
        assert_eq!(persistence.load_history().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_writes_after_changes() {
        let persistence = Arc::new(SledHistoryStore::temporary().unwrap());
        let store = Arc::new(SessionStore::new());
        let task = spawn_autosave(&store, persistence.clone(), Duration::from_millis(100));

        let session = store.create_session("card", 1, "x");
        let artifact = session.artifacts()[0].id().clone();
        for fragment in ["<a>", "b", "</a>"] {
            assert!(store.merge_fragment(session.id(), &artifact, fragment).is_applied());
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        let saved = persistence.load_history().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].artifacts()[0].html(), "<a>b</a>");

        drop(store);
        task.await.unwrap();
    }
}
