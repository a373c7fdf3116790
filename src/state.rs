//! Application state store for session history.
//!
//! The store owns the ordered session history and the index of the current
//! session. Every mutation is a single entry point that takes the write lock,
//! locates its target by id and applies the change before releasing, so two
//! generation jobs updating sibling artifacts in the same tick never lose each
//! other's writes. Readers get cloned snapshots; observers subscribe to the
//! revision counter, which advances after every applied mutation.

use crate::error::ApiError;
use crate::session::{Artifact, ArtifactStatus, Session};
use crate::types::{ArtifactId, SessionId};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Default)]
struct History {
    sessions: Vec<Session>,
    current: Option<usize>,
}

impl History {
    fn position(&self, id: &SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id() == id)
    }

    fn session_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }
}

/// Read-only copy of the whole history.
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    pub sessions: Vec<Session>,
    pub current: Option<usize>,
}

impl HistorySnapshot {
    pub fn current_session(&self) -> Option<&Session> {
        self.current.and_then(|idx| self.sessions.get(idx))
    }
}

/// Result of an artifact-targeted mutation.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The session was removed while its jobs were still running.
    SessionMissing,
    ArtifactMissing,
    /// The artifact is already terminal; the update was dropped.
    Rejected(ArtifactStatus),
}

impl UpdateOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

impl std::fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateOutcome::Applied => write!(f, "applied"),
            UpdateOutcome::SessionMissing => write!(f, "session removed"),
            UpdateOutcome::ArtifactMissing => write!(f, "artifact missing"),
            UpdateOutcome::Rejected(status) => write!(f, "artifact already {}", status.as_str()),
        }
    }
}

pub struct SessionStore {
    inner: RwLock<History>,
    revision: watch::Sender<u64>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: RwLock::new(History::default()),
            revision,
        }
    }

    /// Restore a persisted history. Artifacts left streaming by a previous
    /// process are failed, and the last session becomes current.
    pub fn restore(mut sessions: Vec<Session>) -> Self {
        let recovered: usize = sessions.iter_mut().map(Session::recover_interrupted).sum();
        if recovered > 0 {
            debug!(recovered, "Failed artifacts interrupted by a previous run");
        }
        let current = sessions.len().checked_sub(1);
        let store = Self::new();
        *store.inner.write() = History { sessions, current };
        store
    }

    /// Observe history changes. The value is a monotonically increasing
    /// revision number.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Append a new session with `count` placeholder artifacts and make it
    /// the current one.
    pub fn create_session(&self, prompt: &str, count: usize, placeholder_label: &str) -> Session {
        let session = Session::new(prompt, count, placeholder_label);
        {
            let mut history = self.inner.write();
            history.sessions.push(session.clone());
            history.current = Some(history.sessions.len() - 1);
        }
        self.bump();
        session
    }

    /// Rewrite the style labels of a session's artifacts.
    pub fn apply_style_labels(&self, id: &SessionId, labels: &[String]) -> Result<(), ApiError> {
        {
            let mut history = self.inner.write();
            let session = history
                .session_mut(id)
                .ok_or_else(|| ApiError::SessionNotFound(id.clone()))?;
            session.apply_style_labels(labels);
        }
        self.bump();
        Ok(())
    }

    /// Append one streamed fragment to an artifact's html.
    pub fn merge_fragment(
        &self,
        session: &SessionId,
        artifact: &ArtifactId,
        fragment: &str,
    ) -> UpdateOutcome {
        self.update_artifact(session, artifact, |a| a.append(fragment))
    }

    /// Apply `finalize` to the accumulated html and mark the artifact complete.
    pub fn complete_artifact<F>(
        &self,
        session: &SessionId,
        artifact: &ArtifactId,
        finalize: F,
    ) -> UpdateOutcome
    where
        F: FnOnce(&str) -> String,
    {
        self.update_artifact(session, artifact, |a| a.complete_with(finalize))
    }

    /// Mark an artifact failed, keeping its partial html.
    pub fn fail_artifact(&self, session: &SessionId, artifact: &ArtifactId) -> UpdateOutcome {
        self.update_artifact(session, artifact, Artifact::fail)
    }

    fn update_artifact<F>(&self, session: &SessionId, artifact: &ArtifactId, apply: F) -> UpdateOutcome
    where
        F: FnOnce(&mut Artifact) -> Result<(), ApiError>,
    {
        let outcome = {
            let mut history = self.inner.write();
            match history.session_mut(session) {
                None => UpdateOutcome::SessionMissing,
                Some(s) => match s.artifact_mut(artifact) {
                    None => UpdateOutcome::ArtifactMissing,
                    Some(a) => match apply(&mut *a) {
                        Ok(()) => UpdateOutcome::Applied,
                        Err(_) => UpdateOutcome::Rejected(a.status()),
                    },
                },
            }
        };
        if outcome.is_applied() {
            self.bump();
        } else {
            debug!(
                session = %session,
                artifact = %artifact,
                ?outcome,
                "Dropped artifact update"
            );
        }
        outcome
    }

    /// Remove a session from the history, keeping `current` pointing at the
    /// same session when it survives.
    pub fn remove_session(&self, id: &SessionId) -> Option<Session> {
        let removed = {
            let mut history = self.inner.write();
            let idx = history.position(id)?;
            let removed = history.sessions.remove(idx);
            history.current = match history.current {
                Some(cur) if cur > idx => Some(cur - 1),
                Some(cur) if cur == idx => history.sessions.len().checked_sub(1),
                other => other,
            };
            removed
        };
        self.bump();
        Some(removed)
    }

    /// Make the given session the current one.
    pub fn select_session(&self, id: &SessionId) -> Result<(), ApiError> {
        {
            let mut history = self.inner.write();
            let idx = history
                .position(id)
                .ok_or_else(|| ApiError::SessionNotFound(id.clone()))?;
            history.current = Some(idx);
        }
        self.bump();
        Ok(())
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        let history = self.inner.read();
        HistorySnapshot {
            sessions: history.sessions.clone(),
            current: history.current,
        }
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.inner.read().sessions.clone()
    }

    pub fn session(&self, id: &SessionId) -> Option<Session> {
        self.inner.read().sessions.iter().find(|s| s.id() == id).cloned()
    }

    pub fn current_session(&self) -> Option<Session> {
        let history = self.inner.read();
        history.current.and_then(|idx| history.sessions.get(idx).cloned())
    }

    /// Locate an artifact anywhere in the history, returning it with its
    /// owning session's prompt.
    pub fn find_artifact(&self, id: &ArtifactId) -> Option<(String, Artifact)> {
        let history = self.inner.read();
        history.sessions.iter().find_map(|s| {
            s.artifact(id)
                .map(|artifact| (s.prompt().to_string(), artifact.clone()))
        })
    }

    /// `None` when the session does not exist.
    pub fn is_session_finished(&self, id: &SessionId) -> Option<bool> {
        self.inner
            .read()
            .sessions
            .iter()
            .find(|s| s.id() == id)
            .map(Session::is_finished)
    }

    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
