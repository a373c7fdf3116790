//! Session and artifact data model.
//!
//! A [`Session`] is one submitted prompt plus the fixed-size set of artifacts
//! generated for it. Artifacts move through a one-way lifecycle:
//! `streaming -> complete` or `streaming -> error`, each at most once. All
//! mutation goes through the crate-private methods below so the lifecycle and
//! the append-only `html` rule cannot be bypassed from outside the engine.

use crate::error::ApiError;
use crate::types::{ArtifactId, SessionId};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Streaming,
    Complete,
    Error,
}

impl ArtifactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactStatus::Streaming => "streaming",
            ArtifactStatus::Complete => "complete",
            ArtifactStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ArtifactStatus::Streaming)
    }
}

/// One generated UI document and its lifecycle status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    id: ArtifactId,
    style_name: String,
    html: String,
    status: ArtifactStatus,
}

impl Artifact {
    /// Empty artifact awaiting its generation job.
    pub fn placeholder(id: ArtifactId, label: &str) -> Self {
        Self {
            id,
            style_name: label.to_string(),
            html: String::new(),
            status: ArtifactStatus::Streaming,
        }
    }

    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    pub fn style_name(&self) -> &str {
        &self.style_name
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn status(&self) -> ArtifactStatus {
        self.status
    }

    pub(crate) fn set_style_name(&mut self, label: String) {
        self.style_name = label;
    }

    /// Append a streamed fragment. Only legal while streaming.
    pub(crate) fn append(&mut self, fragment: &str) -> Result<(), ApiError> {
        self.ensure_streaming(ArtifactStatus::Streaming)?;
        self.html.push_str(fragment);
        Ok(())
    }

    /// Replace the accumulated text with `finalize(accumulated)` and mark the
    /// artifact complete. The transform runs exactly once per artifact since
    /// a complete artifact can never be completed again.
    pub(crate) fn complete_with<F>(&mut self, finalize: F) -> Result<(), ApiError>
    where
        F: FnOnce(&str) -> String,
    {
        self.ensure_streaming(ArtifactStatus::Complete)?;
        self.html = finalize(&self.html);
        self.status = ArtifactStatus::Complete;
        Ok(())
    }

    /// Mark the artifact failed, keeping any partial output.
    pub(crate) fn fail(&mut self) -> Result<(), ApiError> {
        self.ensure_streaming(ArtifactStatus::Error)?;
        self.status = ArtifactStatus::Error;
        Ok(())
    }

    fn ensure_streaming(&self, to: ArtifactStatus) -> Result<(), ApiError> {
        if self.status.is_terminal() {
            return Err(ApiError::InvalidTransition {
                artifact: self.id.clone(),
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        Ok(())
    }
}

/// Per-status artifact counts for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub streaming: usize,
    pub complete: usize,
    pub error: usize,
}

/// One prompt and the artifacts generated in response to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: SessionId,
    prompt: String,
    #[serde(alias = "timestamp")]
    created_at: i64,
    artifacts: Vec<Artifact>,
}

impl Session {
    /// New session with `count` placeholder artifacts.
    pub fn new(prompt: &str, count: usize, placeholder_label: &str) -> Self {
        let id = SessionId::generate();
        let artifacts = (0..count)
            .map(|position| {
                Artifact::placeholder(ArtifactId::for_position(&id, position), placeholder_label)
            })
            .collect();
        Self {
            id,
            prompt: prompt.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
            artifacts,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Creation time in milliseconds since the Unix epoch.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn artifact(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| &artifact.id == id)
    }

    pub(crate) fn artifact_mut(&mut self, id: &ArtifactId) -> Option<&mut Artifact> {
        self.artifacts.iter_mut().find(|artifact| &artifact.id == id)
    }

    /// Rewrite style labels in place, by position. Missing labels leave the
    /// artifact's current label untouched.
    pub(crate) fn apply_style_labels(&mut self, labels: &[String]) {
        for (artifact, label) in self.artifacts.iter_mut().zip(labels) {
            artifact.set_style_name(label.clone());
        }
    }

    /// True once every artifact reached a terminal status.
    pub fn is_finished(&self) -> bool {
        self.artifacts.iter().all(|a| a.status.is_terminal())
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for artifact in &self.artifacts {
            match artifact.status {
                ArtifactStatus::Streaming => counts.streaming += 1,
                ArtifactStatus::Complete => counts.complete += 1,
                ArtifactStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    /// Fail every artifact left streaming by a previous process. Returns the
    /// number of artifacts moved to `error`.
    pub(crate) fn recover_interrupted(&mut self) -> usize {
        self.artifacts
            .iter_mut()
            .filter(|a| a.status == ArtifactStatus::Streaming)
            .map(|a| a.fail())
            .filter(Result::is_ok)
            .count()
    }
}
