//! Saved-artifact library
//!
//! Finished artifacts the user chose to keep, newest first. Entries are
//! detached copies: deleting the originating session leaves them intact.

use crate::error::{ApiError, StorageError};
use crate::state::SessionStore;
use crate::types::ArtifactId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedArtifact {
    /// Id of the artifact this copy was taken from.
    pub id: String,
    pub prompt: String,
    pub style_name: String,
    pub html: String,
    /// Save time in milliseconds since the Unix epoch.
    pub date: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ArtifactLibrary {
    items: Vec<SavedArtifact>,
}

impl ArtifactLibrary {
    pub fn new(items: Vec<SavedArtifact>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[SavedArtifact] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SavedArtifact> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Copy a finished artifact into the library, newest first. Saving the
    /// same artifact again replaces the earlier copy.
    pub fn save(
        &mut self,
        store: &SessionStore,
        artifact_id: &ArtifactId,
    ) -> Result<&SavedArtifact, ApiError> {
        let (prompt, artifact) = store
            .find_artifact(artifact_id)
            .ok_or_else(|| ApiError::ArtifactNotFound(artifact_id.clone()))?;
        if !artifact.status().is_terminal() {
            return Err(ApiError::ArtifactNotReady(artifact_id.clone()));
        }

        self.items.retain(|item| item.id != artifact_id.as_str());
        self.items.insert(
            0,
            SavedArtifact {
                id: artifact_id.to_string(),
                prompt,
                style_name: artifact.style_name().to_string(),
                html: artifact.html().to_string(),
                date: chrono::Utc::now().timestamp_millis(),
            },
        );
        info!(artifact = %artifact_id, "Saved artifact to library");
        Ok(&self.items[0])
    }

    pub fn remove(&mut self, id: &str) -> Option<SavedArtifact> {
        let position = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(position))
    }

    /// Write a saved entry's html to `path`.
    pub fn export(&self, id: &str, path: &Path) -> Result<(), ApiError> {
        let item = self
            .get(id)
            .ok_or_else(|| ApiError::ArtifactNotFound(ArtifactId::from(id)))?;
        export_html(&item.html, path)
    }
}

/// Write html to `path`, creating parent directories as needed.
pub fn export_html(html: &str, path: &Path) -> Result<(), ApiError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(StorageError::from)?;
    }
    std::fs::write(path, html).map_err(StorageError::from)?;
    Ok(())
}
