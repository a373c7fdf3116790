//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::config::{ConfigLoader, FlashConfig};
use crate::error::{ApiError, StorageError};
use crate::generation::{ProviderAdapter, SessionOrchestrator};
use crate::library::{export_html, ArtifactLibrary};
use crate::provider::{ModelProviderClient, ProviderFactory};
use crate::session::{ArtifactStatus, Session};
use crate::state::SessionStore;
use crate::store::{
    restore_library, restore_store, save_current, save_snapshot, spawn_autosave,
    HistoryPersistence, SledHistoryStore, DEFAULT_AUTOSAVE_DEBOUNCE,
};
use crate::types::{ArtifactId, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::parse::{Commands, ConfigCommands, HistoryCommands, LibraryCommands};
use crate::cli::presentation::{
    format_history_table, format_library_table, format_report_summary, format_session_table,
    format_status_transition,
};

/// Runtime context for CLI execution: effective config, restored history and library.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    config: FlashConfig,
    persistence: Arc<SledHistoryStore>,
    store: Arc<SessionStore>,
    library: Mutex<ArtifactLibrary>,
}

impl RunContext {
    /// Load and validate config, open the database, and restore state from it.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let mut config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(messages.join("; "))
        })?;

        if config.storage.data_dir.is_relative() {
            config.storage.data_dir = workspace_root.join(&config.storage.data_dir);
        }
        std::fs::create_dir_all(&config.storage.data_dir).map_err(StorageError::from)?;

        let persistence = Arc::new(SledHistoryStore::open(config.storage.database_path())?);
        let store = Arc::new(restore_store(persistence.as_ref()));
        let library = restore_library(persistence.as_ref());
        debug!(
            sessions = store.len(),
            saved = library.len(),
            "Restored persisted state"
        );

        Ok(Self {
            config,
            persistence,
            store,
            library: Mutex::new(library),
        })
    }

    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Generate {
                prompt,
                variations,
                out_dir,
            } => {
                self.handle_generate(prompt, *variations, out_dir.as_deref())
                    .await
            }
            Commands::History { command } => self.handle_history_command(command),
            Commands::Library { command } => self.handle_library_command(command),
            Commands::Config { command } => self.handle_config_command(command),
        }
    }

    async fn handle_generate(
        &self,
        prompt: &str,
        variations: Option<usize>,
        out_dir: Option<&Path>,
    ) -> Result<String, ApiError> {
        let client: Arc<dyn ModelProviderClient> =
            Arc::from(ProviderFactory::from_config(&self.config.provider)?);
        info!(
            provider = client.provider_name(),
            model = client.model_name(),
            "Provider client ready"
        );
        let adapter = Arc::new(ProviderAdapter::new(
            client,
            self.config.provider.default_options.clone(),
        ));
        let orchestrator = SessionOrchestrator::new(Arc::clone(&self.store), adapter, &self.config);

        let count = variations.unwrap_or(self.config.generation.variations);
        let submission = orchestrator.submit(prompt, count)?;
        let session_id = submission.session_id().clone();

        let persistence: Arc<dyn HistoryPersistence> = self.persistence.clone();
        let autosave = spawn_autosave(&self.store, persistence, DEFAULT_AUTOSAVE_DEBOUNCE);

        let mut tracker = StatusTracker::default();
        self.print_transitions(&mut tracker, &session_id);
        let mut changes = self.store.subscribe();
        let wait = submission.wait();
        tokio::pin!(wait);
        let report = loop {
            tokio::select! {
                report = &mut wait => break report,
                Ok(()) = changes.changed() => self.print_transitions(&mut tracker, &session_id),
            }
        };
        autosave.abort();
        self.print_transitions(&mut tracker, &session_id);
        let report = report?;

        save_snapshot(&self.store, self.persistence.as_ref())?;
        save_current(&self.store, self.persistence.as_ref())?;

        let session = self
            .store
            .session(&session_id)
            .ok_or_else(|| ApiError::SessionNotFound(session_id.clone()))?;
        let mut out = format_session_table(&session);
        out.push('\n');
        out.push_str(&format_report_summary(&report));
        if let Some(dir) = out_dir {
            let written = write_artifacts(&session, dir)?;
            out.push_str(&format!("Wrote {} file(s) to {}\n", written, dir.display()));
        }
        Ok(out)
    }

    fn print_transitions(&self, tracker: &mut StatusTracker, session_id: &SessionId) {
        if let Some(session) = self.store.session(session_id) {
            for line in tracker.observe(&session) {
                eprintln!("{}", line);
            }
        }
    }

    fn handle_history_command(&self, command: &HistoryCommands) -> Result<String, ApiError> {
        match command {
            HistoryCommands::List => Ok(format_history_table(&self.store.snapshot())),
            HistoryCommands::Show { session_id, html } => {
                let id = SessionId::from(session_id.as_str());
                let session = self
                    .store
                    .session(&id)
                    .ok_or(ApiError::SessionNotFound(id))?;
                let mut out = format_session_table(&session);
                if *html {
                    for artifact in session.artifacts() {
                        out.push_str(&format!(
                            "\n<!-- {} ({}) -->\n{}\n",
                            artifact.id(),
                            artifact.style_name(),
                            artifact.html()
                        ));
                    }
                }
                Ok(out)
            }
            HistoryCommands::Select { session_id } => {
                let id = SessionId::from(session_id.as_str());
                self.store.select_session(&id)?;
                save_current(&self.store, self.persistence.as_ref())?;
                Ok(format!("Current session: {}", id))
            }
            HistoryCommands::Delete { session_id, yes } => {
                let id = SessionId::from(session_id.as_str());
                if self.store.session(&id).is_none() {
                    return Err(ApiError::SessionNotFound(id));
                }
                if !*yes {
                    use dialoguer::Confirm;
                    let confirmed = Confirm::new()
                        .with_prompt(format!("Delete session {}?", id))
                        .default(false)
                        .interact()
                        .map_err(|e| {
                            ApiError::ConfigError(format!("Failed to get user input: {}", e))
                        })?;
                    if !confirmed {
                        return Ok("Deletion cancelled".to_string());
                    }
                }
                let removed = self
                    .store
                    .remove_session(&id)
                    .ok_or_else(|| ApiError::SessionNotFound(id.clone()))?;
                // An emptied history must still be written, unlike autosave.
                self.persistence.save_history(&self.store.sessions())?;
                save_current(&self.store, self.persistence.as_ref())?;
                Ok(format!(
                    "Deleted session {} ({} artifacts)",
                    removed.id(),
                    removed.artifacts().len()
                ))
            }
        }
    }

    fn handle_library_command(&self, command: &LibraryCommands) -> Result<String, ApiError> {
        match command {
            LibraryCommands::List => Ok(format_library_table(self.library.lock().items())),
            LibraryCommands::Save { artifact_id } => {
                let mut library = self.library.lock();
                let saved = library
                    .save(&self.store, &ArtifactId::from(artifact_id.as_str()))?
                    .clone();
                self.persistence.save_library(library.items())?;
                Ok(format!(
                    "Saved {} ({}) to library",
                    saved.id, saved.style_name
                ))
            }
            LibraryCommands::Show { saved_id } => {
                let library = self.library.lock();
                let item = library
                    .get(saved_id)
                    .ok_or_else(|| ApiError::ArtifactNotFound(ArtifactId::from(saved_id.as_str())))?;
                Ok(item.html.clone())
            }
            LibraryCommands::Export { saved_id, file } => {
                self.library.lock().export(saved_id, file)?;
                Ok(format!("Exported {} to {}", saved_id, file.display()))
            }
            LibraryCommands::Remove { saved_id } => {
                let mut library = self.library.lock();
                library
                    .remove(saved_id)
                    .ok_or_else(|| ApiError::ArtifactNotFound(ArtifactId::from(saved_id.as_str())))?;
                self.persistence.save_library(library.items())?;
                Ok(format!("Removed {} from library", saved_id))
            }
        }
    }

    fn handle_config_command(&self, command: &ConfigCommands) -> Result<String, ApiError> {
        match command {
            ConfigCommands::Show => {
                let mut shown = self.config.clone();
                if shown.provider.api_key.is_some() {
                    shown.provider.api_key = Some("********".to_string());
                }
                shown
                    .to_toml()
                    .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e)))
            }
        }
    }
}

/// Write every complete artifact of `session` to `dir/<artifact-id>.html`.
fn write_artifacts(session: &Session, dir: &Path) -> Result<usize, ApiError> {
    let mut written = 0;
    for artifact in session.artifacts() {
        if artifact.status() != ArtifactStatus::Complete {
            continue;
        }
        export_html(artifact.html(), &dir.join(format!("{}.html", artifact.id())))?;
        written += 1;
    }
    Ok(written)
}

/// Remembers the last (style, status) seen per artifact and reports only
/// changes, so fragment merges do not flood the terminal.
#[derive(Debug, Default)]
pub struct StatusTracker {
    seen: HashMap<ArtifactId, (String, ArtifactStatus)>,
}

impl StatusTracker {
    /// Progress lines for artifacts whose style or status changed since the
    /// previous call.
    pub fn observe(&mut self, session: &Session) -> Vec<String> {
        let mut lines = Vec::new();
        for artifact in session.artifacts() {
            let current = (artifact.style_name().to_string(), artifact.status());
            if self.seen.get(artifact.id()) == Some(&current) {
                continue;
            }
            lines.push(format_status_transition(
                artifact.id(),
                &current.0,
                current.1,
                artifact.html().len(),
            ));
            self.seen.insert(artifact.id().clone(), current);
        }
        lines
    }
}
