//! Flash UI: prompt-to-UI generation engine
//!
//! One prompt becomes a session of N artifacts, each rendered in its own
//! style by a concurrent, streamed, retry-capable generation job. Sessions
//! and saved artifacts persist between runs.

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod library;
pub mod logging;
pub mod provider;
pub mod session;
pub mod state;
pub mod store;
pub mod types;

pub use config::FlashConfig;
pub use error::{ApiError, StorageError};
pub use generation::{GenerationAdapter, SessionOrchestrator, SessionReport};
pub use library::{ArtifactLibrary, SavedArtifact};
pub use session::{Artifact, ArtifactStatus, Session};
pub use state::{HistorySnapshot, SessionStore};
pub use types::{ArtifactId, SessionId};
