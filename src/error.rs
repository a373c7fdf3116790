//! Error types for the Flash UI generation engine.

use crate::types::{ArtifactId, SessionId};
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Failed to encode {key}: {message}")]
    Encode { key: String, message: String },

    #[error("Failed to decode {key}: {message}")]
    Decode { key: String, message: String },
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Engine-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("A generation is already in flight; wait for it to finish")]
    SubmissionInFlight,

    #[error("Invalid variation count {requested} (must be between 1 and {max})")]
    InvalidVariationCount { requested: usize, max: usize },

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(ArtifactId),

    #[error("Artifact {0} is still streaming")]
    ArtifactNotReady(ArtifactId),

    #[error("Illegal status transition for artifact {artifact}: {from} -> {to}")]
    InvalidTransition {
        artifact: ArtifactId,
        from: &'static str,
        to: &'static str,
    },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

/// Provider signals that mean "quota exhausted, try again later".
const QUOTA_SIGNALS: [&str; 2] = ["429", "RESOURCE_EXHAUSTED"];

/// True when `message` carries one of the known quota-exhaustion signals.
pub fn is_quota_message(message: &str) -> bool {
    QUOTA_SIGNALS.iter().any(|signal| message.contains(signal))
}

impl ApiError {
    /// Whether the failure is worth retrying after a backoff.
    ///
    /// Rate-limit errors are transient by construction. Other provider errors
    /// are transient only when their message carries a quota signal, which
    /// covers adapters that cannot classify the failure themselves.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::ProviderRateLimit(_) => true,
            ApiError::ProviderError(msg)
            | ApiError::ProviderRequestFailed(msg)
            | ApiError::GenerationFailed(msg) => is_quota_message(msg),
            _ => false,
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
