//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::ProviderNotConfigured(_) | ApiError::ProviderAuthFailed(_) => format!(
            "{}\nConfigure [provider] in config/config.toml or export the provider's API key.",
            e
        ),
        _ => e.to_string(),
    }
}
