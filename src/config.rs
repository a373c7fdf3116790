//! Configuration System
//!
//! Layered configuration: built-in defaults, the global user file, workspace
//! files, then `FLASHUI__SECTION__KEY` environment variables. Validation
//! reports every problem at once.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::provider::{ProviderConfig, ProviderType};

mod merge;
mod sources;

pub use sources::env::{ENV_PREFIX, ENV_SEPARATOR};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlashConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub styles: StylesConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[generation]`: how many artifacts per prompt and how they are launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_variations")]
    pub variations: usize,
    #[serde(default = "default_max_variations")]
    pub max_variations: usize,
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
}

fn default_variations() -> usize {
    2
}

fn default_max_variations() -> usize {
    3
}

fn default_stagger_ms() -> u64 {
    800
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            variations: default_variations(),
            max_variations: default_max_variations(),
            stagger_ms: default_stagger_ms(),
        }
    }
}

/// `[retry]`: exponential backoff for quota-limited provider calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

/// `[styles]`: labels used when style planning yields nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylesConfig {
    #[serde(default = "default_fallback_labels")]
    pub fallback_labels: Vec<String>,
    /// Fills positions the planner left blank or short.
    #[serde(default = "default_style_label")]
    pub default_label: String,
    /// Shown on artifacts until planning finishes.
    #[serde(default = "default_placeholder_label")]
    pub placeholder_label: String,
}

fn default_fallback_labels() -> Vec<String> {
    vec![
        "Hiện đại tối giản".to_string(),
        "Năng động táo bạo".to_string(),
        "Thanh lịch cổ điển".to_string(),
    ]
}

fn default_style_label() -> String {
    "Phong cách Vibe".to_string()
}

fn default_placeholder_label() -> String {
    "Đang khởi tạo...".to_string()
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            fallback_labels: default_fallback_labels(),
            default_label: default_style_label(),
            placeholder_label: default_placeholder_label(),
        }
    }
}

/// `[storage]`: where history and the library are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "flashui")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".flashui"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Provider(String),
    Generation(String),
    Retry(String),
    Styles(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::Styles(msg) => write!(f, "Styles: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl FlashConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }

        let generation = &self.generation;
        if generation.max_variations == 0 {
            errors.push(ValidationError::Generation(
                "max_variations must be at least 1".to_string(),
            ));
        }
        if generation.variations == 0 || generation.variations > generation.max_variations {
            errors.push(ValidationError::Generation(format!(
                "variations must be between 1 and {}, got {}",
                generation.max_variations, generation.variations
            )));
        }

        if self.retry.max_attempts == 0 {
            errors.push(ValidationError::Retry(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if self.styles.fallback_labels.iter().any(|l| l.trim().is_empty()) {
            errors.push(ValidationError::Styles(
                "fallback_labels cannot contain blank labels".to_string(),
            ));
        }
        if self.styles.default_label.trim().is_empty() {
            errors.push(ValidationError::Styles(
                "default_label cannot be empty".to_string(),
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Effective configuration rendered as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Loads [`FlashConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, workspace files, then environment.
    pub fn load(workspace_root: &Path) -> Result<FlashConfig, config::ConfigError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::env::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Defaults plus one explicit file.
    pub fn load_from_file(path: &Path) -> Result<FlashConfig, config::ConfigError> {
        merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path).required(true))
            .build()?
            .try_deserialize()
    }

    /// Location of the global user configuration file, if resolvable.
    pub fn xdg_config_path() -> Option<PathBuf> {
        sources::global_file::global_config_path()
    }
}
