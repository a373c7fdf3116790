//! Integration tests for the configuration system

use flashui::config::{ConfigLoader, ProviderType};
use tempfile::TempDir;

#[test]
fn test_partial_file_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("flashui.toml");

    std::fs::write(
        &config_file,
        r#"
[provider]
provider_type = "ollama"
model = "llama3"
endpoint = "http://localhost:11434"

[generation]
variations = 3
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.provider.provider_type, ProviderType::Ollama);
    assert_eq!(config.provider.model, "llama3");
    assert_eq!(config.generation.variations, 3);
    assert_eq!(config.generation.max_variations, 3);
    assert_eq!(config.generation.stagger_ms, 800);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.initial_delay_ms, 1500);
}

#[test]
fn test_invalid_values_are_all_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("flashui.toml");

    std::fs::write(
        &config_file,
        r#"
[generation]
variations = 5
max_variations = 3

[retry]
max_attempts = 0

[logging]
format = "xml"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 3);
}

#[test]
fn test_rendered_config_loads_back() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("flashui.toml");

    let mut config = ConfigLoader::load_from_file(&write_empty(&temp_dir)).unwrap();
    config.generation.stagger_ms = 200;
    std::fs::write(&config_file, config.to_toml().unwrap()).unwrap();

    let reloaded = ConfigLoader::load_from_file(&config_file).unwrap();
    assert_eq!(reloaded, config);
}

fn write_empty(temp_dir: &TempDir) -> std::path::PathBuf {
    let path = temp_dir.path().join("empty.toml");
    std::fs::write(&path, "").unwrap();
    path
}
