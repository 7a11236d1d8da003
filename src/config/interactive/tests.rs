use super::load_existing_config as load_existing_config_impl;
use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn load_existing_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.ollama, OllamaConfig::default());
}

#[test]
fn load_existing_config_reads_saved_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut saved = Config::with_base_dir(temp_dir.path());
    saved.generation.model = "mistral:7b".to_string();
    saved.save().expect("should save config");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.generation.model, "mistral:7b");
}

#[test]
fn load_existing_config_ignores_invalid_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("config.toml"), "[ollama\nport = 1")
        .expect("should write config");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config, Config::with_base_dir(temp_dir.path()));
}

#[test]
fn unreachable_server_fails_connection_test() {
    let ollama = OllamaConfig {
        host: "127.0.0.1".to_string(),
        port: 9,
        ..OllamaConfig::default()
    };

    assert!(!test_ollama_connection(&ollama));
}
