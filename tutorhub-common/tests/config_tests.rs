//! Tests for configuration loading and root folder resolution
//!
//! Tests that touch TUTORHUB_ROOT_FOLDER are marked #[serial] so they never
//! race on the process environment.

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tutorhub_common::config::{
    default_root_folder, RootFolderInitializer, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};

#[test]
fn test_defaults_without_file() {
    let config = TomlConfig::load(Some(Path::new("/nonexistent/tutorhub/config.toml"))).unwrap();
    assert_eq!(config.port, 5080);
    assert_eq!(config.api.page_size, 10);
    assert_eq!(config.jwt.expiry_minutes, 1440);
    assert_eq!(config.message_queue.capacity, 256);
    assert!(!config.smtp.enabled);
    assert_eq!(config.schedule.generation_interval_minutes, 360);
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        port = 6000

        [api]
        page_size = 25

        [smtp]
        enabled = true
        host = "mail.example.org"
        "#,
    )
    .unwrap();

    assert_eq!(config.port, 6000);
    assert_eq!(config.api.page_size, 25);
    assert!(config.smtp.enabled);
    assert_eq!(config.smtp.host, "mail.example.org");
    assert_eq!(config.smtp.port, 587);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_invalid_toml_is_error() {
    assert!(TomlConfig::from_toml_str("port = \"not a number\"").is_err());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "database_path = \"custom.db\"\n[jwt]\nexpiry_minutes = 5\n").unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.database_path, PathBuf::from("custom.db"));
    assert_eq!(config.jwt.expiry_minutes, 5);
}

#[test]
#[serial]
fn test_resolver_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let resolver = RootFolderResolver::new(
        Some(PathBuf::from("/from/cli")),
        Some(PathBuf::from("/from/toml")),
    );
    assert_eq!(resolver.resolve(), PathBuf::from("/from/cli"));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let resolver = RootFolderResolver::new(None, Some(PathBuf::from("/from/toml")));
    assert_eq!(resolver.resolve(), PathBuf::from("/from/env"));
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new(None, Some(PathBuf::from("/from/toml")));
    assert_eq!(resolver.resolve(), PathBuf::from("/from/toml"));

    let resolver = RootFolderResolver::new(None, None);
    assert_eq!(resolver.resolve(), default_root_folder());
}

#[test]
fn test_initializer_creates_layout() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    assert!(root.exists());
    assert!(initializer.media_path().is_dir());

    assert_eq!(
        initializer.database_path(Path::new("tutorhub.db")),
        root.join("tutorhub.db")
    );
    assert_eq!(
        initializer.database_path(Path::new("/abs/tutorhub.db")),
        PathBuf::from("/abs/tutorhub.db")
    );
}
