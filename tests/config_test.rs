//! Integration tests for layered Settings loading.
//!
//! These tests pass explicit sources to `Settings::load_from` and skip the
//! environment layer, so the user's global config and `NESTREE_*` variables
//! never leak in.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use nestree::application::ApplicationError;
use nestree::config::{local_config_path, Backend, Settings};

#[test]
fn given_no_config_files_when_load_then_uses_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();

    // Act
    let settings = Settings::load_from(None, Some(dir.path()), false).expect("load settings");

    // Assert
    assert_eq!(settings.backend, Backend::Sqlite);
    assert_eq!(settings.root_name, "root");
    assert_eq!(settings.fuzz.iterations, 1000);
    assert_eq!(settings.fuzz.max_attempts, 1000);
    assert_eq!(settings.fuzz.seed, None);
    assert!(settings.db_path.ends_with("tree.db"));
}

#[test]
fn given_local_config_when_load_then_overrides_global() {
    // Arrange: global picks memory and a seed, local switches back to sqlite
    let dir = TempDir::new().unwrap();
    let global = dir.path().join("global.toml");
    fs::write(
        &global,
        r#"
backend = "memory"
root_name = "top"

[fuzz]
seed = 42
iterations = 10
"#,
    )
    .unwrap();
    let project = dir.path().join("project");
    fs::create_dir_all(&project).unwrap();
    fs::write(
        local_config_path(&project),
        r#"
backend = "sqlite"
db_path = "/tmp/nestree-test/tree.db"

[fuzz]
iterations = 5
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load_from(Some(&global), Some(&project), false).unwrap();

    // Assert
    assert_eq!(settings.backend, Backend::Sqlite);
    assert_eq!(settings.root_name, "top");
    assert_eq!(settings.fuzz.seed, Some(42));
    assert_eq!(settings.fuzz.iterations, 5);
    assert_eq!(settings.db_path, PathBuf::from("/tmp/nestree-test/tree.db"));
}

#[test]
fn given_tilde_db_path_when_load_then_expands_home() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "db_path = \"~/trees/t.db\"\n").unwrap();

    let settings = Settings::load_from(None, Some(dir.path()), false).unwrap();

    assert!(!settings.db_path.to_string_lossy().starts_with('~'));
    assert!(settings.db_path.ends_with("trees/t.db"));
}

#[test]
fn given_root_name_with_space_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "root_name = \"my root\"\n").unwrap();

    let err = Settings::load_from(None, Some(dir.path()), false).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_zero_max_attempts_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "[fuzz]\nmax_attempts = 0\n",
    )
    .unwrap();

    let err = Settings::load_from(None, Some(dir.path()), false).unwrap_err();

    assert!(err.to_string().contains("max_attempts"));
}

#[test]
fn given_settings_when_serialized_then_template_and_toml_parse_back() {
    let settings = Settings::default();

    let rendered = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&rendered).unwrap();

    assert_eq!(parsed, settings);
    assert!(toml::from_str::<Settings>(&Settings::template()).is_ok());
}
