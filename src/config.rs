//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/nestree/nestree.toml`
//! 3. Local config: `<dir>/.nestree.toml`
//! 4. Environment variables: `NESTREE_*` prefix (`__` separates nested keys)
//!
//! CLI flags are applied on top by the caller.

use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Storage substrate selected at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process ordered collection, lost on exit
    Memory,
    /// Table-backed store in a SQLite file
    Sqlite,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Memory => f.write_str("memory"),
            Backend::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Randomized relocation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FuzzConfig {
    /// Number of random moves per fuzz run
    pub iterations: usize,
    /// Sampling attempts before a random move gives up
    pub max_attempts: usize,
    /// Fixed RNG seed, random when unset
    pub seed: Option<u64>,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            max_attempts: 1000,
            seed: None,
        }
    }
}

/// Unified configuration for nestree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub backend: Backend,
    /// SQLite database file (sqlite backend only)
    pub db_path: PathBuf,
    /// Name of the root node created for an empty store
    pub root_name: String,
    pub fuzz: FuzzConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            db_path: default_db_path(),
            root_name: "root".into(),
            fuzz: FuzzConfig::default(),
        }
    }
}

fn default_db_path() -> PathBuf {
    ProjectDirs::from("", "", "nestree")
        .map(|dirs| dirs.data_dir().join("tree.db"))
        .unwrap_or_else(|| PathBuf::from("~/.nestree/tree.db"))
}

/// Get the XDG config directory for nestree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "nestree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("nestree.toml"))
}

/// Get the path to the local config file in `dir`.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".nestree.toml")
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.nestree.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        Self::load_from(global.as_deref(), local_dir, true)
    }

    /// Load from explicit sources; used by `load` and by tests that must not
    /// see the user's global config or environment.
    pub fn load_from(
        global_path: Option<&Path>,
        local_dir: Option<&Path>,
        with_env: bool,
    ) -> Result<Self, ApplicationError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("backend", defaults.backend.to_string())
            .map_err(config_err)?
            .set_default("db_path", defaults.db_path.to_string_lossy().to_string())
            .map_err(config_err)?
            .set_default("root_name", defaults.root_name.clone())
            .map_err(config_err)?
            .set_default("fuzz.iterations", defaults.fuzz.iterations as u64)
            .map_err(config_err)?
            .set_default("fuzz.max_attempts", defaults.fuzz.max_attempts as u64)
            .map_err(config_err)?;

        if let Some(path) = global_path {
            builder = builder.add_source(File::from(path).required(false));
        }
        if let Some(dir) = local_dir {
            builder = builder.add_source(File::from(local_config_path(dir)).required(false));
        }
        if with_env {
            builder = builder.add_source(
                Environment::with_prefix("NESTREE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.expand_paths();
        settings.check()?;
        Ok(settings)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in `db_path`.
    fn expand_paths(&mut self) {
        let raw = self.db_path.to_string_lossy().to_string();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.db_path = PathBuf::from(expanded.into_owned());
        }
    }

    fn check(&self) -> Result<(), ApplicationError> {
        if self.root_name.is_empty() || self.root_name.chars().any(char::is_whitespace) {
            return Err(ApplicationError::Config {
                message: format!("invalid root_name \"{}\"", self.root_name),
            });
        }
        if self.fuzz.max_attempts == 0 {
            return Err(ApplicationError::Config {
                message: "fuzz.max_attempts must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# nestree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/nestree/nestree.toml
#   Local:  <dir>/.nestree.toml
#   Env:    NESTREE_* environment variables (NESTREE_FUZZ__SEED=42)

# Storage backend: "sqlite" or "memory"
# backend = "sqlite"

# SQLite database file
# db_path = "~/.local/share/nestree/tree.db"

# Name of the root node created for an empty store
# root_name = "root"

[fuzz]
# Random moves per fuzz run
# iterations = 1000

# Sampling attempts before a random move reports "no legal move"
# max_attempts = 1000

# Fixed RNG seed for reproducible runs
# seed = 42
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load_from(None, None, false).expect("load defaults");
        assert_eq!(settings.backend, Backend::Sqlite);
        assert_eq!(settings.root_name, "root");
        assert_eq!(settings.fuzz, FuzzConfig::default());
        assert!(settings.db_path.ends_with("tree.db"));
    }

    #[test]
    fn given_tilde_in_db_path_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            db_path: PathBuf::from("~/trees/tree.db"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let db = settings.db_path.to_string_lossy();
        assert!(db.starts_with(&home), "db_path should start with home: {}", db);
        assert!(!db.contains('~'));
    }

    #[test]
    fn given_settings_when_serialized_then_template_keys_match() {
        let toml = Settings::default().to_toml().unwrap();
        assert!(toml.contains("backend = \"sqlite\""));
        assert!(toml.contains("[fuzz]"));
        assert!(Settings::template().contains("max_attempts"));
    }
}
