// Configuration loading and parsing (awards.toml, server.toml).

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use oscar_core::catalog::{Catalog, CatalogError, CategorySpec};
use oscar_core::model::NominationType;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub awards: AwardsConfig,
    pub ws_port: u16,
    pub db_path: String,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// awards.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[awards]` table in awards.toml.
#[derive(Debug, Clone, Deserialize)]
struct AwardsFile {
    awards: AwardsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwardsConfig {
    /// Default `year` selector for queries and prediction runs.
    pub current_year: i32,
    /// Precursor venues in display order.
    pub venues: Vec<String>,
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub nomination_type: NominationType,
}

impl AwardsConfig {
    /// Build the validated venue/category catalog.
    pub fn catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::new(
            self.venues.clone(),
            self.categories
                .iter()
                .map(|c| CategorySpec {
                    name: c.name.clone(),
                    nomination_type: c.nomination_type,
                })
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// server.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire server.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ServerFile {
    websocket: WebsocketSection,
    database: DatabaseSection,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// CSV seed files imported into an empty database.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub nominations: String,
    pub award_wins: String,
    pub references: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/awards.toml` and
/// `config/server.toml`, relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let awards_path = config_dir.join("awards.toml");
    let awards_text = read_file(&awards_path)?;
    let awards_file: AwardsFile =
        toml::from_str(&awards_text).map_err(|e| ConfigError::ParseError {
            path: awards_path.clone(),
            source: e,
        })?;

    let server_path = config_dir.join("server.toml");
    let server_text = read_file(&server_path)?;
    let server_file: ServerFile =
        toml::from_str(&server_text).map_err(|e| ConfigError::ParseError {
            path: server_path.clone(),
            source: e,
        })?;

    let config = Config {
        awards: awards_file.awards,
        ws_port: server_file.websocket.port,
        db_path: server_file.database.path,
        data_paths: server_file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the crate root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let awards = &config.awards;

    if awards.current_year <= 0 {
        return Err(ConfigError::ValidationError {
            field: "awards.current_year".into(),
            message: format!("must be > 0, got {}", awards.current_year),
        });
    }

    if awards.venues.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "awards.venues".into(),
            message: "must list at least one venue".into(),
        });
    }

    let mut seen = HashSet::new();
    for venue in &awards.venues {
        if venue.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: "awards.venues".into(),
                message: "venue names must not be blank".into(),
            });
        }
        if !seen.insert(venue.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "awards.venues".into(),
                message: format!("duplicate venue {venue:?}"),
            });
        }
    }

    let mut seen = HashSet::new();
    for category in &awards.categories {
        if !seen.insert(category.name.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "awards.categories".into(),
                message: format!("duplicate category {:?}", category.name),
            });
        }
    }

    if config.ws_port == 0 {
        return Err(ConfigError::ValidationError {
            field: "websocket.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
