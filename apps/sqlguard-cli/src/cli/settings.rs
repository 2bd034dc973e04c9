//! # Settings
//!
//! Resolved in this order, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. `~/.sqlguard/config.toml`, or the file passed with `--config`
//! 3. `SQLGUARD_*` environment variables, nested with `__`
//!    (`SQLGUARD_DATABASE__HOST`, `SQLGUARD_LIMITS__MAX_JOINS`)
//!
//! ```toml
//! [database]
//! host = "localhost"
//! port = 3306
//! user = "readonly"
//! database = "classicmodels"
//!
//! [limits]
//! max_query_rows = 1000
//! query_timeout_seconds = 30
//!
//! [logger]
//! level = "INFO"
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::logger::LoggerSettings;
use crate::framework::pipeline::QueryLimits;
use crate::infrastructure::db::ConnectionParameters;
use crate::utilities::constants::{APP_DIR_NAME, CONFIG_FILE, ENV_PREFIX};

#[derive(Deserialize, Debug, Default, Clone)]
pub struct Settings {
    #[serde(default)]
    pub logger: LoggerSettings,
    #[serde(default)]
    pub database: ConnectionParameters,
    #[serde(default)]
    pub limits: QueryLimits,
}

pub fn user_directory() -> PathBuf {
    let mut dir = home::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push(APP_DIR_NAME);
    dir
}

pub fn config_path() -> PathBuf {
    user_directory().join(CONFIG_FILE)
}

/// Reads settings from `config_file` (or the default location) and the
/// environment. A missing default file is not an error; a missing explicit
/// file is.
pub fn read_settings(config_file: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match config_file {
        Some(path) => File::from(path).required(true),
        None => File::from(config_path()).required(false),
    };

    Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
