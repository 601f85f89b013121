//! Locating, reading and seeding the config file.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use quill_common::ConfigError;
use tracing::{debug, info};

use crate::schema::QuillConfig;

use super::template::default_config_toml;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "QUILL_CONFIG";

/// Where the config lives: `$QUILL_CONFIG` when set, else
/// `<config dir>/quill/config.toml`.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    resolve_config_path(std::env::var_os(CONFIG_ENV), dirs::config_dir())
}

pub(crate) fn resolve_config_path(
    explicit: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    config_dir
        .map(|dir| dir.join("quill").join("config.toml"))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Parse a config file. Missing sections and fields take their defaults;
/// values are not validated here.
pub fn read_config(path: &Path) -> Result<QuillConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("cannot read {}: {e}", path.display())),
    })?;

    let config = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;
    debug!(path = %path.display(), "config read");
    Ok(config)
}

/// Write the commented template to `path` unless a file is already there.
/// Returns whether a file was written.
pub fn seed_config(path: &Path) -> Result<bool, ConfigError> {
    let write_err =
        |e: io::Error| ConfigError::ParseError(format!("cannot write {}: {e}", path.display()));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(write_err(e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(write_err)?;

    info!(path = %path.display(), "wrote default config");
    Ok(true)
}

/// Read the config at [`config_path`], seeding it with defaults on first run.
pub fn load_default() -> Result<QuillConfig, ConfigError> {
    let path = config_path()?;
    match read_config(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            seed_config(&path)?;
            Ok(QuillConfig::default())
        }
        other => other,
    }
}
