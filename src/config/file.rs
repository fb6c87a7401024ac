//! JSON config file: monitor definitions and named modes

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::types::Position;

/// Top-level config file. Map order follows the file so mode indices are stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub monitors: IndexMap<String, MonitorDefinition>,
    #[serde(default)]
    pub modes: IndexMap<String, ModeDefinition>,
}

/// A physical monitor, keyed by alias in [`ConfigFile::monitors`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorDefinition {
    /// Stable user-facing identifier
    pub serial: String,
    /// Third `#` field of the platform device path
    pub uid: String,
    /// Display name for logs and listings
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModeDefinition {
    #[serde(default)]
    pub displays: Vec<DisplayEntry>,
}

/// One monitor's role in a mode. Geometry is only required when enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEntry {
    /// Alias into [`ConfigFile::monitors`]
    pub monitor: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl ConfigFile {
    /// Config path: explicit argument, then next to the executable, then the user config dir
    pub fn locate(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }

        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(crate::constants::config::FILENAME)));
        if let Some(path) = beside_exe.filter(|p| p.exists()) {
            return path;
        }

        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Read and parse without semantic validation
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read { path: path.to_path_buf(), source },
        })?;

        let config = Self::parse(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path: path.to_path_buf(), source },
            other => other,
        })?;

        info!(
            path = %path.display(),
            monitors = config.monitors.len(),
            modes = config.modes.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Read, parse and validate
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        debug!("config passed validation");
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })
    }
}
