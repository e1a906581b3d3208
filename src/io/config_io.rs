use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Config;

/// Config file name looked up from the working directory upwards
pub const CONFIG_FILE: &str = "threadpad.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Find `threadpad.toml` by walking up from the given directory
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Read a config file. A missing file yields the defaults; a malformed one
/// is an error.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let mut config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    // Paths inside the config are relative to the file itself
    if let Some(dir) = path.parent() {
        config.directory.path = config.directory.path.map(|p| dir.join(p));
        config.log.file = config.log.file.map(|p| dir.join(p));
    }
    Ok(config)
}

/// Load from an explicit path, or discover one from `cwd`
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<Config, ConfigError> {
    match explicit {
        Some(path) => read_config(path),
        None => match discover_config(cwd) {
            Some(path) => read_config(&path),
            None => Ok(Config::default()),
        },
    }
}
