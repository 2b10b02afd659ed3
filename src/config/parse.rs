//! Configuration file parsing and discovery

use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult, SprocketError};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["sprocket.yml", "sprocket.yaml"];

/// Environment variable overriding `server.host`
pub const HOST_ENV: &str = "SPROCKET_HOST";

/// Environment variable overriding `server.port`
pub const PORT_ENV: &str = "SPROCKET_PORT";

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, SprocketError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_config(&contents)
}

/// Parse configuration from a string
///
/// An empty document yields the default configuration.
pub fn parse_config(yaml: &str) -> Result<Config, SprocketError> {
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Load the configuration and the project root it applies to
///
/// With an explicit path the file must exist. Otherwise the nearest
/// `sprocket.yml` above the current directory is used, and when there is
/// none the defaults apply with the current directory as root.
pub fn load_config(explicit: Option<&Path>) -> Result<(Config, PathBuf), SprocketError> {
    let (mut config, root) = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.display().to_string()).into());
            }
            (parse_config_file(path)?, project_root(path))
        }
        None => match find_config_file() {
            Ok(path) => (parse_config_file(&path)?, project_root(&path)),
            Err(ConfigError::NotFound(_)) => (Config::default(), env::current_dir()?),
            Err(e) => return Err(e.into()),
        },
    };

    load_env_file(&root)?;
    apply_server_overrides(
        &mut config,
        env::var(HOST_ENV).ok(),
        env::var(PORT_ENV).ok(),
    )?;

    Ok((config, root))
}

/// Directory a config file lives in
fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Load `.env` from the project root into the process environment
fn load_env_file(root: &Path) -> ConfigResult<()> {
    let env_file = root.join(".env");
    if env_file.is_file() {
        dotenvy::from_path(&env_file).map_err(|e| ConfigError::Env(e.to_string()))?;
    }
    Ok(())
}

/// Apply host/port overrides taken from the environment
pub fn apply_server_overrides(
    config: &mut Config,
    host: Option<String>,
    port: Option<String>,
) -> ConfigResult<()> {
    if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
        config.server.host = host.trim().to_string();
    }

    if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
        config.server.port = port.trim().parse().map_err(|_| {
            ConfigError::Invalid(format!("{} must be a port number, got '{}'", PORT_ENV, port))
        })?;
    }

    Ok(())
}
