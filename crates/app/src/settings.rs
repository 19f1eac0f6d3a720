//! Config file resolution
//!
//! An explicit path wins; otherwise `retro.toml` in the platform config
//! directory is used if present; otherwise defaults.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use retro_net::{Result, ServerConfig};

const CONFIG_FILE: &str = "retro.toml";

/// Platform config file location, if the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "retro", "retro-board").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Load the server config from `explicit`, or the default location
pub fn load(explicit: Option<&Path>) -> Result<ServerConfig> {
    if let Some(path) = explicit {
        tracing::info!(path = %path.display(), "Loading config");
        return ServerConfig::load(path);
    }

    load_optional(default_config_path().as_deref())
}

/// Load from `path` if it exists, defaults otherwise
fn load_optional(path: Option<&Path>) -> Result<ServerConfig> {
    match path {
        Some(path) if path.exists() => {
            tracing::info!(path = %path.display(), "Loading config");
            ServerConfig::load(path)
        }
        _ => {
            tracing::info!("No config file, using defaults");
            Ok(ServerConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retro_net::DeleteAuth;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "port = 9100\ndelete_auth = \"session\"\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.delete_auth, DeleteAuth::Session);
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(load(Some(&temp.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_missing_default_falls_back() {
        let temp = TempDir::new().unwrap();
        let config = load_optional(Some(&temp.path().join(CONFIG_FILE))).unwrap();
        assert_eq!(config, ServerConfig::default());

        let config = load_optional(None).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "port = \"not a number\"").unwrap();

        assert!(load_optional(Some(&path)).is_err());
    }
}
