// Configuration loader
// Loads settings from ~/.trainboard/config.toml, then environment overrides

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::{Config, FileConfig};
use crate::errors;

/// Explicit config file location
pub const CONFIG_ENV: &str = "TRAINBOARD_CONFIG";
pub const BASE_DIR_ENV: &str = "TRAINBOARD_BASE_DIR";
pub const DATABASE_ENV: &str = "TRAINBOARD_DATABASE";

/// Load configuration from the config file and environment
///
/// Order (later wins): defaults, config file, environment variables.
/// A missing config file is not an error.
pub fn load_config() -> Result<Config> {
    let base_dir = std::env::current_dir().context("Could not determine current directory")?;
    let mut config = Config::new(base_dir);

    if let Some(path) = config_file_path() {
        if let Some(file) = read_config_file(&path)? {
            config.merge(file);
            tracing::debug!(path = %path.display(), "Loaded config file");
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// `$TRAINBOARD_CONFIG`, else `~/.trainboard/config.toml`
fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::home_dir().map(|home| home.join(".trainboard/config.toml"))
}

fn read_config_file(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let file: FileConfig = toml::from_str(&contents)
        .map_err(|e| anyhow!(errors::config_parse_error(&e.to_string())))?;

    Ok(Some(file))
}

fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if let Some(base_dir) = non_empty(BASE_DIR_ENV) {
        config.set_base_dir(PathBuf::from(base_dir));
    }
    if let Some(database) = non_empty(DATABASE_ENV) {
        config.database_path = PathBuf::from(database);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_config_creation() {
        let config = Config::new(PathBuf::from("/srv/app"));
        assert_eq!(config.database_path, PathBuf::from("/srv/app/db.sqlite3"));
        assert_eq!(config.route_prefix, "/train");
    }

    #[test]
    fn test_missing_file_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_config_file(&temp_dir.path().join("nope.toml"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_file_values_merge() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "base_dir = \"/data/runs\"\nroute_prefix = \"/jobs\"\n").unwrap();

        let mut config = Config::new(PathBuf::from("/cwd"));
        config.merge(read_config_file(&path).unwrap().unwrap());

        assert_eq!(config.base_dir, PathBuf::from("/data/runs"));
        assert_eq!(config.database_path, PathBuf::from("/data/runs/db.sqlite3"));
        assert_eq!(config.route_prefix, "/jobs");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "log_root = \"/tmp\"\n").unwrap();

        let err = read_config_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (BASE_DIR_ENV, "/env/base"),
            (DATABASE_ENV, "/env/other.sqlite3"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::new(PathBuf::from("/cwd"));
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_dir, PathBuf::from("/env/base"));
        assert_eq!(config.database_path, PathBuf::from("/env/other.sqlite3"));
    }

    #[test]
    fn test_empty_env_ignored() {
        let mut config = Config::new(PathBuf::from("/cwd"));
        apply_env_overrides(&mut config, |_| Some(String::new()));
        assert_eq!(config, Config::new(PathBuf::from("/cwd")));
    }
}
