// Configuration structs

use serde::Deserialize;
use std::path::PathBuf;

use crate::runs::routes::DEFAULT_ROUTE_PREFIX;
use crate::runs::{LogLayout, PathRoutes};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root of the log layout (`<base_dir>/train/...`)
    pub base_dir: PathBuf,

    /// SQLite database holding users and runs
    pub database_path: PathBuf,

    /// Mount point of the run detail pages (default: /train)
    pub route_prefix: String,
}

impl Config {
    pub fn new(base_dir: PathBuf) -> Self {
        let database_path = base_dir.join("db.sqlite3");
        Self {
            base_dir,
            database_path,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
        }
    }

    pub fn layout(&self) -> LogLayout {
        LogLayout::new(&self.base_dir)
    }

    pub fn routes(&self) -> PathRoutes {
        PathRoutes::new(&self.route_prefix)
    }

    /// Move the base directory. A database still at its default location
    /// moves along with it.
    pub fn set_base_dir(&mut self, base_dir: PathBuf) {
        if self.database_path == self.base_dir.join("db.sqlite3") {
            self.database_path = base_dir.join("db.sqlite3");
        }
        self.base_dir = base_dir;
    }

    /// Apply values from a config file; keys left out keep their current value
    pub(super) fn merge(&mut self, file: FileConfig) {
        if let Some(base_dir) = file.base_dir {
            self.set_base_dir(base_dir);
        }
        if let Some(database_path) = file.database_path {
            self.database_path = database_path;
        }
        if let Some(route_prefix) = file.route_prefix {
            self.route_prefix = route_prefix;
        }
    }
}

/// On-disk shape of `config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FileConfig {
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub route_prefix: Option<String>,
}
