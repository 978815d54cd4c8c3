// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{load_config, BASE_DIR_ENV, CONFIG_ENV, DATABASE_ENV};
pub use settings::Config;
