//! Configuration loading and management.

mod file;
mod paths;
mod types;
mod validate;

pub use file::{load_config_file, save_config};
pub use paths::{CONFIG_ENV, cache_dir, config_dir, config_file_path, resolve_config_path};
pub use types::{
    CacheConfig, Config, DataConfig, DefaultsConfig, HttpConfig, LocationConfig, RemoteConfig,
};
pub use validate::validate_config;

use crate::error::{Error, Result};

impl LocationConfig {
    /// Parsed deployment timezone.
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone.parse().map_err(|_| Error::InvalidTimezone {
            value: self.timezone.clone(),
        })
    }
}
