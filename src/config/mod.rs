//! Build configuration: the data model, loading from files and shape checks.
//!
//! A [`BuildConfig`] is sparse. Only the concerns listed under `include` are
//! turned into tasks, and a config without `include` assembles an empty
//! pipeline.

mod model;
mod validate;

use std::fs;

use camino::Utf8Path;

pub use crate::config::model::*;
pub use crate::config::validate::validate;
use crate::error::ConfigError;

static EMPTY_INCLUDE: Include = Include::EMPTY;

/// Effective `include` mapping for an optional config.
pub fn normalize(config: Option<&BuildConfig>) -> &Include {
    config
        .and_then(|config| config.include.as_ref())
        .unwrap_or(&EMPTY_INCLUDE)
}

impl BuildConfig {
    /// Effective `include` mapping, empty when the config has none.
    pub fn include(&self) -> &Include {
        normalize(Some(self))
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a config file, choosing the format by extension.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let text = fs::read_to_string(path) //
            .map_err(|e| ConfigError::Read(path.to_owned(), e))?;

        match path.extension() {
            Some("json") => Self::from_json(&text),
            Some("toml") => Self::from_toml(&text),
            _ => Err(ConfigError::Format(path.to_owned())),
        }
    }
}
