//! Configuration types for the registry client.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::path::ROOT_NODE;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "registry.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "LNK_REGISTRY_";

/// Errors that can occur when loading registry configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error from the Figment configuration library.
    #[error("configuration error: {0}")]
    Figment(Box<figment::Error>),

    /// The specified configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Registry client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Endpoint URI handed to the coordination provider.
    pub uri: String,
    /// Root node under which every service path is created.
    pub root: String,
    /// Address cache configuration.
    pub cache: CacheConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            uri: "memory://localhost".to_owned(),
            root: ROOT_NODE.to_owned(),
            cache: CacheConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Creates a configuration for the given endpoint URI with default
    /// settings otherwise.
    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from `registry.toml` in the working directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Loads configuration from the specified file path.
    ///
    /// Environment variables prefixed with `LNK_REGISTRY_` override file
    /// settings; nested keys are separated by `__`
    /// (`LNK_REGISTRY_CACHE__REQUERY_EMPTY=true`).
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
    }

    /// Parses configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Toml::string(content))
            .extract()
            .map_err(ConfigError::from)
    }
}

/// Address cache configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Leave the cache entry absent when a cold fill finds no servers, so
    /// the next lookup asks the provider again. When `false` an empty
    /// result is cached like any other.
    pub requery_empty: bool,
}
