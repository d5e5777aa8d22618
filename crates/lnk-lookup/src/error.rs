//! Error types for the registry client.

use lnk_api::AddressParseError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while building a service path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A path component is empty or contains the path separator.
    #[error("invalid {field} component: {value:?}")]
    InvalidComponent {
        /// Which identity field was rejected.
        field: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Errors reported by a coordination provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The coordination service could not be reached.
    #[error("connection lost: {0}")]
    ConnectionLoss(String),

    /// The node path is not a valid absolute path.
    #[error("invalid node path: {0}")]
    InvalidPath(String),

    /// The endpoint URI could not be parsed.
    #[error("invalid provider uri: {0}")]
    InvalidUri(String),

    /// No provider is available for the URI scheme.
    #[error("unsupported provider scheme: {0}")]
    UnsupportedScheme(String),

    /// Failure reported by a provider backend.
    #[error("{0}")]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Registry client errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Malformed service identity.
    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// Address that cannot be advertised as a node name.
    #[error("address error: {0}")]
    Address(#[from] AddressParseError),

    /// Coordination service failure.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
