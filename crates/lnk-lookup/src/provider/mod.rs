//! Coordination provider abstraction.
//!
//! A provider is the client of a hierarchical coordination store
//! (ZooKeeper-like): persistent and ephemeral nodes, child listing and
//! change-watch callbacks. The registry only depends on this trait.

mod memory;
mod uri;

pub use memory::InMemoryProvider;
pub use uri::ProviderUri;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ProviderError;
use crate::notify::{NotifyHandler, NotifyMessage};

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Client of a hierarchical coordination store.
#[async_trait]
pub trait CoordinationProvider: Send + Sync + std::fmt::Debug {
    /// Creates or updates the node at `message.path` with `message.data`,
    /// persisting it according to `message.mode`. Missing parents are
    /// created as persistent nodes.
    async fn push(&self, message: &NotifyMessage) -> Result<()>;

    /// Deletes the node at `path` together with its subtree.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Lists the names of the immediate children of `path`.
    ///
    /// A missing node yields an empty list.
    async fn get_children(&self, path: &str) -> Result<Vec<String>>;

    /// Registers a change-watch handler on `path`.
    async fn register_handler(&self, path: &str, handler: Arc<dyn NotifyHandler>) -> Result<()>;

    /// Removes `handler` from `path`. A handler whose
    /// [`matches_any`](NotifyHandler::matches_any) is true removes every
    /// handler at `path`.
    async fn unregister(&self, path: &str, handler: Arc<dyn NotifyHandler>) -> Result<()>;
}

/// Creates a provider for the given endpoint URI.
///
/// Only the `memory` scheme is built in; clients for external coordination
/// services are passed to the registry directly.
pub fn connect(uri: &ProviderUri) -> Result<Arc<dyn CoordinationProvider>> {
    match uri.scheme() {
        "memory" => Ok(Arc::new(InMemoryProvider::from_uri(uri)?)),
        other => Err(ProviderError::UnsupportedScheme(other.to_owned())),
    }
}
