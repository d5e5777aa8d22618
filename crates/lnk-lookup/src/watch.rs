//! Watch handler that folds provider child notifications into the address cache.

use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

use crate::cache::AddressCache;
use crate::error::Result;
use crate::notify::{NotifyEvent, NotifyHandler, NotifyMessage};
use crate::path::{is_servers_node, ServicePath};
use crate::provider::CoordinationProvider;

/// Watches a service's `servers` node and merges its children into the cache.
///
/// Addresses are never removed: an instance whose ephemeral node disappears
/// stays cached until the process restarts.
#[derive(Debug)]
pub struct ServersWatcher {
    path: ServicePath,
    cache: Arc<AddressCache>,
    // The provider owns its handlers, so a strong reference would be a cycle.
    provider: Weak<dyn CoordinationProvider>,
}

impl ServersWatcher {
    /// Creates a watcher for `path`.
    pub fn new(
        path: ServicePath,
        cache: Arc<AddressCache>,
        provider: Weak<dyn CoordinationProvider>,
    ) -> Self {
        Self {
            path,
            cache,
            provider,
        }
    }

    /// Watched path.
    pub fn path(&self) -> &ServicePath {
        &self.path
    }
}

#[async_trait]
impl NotifyHandler for ServersWatcher {
    fn receive_child_notify(&self) -> bool {
        true
    }

    async fn handle_notify(&self, event: NotifyEvent, message: &NotifyMessage) -> Result<()> {
        let path = message.path.as_str();
        if !is_servers_node(path) {
            debug!(watched = %self.path, path, ?event, "Ignoring notification");
            return Ok(());
        }

        let Some(provider) = self.provider.upgrade() else {
            debug!(watched = %self.path, "Provider dropped, ignoring notification");
            return Ok(());
        };

        info!(path, ?event, "Handling notification");
        let servers = provider.get_children(path).await?;
        if servers.is_empty() {
            info!(path, "Notified server list is empty");
            return Ok(());
        }

        info!(path, servers = ?servers, "Notified server list");
        self.cache.merge(path, servers);
        Ok(())
    }
}
