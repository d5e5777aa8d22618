//! Registry facade over a coordination provider.

use async_trait::async_trait;
use lnk_api::{Address, Registry, ServiceKey};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cache::AddressCache;
use crate::config::RegistryConfig;
use crate::error::Result;
use crate::notify::{NotifyMessage, NullNotifyHandler};
use crate::path::PathBuilder;
use crate::provider::{self, CoordinationProvider, ProviderUri};
use crate::watch::ServersWatcher;

/// Service registry backed by a ZooKeeper-like coordination store.
///
/// Instances are advertised as ephemeral nodes under
/// `/<root>/<group>/<service_id>/<version>/<protocol>/servers`; lookups are
/// served from a local cache that is filled on first use and grown by watch
/// notifications.
///
/// The `try_*` methods report failures. The [`Registry`] implementation
/// wraps them, logging each failure and returning an empty result.
pub struct ZooKeeperRegistry {
    provider: Arc<dyn CoordinationProvider>,
    paths: PathBuilder,
    cache: Arc<AddressCache>,
}

impl ZooKeeperRegistry {
    /// Creates a registry, connecting a provider for the configured URI.
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let uri: ProviderUri = config.uri.parse()?;
        let provider = provider::connect(&uri)?;
        info!(uri = %uri, "Coordination provider connected");
        Self::with_provider(provider, config)
    }

    /// Creates a registry on top of an existing provider.
    pub fn with_provider(provider: Arc<dyn CoordinationProvider>, config: &RegistryConfig) -> Result<Self> {
        Ok(Self {
            provider,
            paths: PathBuilder::new(config.root.clone())?,
            cache: Arc::new(AddressCache::from_config(&config.cache)),
        })
    }

    /// The local address cache.
    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }

    /// The path builder used for service keys.
    pub fn paths(&self) -> &PathBuilder {
        &self.paths
    }

    /// Resolves `key` into its cached addresses, filling the cache from the
    /// provider on a cold path. Children that are not valid addresses are
    /// skipped.
    pub async fn try_lookup(&self, key: &ServiceKey) -> Result<Vec<Address>> {
        let path = self.paths.build(key)?;
        let provider = &self.provider;
        let servers = self
            .cache
            .fill_if_absent(path.as_str(), || provider.get_children(path.as_str()))
            .await?;

        let mut addresses = BTreeSet::new();
        for server in servers {
            match server.parse::<Address>() {
                Ok(addr) => {
                    addresses.insert(addr);
                }
                Err(e) => warn!(path = %path, server = %server, error = %e, "Skipping malformed server entry"),
            }
        }

        Ok(addresses.into_iter().collect())
    }

    /// Advertises `addr` under `key`.
    ///
    /// The address is checked first so that nothing is pushed for a host
    /// lookups could not parse back. Steps then run in order and stop at the first failure without undoing
    /// earlier ones: persistent `servers` node, ephemeral instance node,
    /// local cache merge, watch installation.
    pub async fn try_registry(&self, key: &ServiceKey, addr: &Address) -> Result<()> {
        let path = self.paths.build(key)?;
        addr.validate()?;
        self.provider
            .push(&NotifyMessage::persistent(path.as_str(), ""))
            .await?;

        let server = addr.to_string();
        let instance = path.instance(addr);
        self.provider
            .push(&NotifyMessage::ephemeral(instance.as_str(), server.as_str()))
            .await?;

        self.cache.merge(path.as_str(), [server]);

        let watcher = ServersWatcher::new(
            path.clone(),
            self.cache.clone(),
            Arc::downgrade(&self.provider),
        );
        self.provider
            .register_handler(path.as_str(), Arc::new(watcher))
            .await?;

        info!(path = %instance, "Registry path success");
        Ok(())
    }

    /// Withdraws `key`: deletes its `servers` node and removes every watch
    /// handler on it.
    ///
    /// Cached addresses are kept.
    pub async fn try_unregistry(&self, key: &ServiceKey) -> Result<()> {
        let path = self.paths.build(key)?;
        self.provider.delete(path.as_str()).await?;
        self.provider
            .unregister(path.as_str(), Arc::new(NullNotifyHandler))
            .await?;

        warn!(path = %path, "Unregistry path success");
        Ok(())
    }
}

impl std::fmt::Debug for ZooKeeperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZooKeeperRegistry")
            .field("provider", &self.provider)
            .field("root", &self.paths.root())
            .field("cached_paths", &self.cache.len())
            .finish()
    }
}

#[async_trait]
impl Registry for ZooKeeperRegistry {
    async fn lookup(&self, key: &ServiceKey) -> Vec<Address> {
        self.try_lookup(key).await.unwrap_or_else(|e| {
            error!(service = %key, error = %e, "Lookup failed");
            Vec::new()
        })
    }

    async fn registry(&self, key: &ServiceKey, addr: &Address) {
        if let Err(e) = self.try_registry(key, addr).await {
            error!(service = %key, addr = %addr, error = %e, "Registry failed");
        }
    }

    async fn unregistry(&self, key: &ServiceKey) {
        if let Err(e) = self.try_unregistry(key).await {
            error!(service = %key, error = %e, "Unregistry failed");
        }
    }
}
