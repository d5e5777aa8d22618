//! Common test utilities for registry integration tests.

#![allow(dead_code)]

pub mod fixtures;

use lnk_lookup::{CacheConfig, CoordinationProvider, InMemoryProvider, RegistryConfig, ZooKeeperRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Registry wired to an in-memory provider the test can inspect.
pub struct TestRegistry {
    pub provider: Arc<InMemoryProvider>,
    pub registry: Arc<ZooKeeperRegistry>,
}

impl TestRegistry {
    /// Creates a test registry with default configuration.
    pub fn new() -> Self {
        Self::with_provider(Arc::new(InMemoryProvider::new()), RegistryConfig::default())
    }

    /// Creates a test registry whose provider delays every call.
    pub fn with_latency(latency: Duration) -> Self {
        Self::with_provider(
            Arc::new(InMemoryProvider::with_latency(latency)),
            RegistryConfig::default(),
        )
    }

    /// Creates a test registry that re-queries the provider after empty fills.
    pub fn requerying_empty() -> Self {
        let config = RegistryConfig {
            cache: CacheConfig {
                requery_empty: true,
            },
            ..RegistryConfig::default()
        };
        Self::with_provider(Arc::new(InMemoryProvider::new()), config)
    }

    /// Creates a second registry process sharing this one's provider.
    pub fn peer(&self) -> Self {
        Self::with_provider(self.provider.clone(), RegistryConfig::default())
    }

    fn with_provider(provider: Arc<InMemoryProvider>, config: RegistryConfig) -> Self {
        let shared: Arc<dyn CoordinationProvider> = provider.clone();
        let registry = ZooKeeperRegistry::with_provider(shared, &config)
            .expect("default configuration is valid");
        Self {
            provider,
            registry: Arc::new(registry),
        }
    }
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
