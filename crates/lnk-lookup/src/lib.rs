//! lnk lookup - service registry client over a coordination store.
//!
//! The registry advertises server instances and resolves service keys into
//! live addresses:
//!
//! - **Path scheme**: maps a service key to its `servers` node
//! - **Address cache**: local, monotonically growing view of each service's
//!   instances with single-flight cold fills
//! - **Watches**: provider change notifications merged into the cache
//! - **Facade**: `lookup`, `registry` and `unregistry`, best effort
//!
//! # Architecture
//!
//! The coordination store (ZooKeeper-like) is reached through the
//! [`CoordinationProvider`] trait. Instances are ephemeral nodes, so the
//! store drops them when their session ends; this client's cache is never
//! pruned and only grows as watch notifications arrive.
//!
//! # Example
//!
//! ```ignore
//! use lnk_api::{Address, Registry, ServiceKey};
//! use lnk_lookup::{RegistryConfig, ZooKeeperRegistry};
//!
//! let registry = ZooKeeperRegistry::new(&RegistryConfig::load()?)?;
//! let key = ServiceKey::new("orders", "query", "1.0", 1);
//! registry.registry(&key, &Address::new("10.0.0.1", 9000)).await;
//! let servers = registry.lookup(&key).await;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod notify;
pub mod path;
pub mod provider;
pub mod registry;
pub mod watch;

// Re-export main types
pub use cache::{AddressCache, CacheChange};
pub use config::{CacheConfig, ConfigError, RegistryConfig};
pub use error::{PathError, ProviderError, RegistryError, Result};
pub use notify::{MessageMode, NotifyEvent, NotifyHandler, NotifyMessage, NullNotifyHandler};
pub use path::{PathBuilder, ServicePath};
pub use provider::{CoordinationProvider, InMemoryProvider, ProviderUri};
pub use registry::ZooKeeperRegistry;
pub use watch::ServersWatcher;
