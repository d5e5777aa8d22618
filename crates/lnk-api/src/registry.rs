//! Service registry contract used by RPC callers.
//!
//! A registry advertises server instances under a [`ServiceKey`] and
//! resolves a key back into the live instance addresses.

use async_trait::async_trait;

use crate::{Address, ServiceKey};

/// Registry for advertising and resolving service instances.
///
/// Every operation is best effort: implementations log failures internally
/// and return an empty result instead of an error, so a caller cannot tell
/// "no instances" apart from "resolution failed".
#[async_trait]
pub trait Registry: Send + Sync {
    /// Resolves a service key into its known instance addresses, sorted by
    /// host and then port.
    ///
    /// Returns an empty list when no instance is known or resolution fails.
    async fn lookup(&self, key: &ServiceKey) -> Vec<Address>;

    /// Advertises `addr` as a live instance of the service.
    async fn registry(&self, key: &ServiceKey, addr: &Address);

    /// Withdraws the service's advertisement.
    async fn unregistry(&self, key: &ServiceKey);
}
