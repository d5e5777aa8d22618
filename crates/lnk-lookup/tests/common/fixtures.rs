//! Test fixtures for registry integration tests.

use lnk_api::{Address, ServiceKey};
use lnk_lookup::{CoordinationProvider, InMemoryProvider, NotifyMessage};
use std::collections::HashSet;

/// Builder for creating test service keys.
pub struct ServiceBuilder {
    group: String,
    service_id: String,
    version: String,
    protocol: u32,
}

impl ServiceBuilder {
    /// Creates a builder for `group/service_id` at version `1.0`, protocol `1`.
    pub fn new(group: &str, service_id: &str) -> Self {
        Self {
            group: group.to_string(),
            service_id: service_id.to_string(),
            version: "1.0".to_string(),
            protocol: 1,
        }
    }

    /// Sets the interface version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Sets the wire protocol.
    pub fn with_protocol(mut self, protocol: u32) -> Self {
        self.protocol = protocol;
        self
    }

    /// Builds the ServiceKey.
    pub fn build(self) -> ServiceKey {
        ServiceKey::new(self.group, self.service_id, self.version, self.protocol)
    }
}

/// The `orders/query` service used by the end-to-end scenarios.
pub fn orders_query() -> ServiceKey {
    ServiceBuilder::new("orders", "query").build()
}

/// Path of the `orders/query` servers node.
pub const ORDERS_QUERY_PATH: &str = "/lnk/orders/query/1.0/1/servers";

/// Creates `count` addresses `10.0.0.1:port`, `10.0.0.2:port`, ...
pub fn addresses(count: usize, port: u16) -> Vec<Address> {
    (1..=count)
        .map(|i| Address::new(format!("10.0.0.{i}"), port))
        .collect()
}

/// Advertises instances directly in the provider, as another process would.
pub async fn advertise(provider: &InMemoryProvider, path: &str, addrs: &[Address]) {
    for addr in addrs {
        let server = addr.to_string();
        provider
            .push(&NotifyMessage::ephemeral(format!("{path}/{server}"), server))
            .await
            .unwrap();
    }
}

/// Converts addresses to the string set the cache holds.
pub fn server_set(addrs: &[Address]) -> HashSet<String> {
    addrs.iter().map(ToString::to_string).collect()
}
