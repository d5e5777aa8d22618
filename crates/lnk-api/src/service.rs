//! Logical service identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The `(group, service_id, version, protocol)` tuple identifying a family
/// of interchangeable service endpoints.
///
/// Keys compare by value, field by field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceKey {
    /// Deployment group the service belongs to.
    pub group: String,
    /// Service identifier within the group.
    pub service_id: String,
    /// Interface version.
    pub version: String,
    /// Wire protocol number.
    pub protocol: u32,
}

impl ServiceKey {
    /// Creates a new service key.
    pub fn new(
        group: impl Into<String>,
        service_id: impl Into<String>,
        version: impl Into<String>,
        protocol: u32,
    ) -> Self {
        Self {
            group: group.into(),
            service_id: service_id.into(),
            version: version.into(),
            protocol,
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.group, self.service_id, self.version, self.protocol
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_tuples_are_equal_keys() {
        assert_eq!(
            ServiceKey::new("orders", "query", "1.0", 1),
            ServiceKey::new("orders", "query", "1.0", 1)
        );
    }

    #[test]
    fn any_differing_field_makes_keys_distinct() {
        let base = ServiceKey::new("orders", "query", "1.0", 1);
        assert_ne!(base, ServiceKey::new("billing", "query", "1.0", 1));
        assert_ne!(base, ServiceKey::new("orders", "submit", "1.0", 1));
        assert_ne!(base, ServiceKey::new("orders", "query", "2.0", 1));
        assert_ne!(base, ServiceKey::new("orders", "query", "1.0", 2));
    }

    #[test]
    fn display_joins_fields() {
        let key = ServiceKey::new("orders", "query", "1.0", 1);
        assert_eq!(key.to_string(), "orders/query/1.0/1");
    }
}
