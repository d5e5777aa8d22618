//! Service path naming scheme.
//!
//! A service key maps to `/<root>/<group>/<service_id>/<version>/<protocol>/servers`
//! and each advertised instance lives one level below it as `.../servers/<host>:<port>`.

use std::fmt;

use lnk_api::{Address, ServiceKey};

use crate::error::PathError;

/// Default root node.
pub const ROOT_NODE: &str = "lnk";

/// Name of the node whose children are the live instances.
pub const SERVERS_NODE: &str = "servers";

const SEPARATOR: char = '/';

/// Absolute path of a service's `servers` node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServicePath(String);

impl ServicePath {
    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the node advertising a single instance.
    pub fn instance(&self, addr: &Address) -> String {
        format!("{}{SEPARATOR}{addr}", self.0)
    }
}

impl fmt::Display for ServicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ServicePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns true if `path` names a `servers` node.
pub fn is_servers_node(path: &str) -> bool {
    path.rsplit(SEPARATOR).next() == Some(SERVERS_NODE)
}

/// Builds service paths under a fixed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBuilder {
    root: String,
}

impl PathBuilder {
    /// Creates a builder for the given root node name.
    pub fn new(root: impl Into<String>) -> Result<Self, PathError> {
        let root = root.into();
        validate("root", &root)?;
        Ok(Self { root })
    }

    /// Root node name.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Maps a service key to the path of its `servers` node.
    ///
    /// Components must be non-empty and must not contain `/`, which keeps
    /// the mapping injective.
    pub fn build(&self, key: &ServiceKey) -> Result<ServicePath, PathError> {
        validate("group", &key.group)?;
        validate("service_id", &key.service_id)?;
        validate("version", &key.version)?;

        Ok(ServicePath(format!(
            "{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{SERVERS_NODE}",
            self.root, key.group, key.service_id, key.version, key.protocol
        )))
    }
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self {
            root: ROOT_NODE.to_owned(),
        }
    }
}

fn validate(field: &'static str, value: &str) -> Result<(), PathError> {
    if value.is_empty() || value.contains(SEPARATOR) {
        return Err(PathError::InvalidComponent {
            field,
            value: value.to_owned(),
        });
    }
    Ok(())
}
