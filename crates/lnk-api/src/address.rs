//! Network address of a single service instance.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing a `host:port` string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    /// The input has no `:` separating host and port.
    #[error("missing port separator in address: {0}")]
    MissingPort(String),

    /// The host part is empty.
    #[error("empty host in address: {0}")]
    EmptyHost(String),

    /// The host contains a path separator and cannot be used as a node name.
    #[error("host contains '/': {0}")]
    InvalidHost(String),

    /// The port is not a number in `0..=65535`.
    #[error("invalid port in address: {0}")]
    InvalidPort(String),
}

/// A `(host, port)` pair advertised by a service instance.
///
/// Ordering is by host (lexicographic) and then by port (numeric), which
/// gives lookups a deterministic result order. The string form is exactly
/// `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    /// Creates an address from its parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Creates an address, rejecting hosts that would not survive a
    /// round trip through the `host:port` string form.
    pub fn try_new(host: impl Into<String>, port: u16) -> Result<Self, AddressParseError> {
        let addr = Self::new(host, port);
        addr.validate()?;
        Ok(addr)
    }

    /// Checks that the host is non-empty and free of `/`, so that
    /// `to_string().parse()` yields this address again.
    pub fn validate(&self) -> Result<(), AddressParseError> {
        check_host(&self.host, || self.to_string())
    }

    /// Host name or IP literal.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split on the last separator so bare IPv6 literals keep their colons.
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressParseError::MissingPort(s.to_owned()))?;

        check_host(host, || s.to_owned())?;

        let port = port
            .parse::<u16>()
            .map_err(|_| AddressParseError::InvalidPort(s.to_owned()))?;

        Ok(Self::new(host, port))
    }
}

fn check_host(host: &str, input: impl FnOnce() -> String) -> Result<(), AddressParseError> {
    if host.is_empty() {
        return Err(AddressParseError::EmptyHost(input()));
    }
    if host.contains('/') {
        return Err(AddressParseError::InvalidHost(input()));
    }
    Ok(())
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
