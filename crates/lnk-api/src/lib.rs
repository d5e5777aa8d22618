//! Shared vocabulary for lnk service addressing.
//!
//! This crate provides the types RPC callers and registry implementations
//! agree on:
//!
//! - **Address**: a `host:port` pair with a total order
//! - **ServiceKey**: the `(group, service_id, version, protocol)` identity
//! - **Registry**: the best-effort advertise/resolve contract

pub mod address;
pub mod registry;
pub mod service;

pub use address::{Address, AddressParseError};
pub use registry::Registry;
pub use service::ServiceKey;
