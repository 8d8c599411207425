//! Evidence extraction from managed-resource documents
//!
//! Two independent extractors work on a single [`ManagedResource`]:
//! - [`identity`] finds name, label and field matches against a target name
//! - [`address`] pulls network addresses out of kind-specific fields
//!
//! Both are pure functions; the scorer and the network index build on them.
//!
//! [`ManagedResource`]: crate::models::ManagedResource

pub mod address;
pub mod identity;

pub use address::{addresses_in_connection_string, extract_addresses, looks_like_ipv4};
pub use identity::{identity_signals, IdentitySignal, SignalKind};
