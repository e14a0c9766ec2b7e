//! Network interface abstraction layer
//!
//! This module provides abstractions for the link below the network layer:
//! - The link contract and hardware addresses
//! - Destination resolution strategies
//! - TAP device and in-memory links
//! - The IPv6 endpoint that sends and receives over a link

pub mod ip;
pub mod ipv6;
pub mod link;
pub mod memory;
pub mod resolve;
pub mod tap;

// Re-export commonly used items
pub use ip::IpLayer;
pub use link::{Link, LinkOpener, MacAddr};
pub use memory::{MemoryLink, MemoryOpener};
pub use resolve::{DerivedMulticast, FixedMulticast, Resolver};
pub use tap::{TapLink, TapOpener};
