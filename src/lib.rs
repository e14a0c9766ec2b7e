//! A minimal IPv6 network layer in Rust
//!
//! This library frames packets and pushes them through a link layer:
//! - IPv6 header encoding and decoding
//! - Pseudo-header Internet checksum
//! - Segmented transmission over links that accept partial frames
//! - Sessions that route sends and receives to a transport handler
//!
//! The link itself is a trait. A TAP device link and an in-memory link
//! are provided.

pub mod config;
pub mod error;
pub mod iface;
pub mod network;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use config::{OversizePolicy, ResolutionMode, StackConfig};
pub use error::NetError;
pub use iface::{IpLayer, Link, LinkOpener, MacAddr, MemoryOpener, TapOpener};
pub use network::ipv6::{Ipv6Header, IPV6_HEADER_LEN, MAX_DATA_LEN, MAX_PACKET_LEN};
pub use session::Session;
pub use transport::{Protocol, RawTransport, Transport};
