//! Transport layer dispatch
//!
//! The transport protocols themselves live outside this crate. This
//! module defines what a session needs from them:
//! - `Protocol`: the transports a session can be opened for
//! - `Transport`: the handler a session routes send/recv calls to
//! - `DatagramStub`: the declared but unimplemented datagram path
//! - `RawTransport`: hands data straight to the network layer

pub mod raw;
pub mod udp;

use std::fmt;
use std::str::FromStr;

use crate::error::{NetError, Result};
use crate::iface::ip::IpLayer;
use crate::iface::link::Link;
use crate::network::protocol;

// Re-export commonly used items
pub use raw::RawTransport;
pub use udp::DatagramStub;

/// Transports a session can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Stream transport, next header 6.
    Tcp,
    /// Datagram transport, next header 17.
    Udp,
}

impl Protocol {
    /// IANA next-header number.
    pub fn number(self) -> u8 {
        match self {
            Protocol::Tcp => protocol::TCP,
            Protocol::Udp => protocol::UDP,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            protocol::TCP => Some(Protocol::Tcp),
            protocol::UDP => Some(Protocol::Udp),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("TCP"),
            Protocol::Udp => f.write_str("UDP"),
        }
    }
}

impl FromStr for Protocol {
    type Err = NetError;

    /// Accepts "tcp", "udp" (any case) or their protocol numbers.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parsed = if s.eq_ignore_ascii_case("tcp") {
            Some(Protocol::Tcp)
        } else if s.eq_ignore_ascii_case("udp") {
            Some(Protocol::Udp)
        } else {
            s.parse::<u8>().ok().and_then(Protocol::from_number)
        };
        parsed.ok_or_else(|| NetError::UnsupportedProtocol(s.to_string()))
    }
}

/// A transport handler driven by a session.
///
/// `port` is the session's local port.
pub trait Transport<L: Link> {
    fn send(&mut self, ip: &mut IpLayer<L>, port: u16, data: &[u8]) -> Result<usize>;

    fn recv(&mut self, ip: &mut IpLayer<L>, port: u16, buf: &mut [u8]) -> Result<usize>;
}
