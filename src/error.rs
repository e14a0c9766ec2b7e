//! Error types for the network layer
//!
//! Byte counts come back as `Ok(n)`, where `Ok(0)` is a real zero-byte
//! transfer. Every failure is one of these errors.

use std::io;
use std::net::Ipv6Addr;

use crate::network::ipv6::{IPV6_HEADER_LEN, MAX_DATA_LEN};
use crate::transport::Protocol;

/// Errors raised by the session, the IP layer and the link adapters.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("failed to open link on {iface}: {source}")]
    LinkOpen { iface: String, source: io::Error },

    #[error("failed to read hardware address of {iface}: {source}")]
    HwAddr { iface: String, source: io::Error },

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("{0} transport is not implemented")]
    Unimplemented(Protocol),

    #[error("no {0} transport attached to the session")]
    NoTransport(Protocol),

    #[error("no link address for {0}")]
    Unresolved(Ipv6Addr),

    #[error("payload length {0} exceeds maximum {}", MAX_DATA_LEN)]
    PayloadTooLarge(usize),

    #[error("link failed after {sent} of {total} payload bytes")]
    LinkFailed { sent: usize, total: usize },

    #[error("link stalled {attempts} times after {sent} of {total} payload bytes")]
    RetriesExhausted {
        attempts: u32,
        sent: usize,
        total: usize,
    },

    #[error("link returned no frame")]
    NoFrame,

    #[error("frame of {0} bytes is shorter than the {} byte header", IPV6_HEADER_LEN)]
    Truncated(usize),

    #[error("unexpected IP version {0}")]
    BadVersion(u8),

    #[error("receive buffer too small: need {need}, have {have}")]
    BufferTooSmall { need: usize, have: usize },

    #[error("link I/O error: {0}")]
    Io(#[from] io::Error),
}

impl NetError {
    /// True when the error came from a link call that ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, NetError::Io(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock))
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
