//! UDP (User Datagram Protocol) placeholder
//!
//! The datagram transport is declared but not implemented. Sessions
//! opened for UDP route here and every call fails without touching the
//! link.

use crate::error::{NetError, Result};
use crate::iface::ip::IpLayer;
use crate::iface::link::Link;
use crate::transport::{Protocol, Transport};

#[derive(Debug, Clone, Copy, Default)]
pub struct DatagramStub;

impl<L: Link> Transport<L> for DatagramStub {
    fn send(&mut self, _ip: &mut IpLayer<L>, port: u16, data: &[u8]) -> Result<usize> {
        tracing::debug!(port, len = data.len(), "datagram send not implemented");
        Err(NetError::Unimplemented(Protocol::Udp))
    }

    fn recv(&mut self, _ip: &mut IpLayer<L>, port: u16, _buf: &mut [u8]) -> Result<usize> {
        tracing::debug!(port, "datagram recv not implemented");
        Err(NetError::Unimplemented(Protocol::Udp))
    }
}
