//! Pass-through transport
//!
//! Sends data as the packet payload unchanged, under a fixed next
//! header, to a fixed peer. Stands in for a stream engine where none is
//! wired in.

use std::net::Ipv6Addr;

use crate::error::Result;
use crate::iface::ip::IpLayer;
use crate::iface::link::Link;
use crate::transport::{Protocol, Transport};

#[derive(Debug, Clone, Copy)]
pub struct RawTransport {
    pub peer: Ipv6Addr,
    pub next_header: u8,
}

impl RawTransport {
    pub fn new(peer: Ipv6Addr, protocol: Protocol) -> Self {
        RawTransport {
            peer,
            next_header: protocol.number(),
        }
    }
}

impl<L: Link> Transport<L> for RawTransport {
    fn send(&mut self, ip: &mut IpLayer<L>, _port: u16, data: &[u8]) -> Result<usize> {
        ip.send(self.peer, self.next_header, data)
    }

    fn recv(&mut self, ip: &mut IpLayer<L>, _port: u16, buf: &mut [u8]) -> Result<usize> {
        ip.recv(buf)
    }
}
