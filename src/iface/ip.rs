use std::net::Ipv6Addr;
use std::time::Duration;

use crate::config::{OversizePolicy, TransmitConfig};
use crate::error::Result;
use crate::iface::link::{Link, MacAddr};
use crate::iface::resolve::{FixedMulticast, Resolver};
use crate::network::ipv6::MAX_PACKET_LEN;

/// The network layer endpoint of one session.
///
/// Owns the link handle together with everything needed to frame
/// packets for it: our network and hardware addresses, the destination
/// resolver and the limits applied to outgoing payloads.
pub struct IpLayer<L: Link> {
    pub(crate) link: L,
    pub src_addr: Ipv6Addr,
    pub hw_addr: MacAddr,
    pub(crate) resolver: Box<dyn Resolver>,
    pub oversize: OversizePolicy,
    pub transmit: TransmitConfig,
    pub(crate) rx: Vec<u8>,
}

impl<L: Link> IpLayer<L> {
    /// Create an endpoint with fixed multicast resolution and default limits.
    pub fn new(link: L, src_addr: Ipv6Addr, hw_addr: MacAddr) -> Self {
        IpLayer {
            link,
            src_addr,
            hw_addr,
            resolver: Box::new(FixedMulticast),
            oversize: OversizePolicy::default(),
            transmit: TransmitConfig::default(),
            rx: vec![0u8; MAX_PACKET_LEN],
        }
    }

    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_oversize(mut self, oversize: OversizePolicy) -> Self {
        self.oversize = oversize;
        self
    }

    pub fn with_transmit(mut self, transmit: TransmitConfig) -> Self {
        self.transmit = transmit;
        self
    }

    pub fn set_resolver(&mut self, resolver: Box<dyn Resolver>) {
        self.resolver = resolver;
    }

    /// Resolve a destination with the configured strategy.
    pub fn resolve(&self, dst: &Ipv6Addr) -> Option<MacAddr> {
        self.resolver.resolve(dst)
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.link.set_timeout(timeout)?;
        Ok(())
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_link(self) -> L {
        self.link
    }
}
