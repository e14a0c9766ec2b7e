//! Destination resolution
//!
//! Maps a destination network address to the link address a frame is
//! sent to. The mapping is a strategy so that both the fixed multicast
//! behaviour and the RFC 2464 derivation can be plugged in.

use std::net::Ipv6Addr;

use crate::config::ResolutionMode;
use crate::iface::link::MacAddr;

/// Link address every send goes to under [`FixedMulticast`].
pub const FIXED_MULTICAST: MacAddr = MacAddr([0x33, 0x33, 0x00, 0x00, 0x00, 0x00]);

pub trait Resolver {
    /// None when the destination has no link address.
    fn resolve(&self, dst: &Ipv6Addr) -> Option<MacAddr>;
}

/// Always answers [`FIXED_MULTICAST`], regardless of destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMulticast;

impl Resolver for FixedMulticast {
    fn resolve(&self, _dst: &Ipv6Addr) -> Option<MacAddr> {
        Some(FIXED_MULTICAST)
    }
}

/// 33:33 followed by the last four octets of the destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivedMulticast;

impl Resolver for DerivedMulticast {
    fn resolve(&self, dst: &Ipv6Addr) -> Option<MacAddr> {
        let o = dst.octets();
        Some(MacAddr([0x33, 0x33, o[12], o[13], o[14], o[15]]))
    }
}

impl<F> Resolver for F
where
    F: Fn(&Ipv6Addr) -> Option<MacAddr>,
{
    fn resolve(&self, dst: &Ipv6Addr) -> Option<MacAddr> {
        self(dst)
    }
}

impl ResolutionMode {
    pub fn resolver(self) -> Box<dyn Resolver> {
        match self {
            ResolutionMode::Fixed => Box::new(FixedMulticast),
            ResolutionMode::Derived => Box::new(DerivedMulticast),
        }
    }
}
