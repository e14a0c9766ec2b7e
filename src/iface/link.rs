//! Link layer contract
//!
//! The network layer never talks to hardware directly. It drives a
//! [`Link`] obtained from a [`LinkOpener`], which frames the bytes it is
//! given and delivers them to a resolved hardware address.

use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::Duration;

pub const MAC_ADDR_LEN: usize = 6;

/// Six-byte link layer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; MAC_ADDR_LEN]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; MAC_ADDR_LEN]);

    pub fn octets(&self) -> [u8; MAC_ADDR_LEN] {
        self.0
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || io::Error::new(io::ErrorKind::InvalidData, format!("bad MAC address: {s}"));

        let mut octets = [0u8; MAC_ADDR_LEN];
        let mut parts = s.trim().split(':');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(MacAddr(octets))
    }
}

/// An open link handle, exclusively owned by one session.
pub trait Link {
    /// Transmit `frame` to `dst`.
    ///
    /// Returns how many bytes of `frame` went out. Fewer than
    /// `frame.len()` is a partial send, zero is a failure.
    fn send(&mut self, dst: MacAddr, frame: &[u8]) -> io::Result<usize>;

    /// Read one frame payload into `buf`. Zero means no frame.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Hardware address of the named interface.
    fn hw_addr(&self, iface: &str) -> io::Result<MacAddr>;

    /// Bound every following send/recv call. `None` blocks indefinitely.
    fn set_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }

    /// Release the handle.
    fn close(self) -> io::Result<()>
    where
        Self: Sized;
}

/// Acquires link handles by interface name.
pub trait LinkOpener {
    type Link: Link;

    fn open(&self, iface: &str) -> io::Result<Self::Link>;
}
