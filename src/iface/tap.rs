//! TAP device link
//!
//! Carries packets in Ethernet II frames over a `tun-tap` TAP device.
//! At most [`ETH_DATA_MAX_LEN`] bytes of a packet fit in one frame, so
//! anything larger is accepted partially and the network layer sends
//! the rest in further calls.
//!
//! Creating the device needs CAP_NET_ADMIN.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use tun_tap::{Iface, Mode};

use crate::iface::link::{Link, LinkOpener, MacAddr};

pub const ETH_HEADER_LEN: usize = 14;
pub const ETH_DATA_MAX_LEN: usize = 1500;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;

/// Opens TAP devices by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct TapOpener;

impl LinkOpener for TapOpener {
    type Link = TapLink;

    fn open(&self, iface: &str) -> io::Result<TapLink> {
        let dev = Iface::without_packet_info(iface, Mode::Tap)?;
        tracing::debug!(iface = dev.name(), "tap device opened");
        Ok(TapLink {
            dev,
            src: None,
            timeout: None,
            frame: vec![0u8; ETH_HEADER_LEN + ETH_DATA_MAX_LEN],
        })
    }
}

pub struct TapLink {
    dev: Iface,
    /// Our own hardware address, looked up on first send.
    src: Option<MacAddr>,
    timeout: Option<Duration>,
    frame: Vec<u8>,
}

impl TapLink {
    pub fn name(&self) -> &str {
        self.dev.name()
    }

    fn src_addr(&mut self) -> io::Result<MacAddr> {
        if let Some(src) = self.src {
            return Ok(src);
        }
        let src = self.hw_addr(self.dev.name())?;
        self.src = Some(src);
        Ok(src)
    }
}

impl Link for TapLink {
    fn send(&mut self, dst: MacAddr, data: &[u8]) -> io::Result<usize> {
        let src = self.src_addr()?;
        let frame_len = encode_frame(dst, src, data, &mut self.frame);

        wait_for(self.dev.as_raw_fd(), libc::POLLOUT, self.timeout)?;
        let written = self.dev.send(&self.frame[..frame_len])?;
        Ok(written.saturating_sub(ETH_HEADER_LEN))
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            wait_for(self.dev.as_raw_fd(), libc::POLLIN, self.timeout)?;
            let n = self.dev.recv(&mut self.frame)?;
            if n == 0 {
                return Ok(0);
            }
            let Some(payload) = parse_frame(&self.frame[..n]) else {
                tracing::trace!(len = n, "skipping non-IPv6 frame");
                continue;
            };

            let len = payload.len().min(buf.len());
            buf[..len].copy_from_slice(&payload[..len]);
            return Ok(len);
        }
    }

    fn hw_addr(&self, iface: &str) -> io::Result<MacAddr> {
        std::fs::read_to_string(format!("/sys/class/net/{iface}/address"))?.parse()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        tracing::debug!(iface = self.dev.name(), "tap device closed");
        drop(self.dev);
        Ok(())
    }
}

/// Write an Ethernet II frame carrying as much of `data` as fits.
///
/// At most `ETH_DATA_MAX_LEN` bytes of `data` go in. Returns the frame
/// length. `out` must hold `ETH_HEADER_LEN + ETH_DATA_MAX_LEN` bytes.
pub fn encode_frame(dst: MacAddr, src: MacAddr, data: &[u8], out: &mut [u8]) -> usize {
    let len = data.len().min(ETH_DATA_MAX_LEN);
    out[0..6].copy_from_slice(&dst.octets());
    out[6..12].copy_from_slice(&src.octets());
    BigEndian::write_u16(&mut out[12..14], ETHERTYPE_IPV6);
    out[ETH_HEADER_LEN..ETH_HEADER_LEN + len].copy_from_slice(&data[..len]);
    ETH_HEADER_LEN + len
}

/// Payload of an IPv6 Ethernet frame. None for runts and other ethertypes.
pub fn parse_frame(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < ETH_HEADER_LEN || BigEndian::read_u16(&frame[12..14]) != ETHERTYPE_IPV6 {
        return None;
    }
    Some(&frame[ETH_HEADER_LEN..])
}

/// Block until `fd` is ready for `events`, or fail with TimedOut.
fn wait_for(fd: RawFd, events: libc::c_short, timeout: Option<Duration>) -> io::Result<()> {
    let Some(timeout) = timeout else {
        return Ok(());
    };

    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    let ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

    // SAFETY: `pfd` is a valid pollfd and the count is 1.
    match unsafe { libc::poll(&mut pfd, 1, ms) } {
        -1 => Err(io::Error::last_os_error()),
        0 => Err(io::Error::new(io::ErrorKind::TimedOut, "link timed out")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ipv6::MAX_PACKET_LEN;

    const DST: MacAddr = MacAddr([0x33, 0x33, 0, 0, 0, 0]);
    const SRC: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x07]);

    fn frame_buf() -> Vec<u8> {
        vec![0u8; ETH_HEADER_LEN + ETH_DATA_MAX_LEN]
    }

    #[test]
    fn test_frame_header_bytes() {
        let mut out = frame_buf();
        let len = encode_frame(DST, SRC, b"abc", &mut out);

        assert_eq!(len, ETH_HEADER_LEN + 3);
        assert_eq!(&out[0..6], &DST.octets());
        assert_eq!(&out[6..12], &SRC.octets());
        assert_eq!(&out[12..14], &[0x86u8, 0xDD]);
        assert_eq!(&out[ETH_HEADER_LEN..len], b"abc");
    }

    #[test]
    fn test_large_packet_is_capped_per_frame() {
        let mut out = frame_buf();
        let packet: Vec<u8> = (0..MAX_PACKET_LEN).map(|i| i as u8).collect();

        let len = encode_frame(DST, SRC, &packet, &mut out);
        assert_eq!(len - ETH_HEADER_LEN, ETH_DATA_MAX_LEN);
        assert_eq!(&out[ETH_HEADER_LEN..len], &packet[..ETH_DATA_MAX_LEN]);
    }

    #[test]
    fn test_parse_returns_payload() {
        let mut out = frame_buf();
        let len = encode_frame(DST, SRC, b"payload", &mut out);
        assert_eq!(parse_frame(&out[..len]), Some(&b"payload"[..]));
    }

    #[test]
    fn test_parse_rejects_runts_and_other_ethertypes() {
        let mut out = frame_buf();
        let len = encode_frame(DST, SRC, b"x", &mut out);

        assert_eq!(parse_frame(&out[..ETH_HEADER_LEN - 1]), None);

        out[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
        assert_eq!(parse_frame(&out[..len]), None);
    }
}
