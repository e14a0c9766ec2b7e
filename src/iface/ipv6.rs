//! Sending and receiving IPv6 packets over the endpoint's link.

use std::net::Ipv6Addr;
use std::thread;

use crate::config::OversizePolicy;
use crate::error::{NetError, Result};
use crate::iface::ip::IpLayer;
use crate::iface::link::Link;
use crate::network::ipv6::{
    version_of, Ipv6Header, Ipv6Utils, IPV6_HEADER_LEN, IPV6_VERSION, MAX_DATA_LEN,
    MAX_PACKET_LEN,
};

impl<L: Link> IpLayer<L> {
    /// Apply the oversize policy to an outgoing payload.
    fn clamp<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        if data.len() <= MAX_DATA_LEN {
            return Ok(data);
        }
        match self.oversize {
            OversizePolicy::Truncate => {
                tracing::warn!(
                    len = data.len(),
                    max = MAX_DATA_LEN,
                    "payload truncated to maximum"
                );
                Ok(&data[..MAX_DATA_LEN])
            }
            OversizePolicy::Reject => Err(NetError::PayloadTooLarge(data.len())),
        }
    }

    /// Build header plus payload for `dst`.
    pub fn build_packet(&self, dst: Ipv6Addr, next_header: u8, data: &[u8]) -> Result<Vec<u8>> {
        let data = self.clamp(data)?;
        let header = Ipv6Header::new_simple(next_header, self.src_addr, dst, data.len() as u16);
        Ok(Ipv6Utils::create_packet_with_payload(&header, data))
    }

    /// Send `data` to `dst` as one packet.
    ///
    /// Returns the number of payload bytes sent, which is the clamped
    /// length when the payload was truncated.
    pub fn send(&mut self, dst: Ipv6Addr, next_header: u8, data: &[u8]) -> Result<usize> {
        let packet = self.build_packet(dst, next_header, data)?;
        self.send_packet(dst, packet)
    }

    /// Push an already built packet through the link.
    ///
    /// The link may take less than offered. Whatever payload it did take
    /// is cut out, the unsent tail slides up behind the header and the
    /// header goes out again with the next call. Calls that do not get
    /// past the header count as stalls and are retried with backoff up
    /// to `transmit.max_stalls` times in a row.
    pub fn send_packet(&mut self, dst: Ipv6Addr, mut packet: Vec<u8>) -> Result<usize> {
        if packet.len() < IPV6_HEADER_LEN {
            return Err(NetError::Truncated(packet.len()));
        }
        if packet.len() > MAX_PACKET_LEN {
            return Err(NetError::PayloadTooLarge(packet.len() - IPV6_HEADER_LEN));
        }

        let hw_dst = self.resolver.resolve(&dst).ok_or(NetError::Unresolved(dst))?;
        let total = packet.len() - IPV6_HEADER_LEN;

        // Payload bytes the link has taken so far. Never derived from the
        // frame sizes the link reports, which include the header.
        let mut payload_sent = 0usize;
        let mut stalls = 0u32;
        let mut backoff = self.transmit.backoff();

        loop {
            let reported = self.link.send(hw_dst, &packet)?;
            let accepted = reported.min(packet.len());

            if accepted == packet.len() {
                tracing::debug!(%dst, %hw_dst, len = total, "packet sent");
                return Ok(total);
            }

            if reported == 0 {
                tracing::warn!(%dst, sent = payload_sent, total, "link failed mid-packet");
                return Err(NetError::LinkFailed {
                    sent: payload_sent,
                    total,
                });
            }

            let progress = accepted.saturating_sub(IPV6_HEADER_LEN);
            if progress == 0 {
                stalls += 1;
                if stalls > self.transmit.max_stalls {
                    tracing::warn!(%dst, stalls, sent = payload_sent, total, "giving up on stalled link");
                    return Err(NetError::RetriesExhausted {
                        attempts: stalls,
                        sent: payload_sent,
                        total,
                    });
                }
                tracing::debug!(reported, stalls, ?backoff, "link took no payload, backing off");
                if !backoff.is_zero() {
                    thread::sleep(backoff);
                }
                backoff = (backoff * 2).min(self.transmit.max_backoff());
                continue;
            }

            stalls = 0;
            backoff = self.transmit.backoff();
            payload_sent += progress;

            // Slide the unsent tail up against the header.
            packet.copy_within(IPV6_HEADER_LEN + progress.., IPV6_HEADER_LEN);
            packet.truncate(packet.len() - progress);

            tracing::trace!(progress, payload_sent, remaining = total - payload_sent, "partial send");
        }
    }

    /// Receive one packet and copy its payload into `buf`.
    ///
    /// Each link frame is taken to hold exactly one header and its
    /// payload. The payload length is the frame length minus the header.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.recv_frame()?;
        let len = n - IPV6_HEADER_LEN;
        if buf.len() < len {
            return Err(NetError::BufferTooSmall {
                need: len,
                have: buf.len(),
            });
        }
        buf[..len].copy_from_slice(&self.rx[IPV6_HEADER_LEN..n]);
        Ok(len)
    }

    /// Receive one packet, returning its decoded header and payload.
    pub fn recv_packet(&mut self) -> Result<(Ipv6Header, Vec<u8>)> {
        let n = self.recv_frame()?;
        let header = Ipv6Header::from_bytes(&self.rx[..n]).ok_or(NetError::Truncated(n))?;
        Ok((header, self.rx[IPV6_HEADER_LEN..n].to_vec()))
    }

    /// Read a frame into `rx` and check it carries a whole IPv6 header.
    fn recv_frame(&mut self) -> Result<usize> {
        // A link may report more than it could have written.
        let n = self.link.recv(&mut self.rx)?.min(self.rx.len());
        if n == 0 {
            return Err(NetError::NoFrame);
        }
        if n < IPV6_HEADER_LEN {
            return Err(NetError::Truncated(n));
        }
        let version = version_of(&self.rx);
        if version != IPV6_VERSION {
            return Err(NetError::BadVersion(version));
        }
        tracing::trace!(len = n, "frame received");
        Ok(n)
    }

    /// Upper-layer checksum of `data` from us to `dst`.
    pub fn checksum(&self, dst: Ipv6Addr, next_header: u8, data: &[u8]) -> Result<u16> {
        let data = self.clamp(data)?;
        Ok(Ipv6Utils::calculate_checksum(self.src_addr, dst, next_header, data))
    }
}
