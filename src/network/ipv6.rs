//! IPv6 protocol implementation
//!
//! This module provides the fixed 40-byte IPv6 header codec, the
//! checksum-only pseudo-header and packet construction.
//!
//! Header layout (byte offsets, all multi-byte fields big endian):
//!
//! | Offset   | Field                                               |
//! |----------|-----------------------------------------------------|
//! | `0..4`   | version (4 bits), traffic class (8), flow label (20) |
//! | `4..6`   | payload length                                      |
//! | `6`      | next header                                         |
//! | `7`      | hop limit                                           |
//! | `8..24`  | source address                                      |
//! | `24..40` | destination address                                 |

use std::net::Ipv6Addr;

use byteorder::{BigEndian, ByteOrder};

use crate::network::ones_complement_sum;

/// Width of a network address in bytes.
pub const ADDR_LEN: usize = 16;
pub const IPV6_HEADER_LEN: usize = 40;
pub const IPV6_VERSION: u8 = 6;
pub const DEFAULT_HOP_LIMIT: u8 = 64;
/// Largest payload a single packet may carry.
pub const MAX_DATA_LEN: usize = 4096;
pub const MAX_PACKET_LEN: usize = IPV6_HEADER_LEN + MAX_DATA_LEN;
pub const PSEUDO_HEADER_LEN: usize = 2 * ADDR_LEN + 8;

const FLOW_LABEL_MASK: u32 = 0x000F_FFFF;

/// IPv6 packet header structure
///
/// Represents the fixed 40-byte header as defined in RFC 8200.
/// Extension headers are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Header {
    pub traffic_class: u8,
    pub flow_label: u32, // Only the low 20 bits are encoded
    pub payload_len: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub src_addr: Ipv6Addr,
    pub dst_addr: Ipv6Addr,
}

impl Ipv6Header {
    /// Create a header with traffic class and flow label zeroed and the
    /// default hop limit.
    pub fn new_simple(
        next_header: u8,
        src_addr: Ipv6Addr,
        dst_addr: Ipv6Addr,
        payload_len: u16,
    ) -> Self {
        Ipv6Header {
            traffic_class: 0,
            flow_label: 0,
            payload_len,
            next_header,
            hop_limit: DEFAULT_HOP_LIMIT,
            src_addr,
            dst_addr,
        }
    }

    /// Parse IPv6 header from byte slice
    ///
    /// Returns None if the data is too short or if the version field is not 6
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < IPV6_HEADER_LEN {
            return None;
        }

        if version_of(data) != IPV6_VERSION {
            return None;
        }

        let word = BigEndian::read_u32(&data[0..4]);
        let mut src = [0u8; ADDR_LEN];
        let mut dst = [0u8; ADDR_LEN];
        src.copy_from_slice(&data[8..24]);
        dst.copy_from_slice(&data[24..40]);

        Some(Ipv6Header {
            traffic_class: (word >> 20) as u8,
            flow_label: word & FLOW_LABEL_MASK,
            payload_len: BigEndian::read_u16(&data[4..6]),
            next_header: data[6],
            hop_limit: data[7],
            src_addr: Ipv6Addr::from(src),
            dst_addr: Ipv6Addr::from(dst),
        })
    }

    /// Convert IPv6 header to bytes
    pub fn to_bytes(&self) -> [u8; IPV6_HEADER_LEN] {
        let mut bytes = [0u8; IPV6_HEADER_LEN];
        self.write(&mut bytes);
        bytes
    }

    /// Serialize the header into the first 40 bytes of `buf`.
    ///
    /// Panics if `buf` is shorter than the header.
    pub fn write(&self, buf: &mut [u8]) {
        let word = (u32::from(IPV6_VERSION) << 28)
            | (u32::from(self.traffic_class) << 20)
            | (self.flow_label & FLOW_LABEL_MASK);
        BigEndian::write_u32(&mut buf[0..4], word);
        BigEndian::write_u16(&mut buf[4..6], self.payload_len);
        buf[6] = self.next_header;
        buf[7] = self.hop_limit;
        buf[8..24].copy_from_slice(&self.src_addr.octets());
        buf[24..40].copy_from_slice(&self.dst_addr.octets());
    }

    /// Get payload length
    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }
}

/// Version nibble of a raw packet. Callers check the length first.
pub fn version_of(data: &[u8]) -> u8 {
    data[0] >> 4
}

/// IPv6 next-header constants (IANA protocol numbers)
pub mod protocol {
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

/// Checksum-only header, never transmitted.
///
/// Layout: source, destination, 32-bit upper-layer length, three zero
/// bytes, next header.
#[derive(Debug, Clone, Copy)]
pub struct PseudoHeader {
    pub src_addr: Ipv6Addr,
    pub dst_addr: Ipv6Addr,
    pub upper_layer_len: u32,
    pub next_header: u8,
}

impl PseudoHeader {
    pub fn to_bytes(&self) -> [u8; PSEUDO_HEADER_LEN] {
        let mut bytes = [0u8; PSEUDO_HEADER_LEN];
        bytes[0..16].copy_from_slice(&self.src_addr.octets());
        bytes[16..32].copy_from_slice(&self.dst_addr.octets());
        BigEndian::write_u32(&mut bytes[32..36], self.upper_layer_len);
        // bytes[36..39] stay zero
        bytes[39] = self.next_header;
        bytes
    }
}

pub struct Ipv6Utils {}

impl Ipv6Utils {
    /// Calculate the upper-layer checksum over the pseudo-header and payload
    ///
    /// The accumulator is 16 bits wide throughout. A final sum of 0xFFFF
    /// is returned as is instead of being complemented to zero.
    pub fn calculate_checksum(
        src_addr: Ipv6Addr,
        dst_addr: Ipv6Addr,
        next_header: u8,
        payload: &[u8],
    ) -> u16 {
        let pseudo = PseudoHeader {
            src_addr,
            dst_addr,
            upper_layer_len: payload.len() as u32,
            next_header,
        };

        // The pseudo-header has even length, so the payload words stay aligned.
        let acc = ones_complement_sum(0, &pseudo.to_bytes());
        let acc: u16 = ones_complement_sum(acc, payload);

        if acc == u16::MAX {
            acc
        } else {
            !acc
        }
    }

    /// Create a complete IPv6 packet with payload
    ///
    /// The payload length field is set from `payload`. Anything past
    /// `MAX_DATA_LEN` is dropped.
    pub fn create_packet_with_payload(header: &Ipv6Header, payload: &[u8]) -> Vec<u8> {
        let payload = &payload[..payload.len().min(MAX_DATA_LEN)];

        let mut header = *header;
        header.payload_len = payload.len() as u16;
        let mut packet = Vec::with_capacity(IPV6_HEADER_LEN + payload.len());
        packet.extend_from_slice(&header.to_bytes());
        packet.extend_from_slice(payload);
        packet
    }
}
