//! Network layer protocols implementation
//!
//! This module contains the network layer pieces of the stack:
//! - IPv6: header codec, pseudo-header and packet construction
//! - The one's-complement Internet checksum shared by both

pub mod ipv6;

use byteorder::{BigEndian, ByteOrder};

// Re-export commonly used items
pub use ipv6::{protocol, Ipv6Header, Ipv6Utils, PseudoHeader};

/// Add a 16-bit word to a 16-bit accumulator with end-around carry.
///
/// The overflow test happens on the 16-bit values themselves, the carry
/// is folded straight back into the low bits.
pub fn add_with_carry(acc: u16, word: u16) -> u16 {
    let (sum, carry) = acc.overflowing_add(word);
    // With a carry the wrapped sum is at most 0xFFFE, so this cannot overflow.
    sum + u16::from(carry)
}

/// Fold `data` into a running one's-complement sum.
///
/// Data is read as big-endian 16-bit words. An odd trailing byte is
/// padded with a zero low byte.
pub fn ones_complement_sum(acc: u16, data: &[u8]) -> u16 {
    let mut words = data.chunks_exact(2);
    let mut acc = words
        .by_ref()
        .fold(acc, |acc, word| add_with_carry(acc, BigEndian::read_u16(word)));

    if let [last] = words.remainder() {
        acc = add_with_carry(acc, u16::from(*last) << 8);
    }

    acc
}

/// Calculate Internet checksum
///
/// Algorithm: Sum data in 16-bit chunks, add carry bits to the sum,
/// and return the one's complement of the result.
pub fn checksum(data: &[u8]) -> u16 {
    !ones_complement_sum(0, data)
}
