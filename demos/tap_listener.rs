//! A TAP packet listener
//!
//! Prints the header and payload size of every IPv6 packet that arrives
//! on the TAP device. Timeouts only log and keep listening.
//!
//! To run this example:
//!
//! ```sh
//! sudo ip tuntap add dev tap0 mode tap
//! TOY_IPV6_LINK_TIMEOUT_MS=5000 RUST_LOG=info cargo run --example tap_listener
//! ```

use anyhow::{Context, Result};
use toy_ipv6::{NetError, Session, StackConfig};

mod utils;
use utils::network::{bring_up, init_logging};

fn main() -> Result<()> {
    init_logging();

    let config = StackConfig::load().context("failed to load config")?;
    let mut session = Session::open_tap(&config)?;
    bring_up(session.interface())?;
    tracing::info!(iface = session.interface(), "listening");

    let mut packet_count = 0u64;
    loop {
        match session.ip_recv_packet() {
            Ok((header, payload)) => {
                packet_count += 1;
                tracing::info!(
                    packet = packet_count,
                    src = %header.src_addr,
                    dst = %header.dst_addr,
                    next_header = header.next_header,
                    hop_limit = header.hop_limit,
                    len = payload.len(),
                    "packet received"
                );
            }
            Err(e) if e.is_timeout() => tracing::debug!("no packet yet"),
            Err(e @ (NetError::Truncated(_) | NetError::BadVersion(_))) => {
                tracing::warn!(error = %e, "dropping malformed packet");
            }
            Err(e) => return Err(e.into()),
        }
    }
}
