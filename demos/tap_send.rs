//! Send packets out of a TAP device
//!
//! Opens a session on the configured TAP device and sends one packet
//! larger than a single Ethernet frame, so the link takes it in several
//! partial sends.
//!
//! To run this example:
//!
//! ```sh
//! sudo ip tuntap add dev tap0 mode tap
//! RUST_LOG=debug cargo run --example tap_send -- fd00::2
//! ```
//!
//! Watch the frames with `tcpdump -i tap0 -e ip6`.

use std::net::Ipv6Addr;

use anyhow::{Context, Result};
use toy_ipv6::network::protocol;
use toy_ipv6::{Session, StackConfig};

mod utils;
use utils::network::{bring_up, init_logging};

fn main() -> Result<()> {
    init_logging();

    let config = StackConfig::load().context("failed to load config")?;
    let dst: Ipv6Addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ff02::1".to_string())
        .parse()
        .context("destination must be an IPv6 address")?;

    let mut session = Session::open_tap(&config)?;
    bring_up(session.interface())?;

    let payload: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
    let checksum = session.checksum(dst, protocol::UDP, &payload)?;
    let sent = session.ip_send(dst, protocol::UDP, &payload)?;
    tracing::info!(%dst, sent, checksum = format_args!("{checksum:#06x}"), "payload sent");

    session.close()?;
    Ok(())
}
