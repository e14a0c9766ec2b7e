//! Segmented transmission over an in-memory link
//!
//! The link accepts only a few bytes past the header per call, so one
//! packet goes out in many partial sends. The frames are then stitched
//! back together and compared with the original payload.
//!
//! ```sh
//! RUST_LOG=trace cargo run --example memory_link_demo
//! ```

use std::net::Ipv6Addr;

use anyhow::{ensure, Result};
use toy_ipv6::network::protocol;
use toy_ipv6::{MacAddr, MemoryOpener, Protocol, RawTransport, Session, StackConfig, IPV6_HEADER_LEN};

mod utils;
use utils::network::init_logging;

fn main() -> Result<()> {
    init_logging();

    let opener = MemoryOpener::new(MacAddr([0x02, 0, 0, 0, 0, 0x01]));
    opener.wire().per_call_cap = Some(IPV6_HEADER_LEN + 16);

    let mut config = StackConfig::default();
    config.session.interface = "mem0".to_string();
    config.session.source = "fd00::1".parse()?;
    config.session.port = 9000;

    let peer: Ipv6Addr = "fd00::2".parse()?;
    let mut session =
        Session::open(&opener, &config)?.with_stream(RawTransport::new(peer, Protocol::Tcp));

    let payload = b"a payload long enough to need several partial sends on a tiny link";
    let sent = session.send(payload)?;
    let checksum = session.checksum(peer, protocol::TCP, payload)?;

    let frames = opener.sent();
    let rebuilt: Vec<u8> = frames
        .iter()
        .flat_map(|f| f.bytes[IPV6_HEADER_LEN..].iter().copied())
        .collect();
    ensure!(rebuilt == payload, "payload corrupted in transit");

    println!(
        "sent {sent} bytes in {} link calls, checksum {checksum:#06x}",
        frames.len()
    );

    session.close()?;
    ensure!(opener.open_handles() == 0, "link handle leaked");
    Ok(())
}
