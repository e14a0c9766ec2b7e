use std::io;
use std::process::Command;

use anyhow::{bail, Result};

#[allow(dead_code)]
/// Bring a TAP device up so frames written to it reach the kernel.
pub fn bring_up(iface_name: &str) -> Result<()> {
    run_ip(&["link", "set", "up", "dev", iface_name])?;
    tracing::info!(iface = iface_name, "interface brought up");
    Ok(())
}

/// Add an IPv6 address to the device, e.g. "fd00::1/64".
#[allow(dead_code)]
pub fn add_address(iface_name: &str, addr_cidr: &str) -> Result<()> {
    run_ip(&["-6", "addr", "add", addr_cidr, "dev", iface_name])?;
    tracing::info!(iface = iface_name, addr = addr_cidr, "address configured");
    Ok(())
}

fn run_ip(args: &[&str]) -> Result<()> {
    let status = Command::new("ip").args(args).status().map_err(|e| {
        io::Error::new(e.kind(), format!("failed to run ip {}: {e}", args.join(" ")))
    })?;
    if !status.success() {
        bail!("ip {} exited with {status}", args.join(" "));
    }
    Ok(())
}

/// Install a fmt subscriber driven by RUST_LOG.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
