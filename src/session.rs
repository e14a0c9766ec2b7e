//! Sessions
//!
//! A session ties one link handle to a source address, a port and a
//! transport protocol. Opening acquires the link and resolves the
//! configuration; closing consumes the session and releases the link.
//! Sends and receives are routed to the handler for the configured
//! protocol.
//!
//! A session is not synchronized. Callers that share one across threads
//! must serialize access themselves.

use std::net::Ipv6Addr;

use crate::config::StackConfig;
use crate::error::{NetError, Result};
use crate::iface::ip::IpLayer;
use crate::iface::link::{Link, LinkOpener, MacAddr};
use crate::iface::resolve::Resolver;
use crate::iface::tap::{TapLink, TapOpener};
use crate::network::ipv6::Ipv6Header;
use crate::transport::{DatagramStub, Protocol, Transport};

pub struct Session<L: Link> {
    ip: IpLayer<L>,
    iface: String,
    port: u16,
    protocol: Protocol,
    stream: Option<Box<dyn Transport<L>>>,
    datagram: DatagramStub,
}

impl Session<TapLink> {
    /// Open a session on the TAP device named in `config`.
    pub fn open_tap(config: &StackConfig) -> Result<Self> {
        Self::open(&TapOpener, config)
    }
}

impl<L: Link> Session<L> {
    /// Acquire a link and set up the session described by `config`.
    ///
    /// If any step fails the link is released before the error is returned.
    pub fn open<O>(opener: &O, config: &StackConfig) -> Result<Self>
    where
        O: LinkOpener<Link = L>,
    {
        let iface = config.session.interface.clone();
        let mut link = opener.open(&iface).map_err(|source| NetError::LinkOpen {
            iface: iface.clone(),
            source,
        })?;

        let hw_addr = match link.hw_addr(&iface) {
            Ok(addr) => addr,
            Err(source) => {
                release(link, &iface);
                return Err(NetError::HwAddr { iface, source });
            }
        };

        let protocol = match config.session.protocol.parse::<Protocol>() {
            Ok(protocol) => protocol,
            Err(e) => {
                release(link, &iface);
                return Err(e);
            }
        };

        if let Err(e) = link.set_timeout(config.link.timeout()) {
            release(link, &iface);
            return Err(e.into());
        }

        let mut ip = IpLayer::new(link, config.session.source, hw_addr)
            .with_oversize(config.session.oversize)
            .with_transmit(config.transmit.clone());
        ip.set_resolver(config.session.resolution.resolver());

        tracing::info!(
            iface = %iface,
            %hw_addr,
            src = %config.session.source,
            port = config.session.port,
            %protocol,
            "session opened"
        );

        Ok(Session {
            ip,
            iface,
            port: config.session.port,
            protocol,
            stream: None,
            datagram: DatagramStub,
        })
    }

    /// Attach the stream transport that TCP sessions route to.
    pub fn with_stream(mut self, handler: impl Transport<L> + 'static) -> Self {
        self.stream = Some(Box::new(handler));
        self
    }

    /// Replace the destination resolution strategy.
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.ip.set_resolver(Box::new(resolver));
        self
    }

    /// Send `data` through the session's transport.
    pub fn send(&mut self, data: &[u8]) -> Result<usize> {
        match self.protocol {
            Protocol::Tcp => match self.stream.as_mut() {
                Some(handler) => handler.send(&mut self.ip, self.port, data),
                None => Err(NetError::NoTransport(Protocol::Tcp)),
            },
            Protocol::Udp => self.datagram.send(&mut self.ip, self.port, data),
        }
    }

    /// Receive through the session's transport into `buf`.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.protocol {
            Protocol::Tcp => match self.stream.as_mut() {
                Some(handler) => handler.recv(&mut self.ip, self.port, buf),
                None => Err(NetError::NoTransport(Protocol::Tcp)),
            },
            Protocol::Udp => self.datagram.recv(&mut self.ip, self.port, buf),
        }
    }

    /// Send one packet directly at the network layer.
    pub fn ip_send(&mut self, dst: Ipv6Addr, next_header: u8, data: &[u8]) -> Result<usize> {
        self.ip.send(dst, next_header, data)
    }

    /// Receive one packet payload directly from the network layer.
    pub fn ip_recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ip.recv(buf)
    }

    pub fn ip_recv_packet(&mut self) -> Result<(Ipv6Header, Vec<u8>)> {
        self.ip.recv_packet()
    }

    /// Pseudo-header checksum of `data` from this session to `dst`.
    pub fn checksum(&self, dst: Ipv6Addr, next_header: u8, data: &[u8]) -> Result<u16> {
        self.ip.checksum(dst, next_header, data)
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn interface(&self) -> &str {
        &self.iface
    }

    pub fn src_addr(&self) -> Ipv6Addr {
        self.ip.src_addr
    }

    pub fn hw_addr(&self) -> MacAddr {
        self.ip.hw_addr
    }

    pub fn ip(&self) -> &IpLayer<L> {
        &self.ip
    }

    pub fn ip_mut(&mut self) -> &mut IpLayer<L> {
        &mut self.ip
    }

    /// Tear the session down and release its link.
    pub fn close(self) -> Result<()> {
        tracing::info!(iface = %self.iface, "session closed");
        self.ip.into_link().close()?;
        Ok(())
    }
}

/// Close a link acquired during a failed open.
fn release<L: Link>(link: L, iface: &str) {
    if let Err(e) = link.close() {
        tracing::warn!(iface, error = %e, "failed to release link");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OversizePolicy;
    use crate::iface::memory::{MemoryLink, MemoryOpener};
    use crate::iface::resolve::DerivedMulticast;
    use crate::network::ipv6::{IPV6_HEADER_LEN, MAX_DATA_LEN};
    use crate::network::protocol;
    use crate::transport::RawTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const MAC: MacAddr = MacAddr([0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]);

    fn config(protocol: &str) -> StackConfig {
        let mut config = StackConfig::default();
        config.session.interface = "mem0".to_string();
        config.session.source = "fe80::1".parse().unwrap();
        config.session.port = 4242;
        config.session.protocol = protocol.to_string();
        config.transmit.backoff_ms = 0;
        config
    }

    fn peer() -> Ipv6Addr {
        "fe80::2".parse().unwrap()
    }

    /// Stream handler that only counts how often it is called.
    struct Counting(Arc<AtomicUsize>);

    impl Transport<MemoryLink> for Counting {
        fn send(&mut self, _ip: &mut IpLayer<MemoryLink>, port: u16, data: &[u8]) -> Result<usize> {
            assert_eq!(port, 4242);
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(data.len())
        }

        fn recv(&mut self, _ip: &mut IpLayer<MemoryLink>, _port: u16, _buf: &mut [u8]) -> Result<usize> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    #[test]
    fn test_open_and_close() {
        let opener = MemoryOpener::new(MAC);
        let session = Session::open(&opener, &config("tcp")).unwrap();

        assert_eq!(session.protocol(), Protocol::Tcp);
        assert_eq!(session.port(), 4242);
        assert_eq!(session.interface(), "mem0");
        assert_eq!(session.hw_addr(), MAC);
        assert_eq!(session.src_addr(), "fe80::1".parse::<Ipv6Addr>().unwrap());
        assert_eq!(opener.open_handles(), 1);

        session.close().unwrap();
        assert_eq!(opener.open_handles(), 0);
    }

    #[test]
    fn test_open_fails_without_link() {
        let opener = MemoryOpener::new(MAC);
        opener.wire().fail_open = true;

        let err = Session::open(&opener, &config("tcp")).err().unwrap();
        assert!(matches!(err, NetError::LinkOpen { ref iface, .. } if iface == "mem0"));
        assert_eq!(opener.open_handles(), 0);
    }

    #[test]
    fn test_hw_addr_failure_releases_link() {
        let opener = MemoryOpener::new(MAC);
        opener.wire().fail_hw_addr = true;

        let err = Session::open(&opener, &config("tcp")).err().unwrap();
        assert!(matches!(err, NetError::HwAddr { .. }));
        assert_eq!(opener.open_handles(), 0);
    }

    #[test]
    fn test_timeout_failure_releases_link() {
        let opener = MemoryOpener::new(MAC);
        opener.wire().fail_set_timeout = true;
        let mut config = config("tcp");
        config.link.timeout_ms = Some(50);

        let err = Session::open(&opener, &config).err().unwrap();
        assert!(matches!(err, NetError::Io(ref e) if e.kind() == std::io::ErrorKind::Unsupported));
        assert_eq!(opener.open_handles(), 0);
    }

    #[test]
    fn test_unsupported_protocol_releases_link() {
        let opener = MemoryOpener::new(MAC);

        let err = Session::open(&opener, &config("icmp")).err().unwrap();
        assert!(matches!(err, NetError::UnsupportedProtocol(ref p) if p == "icmp"));
        assert_eq!(opener.open_handles(), 0);
    }

    #[test]
    fn test_datagram_stub_has_no_side_effects() {
        let opener = MemoryOpener::new(MAC);
        opener.push_inbound(vec![0x60; IPV6_HEADER_LEN + 4]);
        let mut session = Session::open(&opener, &config("udp")).unwrap();

        let err = session.send(b"payload").unwrap_err();
        assert!(matches!(err, NetError::Unimplemented(Protocol::Udp)));
        let mut buf = [0u8; 64];
        let err = session.recv(&mut buf).unwrap_err();
        assert!(matches!(err, NetError::Unimplemented(Protocol::Udp)));

        assert!(opener.sent().is_empty());
        assert_eq!(opener.wire().inbound.len(), 1);
    }

    #[test]
    fn test_stream_without_handler() {
        let opener = MemoryOpener::new(MAC);
        let mut session = Session::open(&opener, &config("tcp")).unwrap();

        let err = session.send(b"x").unwrap_err();
        assert!(matches!(err, NetError::NoTransport(Protocol::Tcp)));
        assert!(opener.sent().is_empty());
    }

    #[test]
    fn test_stream_dispatch() {
        let opener = MemoryOpener::new(MAC);
        let calls = Arc::new(AtomicUsize::new(0));
        let mut session = Session::open(&opener, &config("6"))
            .unwrap()
            .with_stream(Counting(Arc::clone(&calls)));

        assert_eq!(session.send(b"abc").unwrap(), 3);
        let mut buf = [0u8; 8];
        assert_eq!(session.recv(&mut buf).unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_raw_stream_round_trip() {
        let opener = MemoryOpener::loopback(MAC);
        let mut session = Session::open(&opener, &config("tcp"))
            .unwrap()
            .with_stream(RawTransport::new(peer(), Protocol::Tcp));

        assert_eq!(session.send(b"over the wire").unwrap(), 13);
        let mut buf = [0u8; 64];
        let n = session.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"over the wire");
    }

    #[test]
    fn test_ip_send_clamps_oversize() {
        let opener = MemoryOpener::new(MAC);
        let mut session = Session::open(&opener, &config("tcp")).unwrap();
        let data = vec![0x5a; MAX_DATA_LEN * 2];

        assert_eq!(session.ip_send(peer(), protocol::TCP, &data).unwrap(), MAX_DATA_LEN);
    }

    #[test]
    fn test_ip_send_rejects_oversize_when_configured() {
        let opener = MemoryOpener::new(MAC);
        let mut cfg = config("tcp");
        cfg.session.oversize = OversizePolicy::Reject;
        let mut session = Session::open(&opener, &cfg).unwrap();

        let err = session
            .ip_send(peer(), protocol::TCP, &vec![0; MAX_DATA_LEN + 1])
            .unwrap_err();
        assert!(matches!(err, NetError::PayloadTooLarge(_)));
    }

    #[test]
    fn test_ip_send_and_recv_packet() {
        let opener = MemoryOpener::loopback(MAC);
        let mut session = Session::open(&opener, &config("tcp")).unwrap();

        session.ip_send(peer(), protocol::UDP, b"datagram").unwrap();
        let (header, data) = session.ip_recv_packet().unwrap();
        assert_eq!(header.dst_addr, peer());
        assert_eq!(header.next_header, protocol::UDP);
        assert_eq!(data, b"datagram");
    }

    #[test]
    fn test_checksum_matches_ip_layer() {
        let opener = MemoryOpener::new(MAC);
        let session = Session::open(&opener, &config("tcp")).unwrap();

        let a = session.checksum(peer(), protocol::TCP, b"abc").unwrap();
        let b = session.ip().checksum(peer(), protocol::TCP, b"abc").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_config_reaches_link_and_resolver() {
        let opener = MemoryOpener::new(MAC);
        let mut cfg = config("tcp");
        cfg.link.timeout_ms = Some(75);
        let mut session = Session::open(&opener, &cfg)
            .unwrap()
            .with_resolver(DerivedMulticast);

        assert_eq!(opener.wire().timeout, Some(Duration::from_millis(75)));

        let dst: Ipv6Addr = "ff02::1:ff00:42".parse().unwrap();
        session.ip_send(dst, protocol::TCP, b"x").unwrap();
        assert_eq!(opener.sent()[0].dst, MacAddr([0x33, 0x33, 0xff, 0x00, 0x00, 0x42]));
    }
}
