//! In-memory link
//!
//! A [`Link`] backed by a shared [`MemoryWire`] instead of a device.
//! The wire records every outbound call, queues inbound frames and can
//! be told to accept only part of each frame, which is how partial
//! sends are exercised without hardware.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::iface::link::{Link, LinkOpener, MacAddr};

/// One call to [`Link::send`] as seen by the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub dst: MacAddr,
    /// The bytes the link accepted, not the bytes it was offered.
    pub bytes: Vec<u8>,
    pub offered: usize,
}

/// Shared state behind every handle of one [`MemoryOpener`].
#[derive(Debug, Default)]
pub struct MemoryWire {
    pub sent: Vec<SentFrame>,
    pub inbound: VecDeque<Vec<u8>>,
    /// Accept at most this many bytes per send.
    pub per_call_cap: Option<usize>,
    /// Byte counts returned by the next sends, ahead of `per_call_cap`.
    pub scripted: VecDeque<usize>,
    /// Accepted bytes are queued back as inbound frames.
    pub loopback: bool,
    pub hw_addr: MacAddr,
    pub fail_open: bool,
    pub fail_hw_addr: bool,
    pub fail_set_timeout: bool,
    pub open_handles: usize,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    wire: Arc<Mutex<MemoryWire>>,
}

impl MemoryOpener {
    pub fn new(hw_addr: MacAddr) -> Self {
        let opener = MemoryOpener::default();
        opener.wire().hw_addr = hw_addr;
        opener
    }

    /// Every accepted frame comes back on the next receive.
    pub fn loopback(hw_addr: MacAddr) -> Self {
        let opener = Self::new(hw_addr);
        opener.wire().loopback = true;
        opener
    }

    pub fn wire(&self) -> MutexGuard<'_, MemoryWire> {
        lock(&self.wire)
    }

    pub fn open_handles(&self) -> usize {
        self.wire().open_handles
    }

    pub fn sent(&self) -> Vec<SentFrame> {
        self.wire().sent.clone()
    }

    pub fn push_inbound(&self, frame: Vec<u8>) {
        self.wire().inbound.push_back(frame);
    }
}

impl LinkOpener for MemoryOpener {
    type Link = MemoryLink;

    fn open(&self, iface: &str) -> io::Result<MemoryLink> {
        let mut wire = self.wire();
        if wire.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such interface: {iface}"),
            ));
        }
        wire.open_handles += 1;
        Ok(MemoryLink {
            wire: Arc::clone(&self.wire),
            released: false,
        })
    }
}

#[derive(Debug)]
pub struct MemoryLink {
    wire: Arc<Mutex<MemoryWire>>,
    released: bool,
}

impl MemoryLink {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            lock(&self.wire).open_handles -= 1;
        }
    }
}

impl Link for MemoryLink {
    fn send(&mut self, dst: MacAddr, frame: &[u8]) -> io::Result<usize> {
        let mut wire = lock(&self.wire);
        let accepted = match wire.scripted.pop_front() {
            Some(n) => n,
            None => wire.per_call_cap.unwrap_or(frame.len()),
        }
        .min(frame.len());

        let bytes = frame[..accepted].to_vec();
        if wire.loopback && accepted > 0 {
            wire.inbound.push_back(bytes.clone());
        }
        wire.sent.push(SentFrame {
            dst,
            bytes,
            offered: frame.len(),
        });
        Ok(accepted)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut wire = lock(&self.wire);
        match wire.inbound.pop_front() {
            Some(frame) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                Ok(len)
            }
            None => Ok(0),
        }
    }

    fn hw_addr(&self, iface: &str) -> io::Result<MacAddr> {
        let wire = lock(&self.wire);
        if wire.fail_hw_addr {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no hardware address for {iface}"),
            ));
        }
        Ok(wire.hw_addr)
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let mut wire = lock(&self.wire);
        if wire.fail_set_timeout {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "link does not support timeouts",
            ));
        }
        wire.timeout = timeout;
        Ok(())
    }

    fn close(mut self) -> io::Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for MemoryLink {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock(wire: &Mutex<MemoryWire>) -> MutexGuard<'_, MemoryWire> {
    wire.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 1]);

    #[test]
    fn test_handles_are_counted() {
        let opener = MemoryOpener::new(MAC);
        let a = opener.open("mem0").unwrap();
        let b = opener.open("mem0").unwrap();
        assert_eq!(opener.open_handles(), 2);

        a.close().unwrap();
        assert_eq!(opener.open_handles(), 1);
        drop(b);
        assert_eq!(opener.open_handles(), 0);
    }

    #[test]
    fn test_cap_and_script() {
        let opener = MemoryOpener::new(MAC);
        opener.wire().per_call_cap = Some(3);
        opener.wire().scripted.push_back(1);
        let mut link = opener.open("mem0").unwrap();

        assert_eq!(link.send(MAC, b"abcdef").unwrap(), 1);
        assert_eq!(link.send(MAC, b"abcdef").unwrap(), 3);
        assert_eq!(link.send(MAC, b"ab").unwrap(), 2);

        let sent = opener.sent();
        assert_eq!(sent[0].bytes, b"a");
        assert_eq!(sent[1].bytes, b"abc");
        assert_eq!(sent[1].offered, 6);
    }

    #[test]
    fn test_loopback_and_empty_recv() {
        let opener = MemoryOpener::loopback(MAC);
        let mut link = opener.open("mem0").unwrap();
        let mut buf = [0u8; 16];

        assert_eq!(link.recv(&mut buf).unwrap(), 0);
        link.send(MAC, b"ping").unwrap();
        assert_eq!(link.recv(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"ping");
    }

    #[test]
    fn test_scripted_failures() {
        let opener = MemoryOpener::new(MAC);
        opener.wire().fail_hw_addr = true;
        let link = opener.open("mem0").unwrap();
        assert!(link.hw_addr("mem0").is_err());

        let mut link = link;
        opener.wire().fail_set_timeout = true;
        assert!(link.set_timeout(Some(Duration::from_millis(5))).is_err());
        assert!(opener.wire().timeout.is_none());

        opener.wire().fail_open = true;
        assert!(opener.open("mem0").is_err());
        assert_eq!(opener.open_handles(), 1);
    }
}
