//! UDP transport layer
//!
//! Each link owns one [`UdpTransport`]: a socket bound to the link's inbound
//! port plus a named reader thread that posts `(bytes, sender)` pairs into
//! the engine's inbox channel. Outbound datagrams go to the configured
//! remote address on the link's outbound port; with no remote set, `send` is
//! a silent no-op so the engine can tick freely before a peer is known.
//!
//! Send errors are not fatal anywhere in this stack: the engine logs and
//! retries on its next timer tick.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::error::{Error, Result};

/// Poll interval for the reader thread's shutdown flag
const READ_TIMEOUT_MS: u64 = 100;

/// Largest datagram we expect on any link
const MAX_DATAGRAM_SIZE: usize = 2048;

/// One directional UDP link
pub trait Transport: Send {
    /// Send to the configured remote; `Ok(0)` when no remote is set
    fn send(&self, data: &[u8]) -> Result<usize>;

    /// Resolve a hostname or IP and use it as the remote address
    fn set_remote_host(&self, host: &str) -> Result<()>;

    /// Adopt a peer that contacted us, keeping its IP but substituting this
    /// link's outbound port
    fn latch_remote(&self, sender: SocketAddr);

    /// Currently configured remote, if any
    fn remote(&self) -> Option<SocketAddr>;

    /// Stop the reader thread; further sends are not prevented
    fn close(&self);
}

/// Real UDP socket transport with a background reader thread
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    out_port: u16,
    remote: Arc<Mutex<Option<SocketAddr>>>,
    shutdown: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl UdpTransport {
    /// Bind `in_port` and start the reader thread
    ///
    /// Received datagrams are forwarded into `inbox`; the reader exits when
    /// the inbox is dropped or [`Transport::close`] is called. `label` names
    /// the reader thread for diagnostics.
    pub fn bind(
        in_port: u16,
        out_port: u16,
        inbox: Sender<(Vec<u8>, SocketAddr)>,
        label: &str,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", in_port)).map_err(|source| Error::Bind {
            port: in_port,
            source,
        })?;
        socket
            .set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)))
            .map_err(Error::Io)?;

        let socket = Arc::new(socket);
        let shutdown = Arc::new(AtomicBool::new(false));

        let reader_socket = Arc::clone(&socket);
        let reader_shutdown = Arc::clone(&shutdown);
        let reader = thread::Builder::new()
            .name(format!("udp-reader-{}", label))
            .spawn(move || {
                reader_loop(reader_socket, reader_shutdown, inbox);
            })
            .map_err(|e| Error::Other(format!("Failed to spawn reader thread: {}", e)))?;

        log::debug!("UDP link bound: in {} -> out {}", in_port, out_port);

        Ok(Self {
            socket,
            out_port,
            remote: Arc::new(Mutex::new(None)),
            shutdown,
            reader: Some(reader),
        })
    }

    fn remote_lock(&self) -> std::sync::MutexGuard<'_, Option<SocketAddr>> {
        self.remote.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for UdpTransport {
    fn send(&self, data: &[u8]) -> Result<usize> {
        let Some(target) = *self.remote_lock() else {
            return Ok(0);
        };
        if data.is_empty() {
            return Ok(0);
        }
        self.socket.send_to(data, target).map_err(Error::Io)
    }

    fn set_remote_host(&self, host: &str) -> Result<()> {
        let target = (host, self.out_port)
            .to_socket_addrs()
            .map_err(|_| Error::InvalidAddress(host.to_string()))?
            .next()
            .ok_or_else(|| Error::InvalidAddress(host.to_string()))?;

        *self.remote_lock() = Some(target);
        log::debug!("Remote address set: {} -> {}", host, target);
        Ok(())
    }

    fn latch_remote(&self, sender: SocketAddr) {
        let target = SocketAddr::new(sender.ip(), self.out_port);
        let mut remote = self.remote_lock();
        if *remote != Some(target) {
            log::info!("Latched remote address: {}", target);
            *remote = Some(target);
        }
    }

    fn remote(&self) -> Option<SocketAddr> {
        *self.remote_lock()
    }

    fn close(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.close();
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

/// Reader loop - forwards datagrams until shutdown or inbox closure
fn reader_loop(
    socket: Arc<UdpSocket>,
    shutdown: Arc<AtomicBool>,
    inbox: Sender<(Vec<u8>, SocketAddr)>,
) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];

    while !shutdown.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buf) {
            Ok((len, sender)) => {
                if inbox.send((buf[..len].to_vec(), sender)).is_err() {
                    // Engine side is gone
                    break;
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                // Timeout poll so the shutdown flag is observed
            }
            Err(e) => {
                log::error!("UDP receive error: {}", e);
                thread::sleep(Duration::from_millis(10));
            }
        }
    }

    log::debug!("UDP reader thread exiting");
}

/// In-memory transport recording sent frames, for hardware-free testing
#[cfg(any(test, feature = "mock"))]
#[derive(Clone)]
pub struct MockTransport {
    out_port: u16,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    remote: Arc<Mutex<Option<SocketAddr>>>,
}

#[cfg(any(test, feature = "mock"))]
impl MockTransport {
    pub fn new(out_port: u16) -> Self {
        Self {
            out_port,
            sent: Arc::new(Mutex::new(Vec::new())),
            remote: Arc::new(Mutex::new(None)),
        }
    }

    /// All frames sent so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(any(test, feature = "mock"))]
impl Transport for MockTransport {
    fn send(&self, data: &[u8]) -> Result<usize> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(data.to_vec());
        Ok(data.len())
    }

    fn set_remote_host(&self, host: &str) -> Result<()> {
        let ip: std::net::IpAddr = host
            .parse()
            .map_err(|_| Error::InvalidAddress(host.to_string()))?;
        *self.remote.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(SocketAddr::new(ip, self.out_port));
        Ok(())
    }

    fn latch_remote(&self, sender: SocketAddr) {
        *self.remote.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(SocketAddr::new(sender.ip(), self.out_port));
    }

    fn remote(&self) -> Option<SocketAddr> {
        *self.remote.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_send_without_remote_is_noop() {
        let (tx, _rx) = unbounded();
        let link = UdpTransport::bind(0, 0, tx, "test").unwrap();
        assert_eq!(link.send(&[1, 2, 3]).unwrap(), 0);
        assert!(link.remote().is_none());
    }

    #[test]
    fn test_loopback_datagram() {
        let (tx, rx) = unbounded();
        let receiver = UdpTransport::bind(0, 0, tx, "rx").unwrap();
        let in_port = receiver.socket.local_addr().unwrap().port();

        let (tx2, _rx2) = unbounded();
        let sender = UdpTransport::bind(0, in_port, tx2, "tx").unwrap();
        sender.set_remote_host("127.0.0.1").unwrap();

        sender.send(&[0xAA, 0xBB]).unwrap();
        let (data, _from) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(data, vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_latch_remote_substitutes_out_port() {
        let mock = MockTransport::new(1150);
        mock.latch_remote("10.0.0.5:49152".parse().unwrap());
        assert_eq!(mock.remote(), Some("10.0.0.5:1150".parse().unwrap()));
    }

    #[test]
    fn test_invalid_host_rejected() {
        let (tx, _rx) = unbounded();
        let link = UdpTransport::bind(0, 1110, tx, "test").unwrap();
        assert!(link.set_remote_host("").is_err());
        assert!(link.remote().is_none());
    }
}
