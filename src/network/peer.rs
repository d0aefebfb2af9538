use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use log::{info, warn};

use crate::error::{NodeError, Result};
use crate::network::Message;

const WRITE_TIMEOUT: Duration = Duration::from_millis(5000);

struct Peer {
    id: u64,
    addr: SocketAddr,
    stream: TcpStream,
    inbound: bool,
}

/// The set of live peer links. Each entry holds a writable clone of the
/// connection's stream; the matching read half lives in that connection's
/// reader thread. A failed write evicts the peer.
pub struct Peers {
    inner: RwLock<Vec<Peer>>,
    next_id: AtomicU64,
}

impl Default for Peers {
    fn default() -> Self {
        Self::new()
    }
}

impl Peers {
    pub fn new() -> Peers {
        Peers {
            inner: RwLock::new(vec![]),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connected stream and return the peer's id
    pub fn register(&self, stream: &TcpStream, inbound: bool) -> Result<u64> {
        let addr = stream
            .peer_addr()
            .map_err(|e| NodeError::Network(format!("Failed to get peer address: {e}")))?;
        stream
            .set_write_timeout(Some(WRITE_TIMEOUT))
            .map_err(|e| NodeError::Network(format!("Failed to set write timeout: {e}")))?;
        let writer = stream
            .try_clone()
            .map_err(|e| NodeError::Network(format!("Failed to clone stream: {e}")))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on peers - this should never happen");
        inner.push(Peer {
            id,
            addr,
            stream: writer,
            inbound,
        });
        info!("Registered peer {addr} as #{id}");
        Ok(id)
    }

    /// How many of the live links were initiated by the remote side
    pub fn inbound_count(&self) -> usize {
        self.inner
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen")
            .iter()
            .filter(|peer| peer.inbound)
            .count()
    }

    pub fn evict(&self, id: u64) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on peers - this should never happen");
        if let Some(position) = inner.iter().position(|peer| peer.id == id) {
            let peer = inner.remove(position);
            info!("Removed peer {} (#{id})", peer.addr);
        }
    }

    /// Send to one peer; on failure the peer is evicted
    pub fn send_to(&self, id: u64, message: &Message) {
        self.send_filtered(message, |peer_id| peer_id == id);
    }

    /// Send to every peer
    pub fn broadcast(&self, message: &Message) {
        self.send_filtered(message, |_| true);
    }

    /// Send to every peer except the one the message came from
    pub fn broadcast_except(&self, sender: u64, message: &Message) {
        self.send_filtered(message, |peer_id| peer_id != sender);
    }

    fn send_filtered(&self, message: &Message, keep: impl Fn(u64) -> bool) {
        let mut failed = vec![];
        {
            let inner = self
                .inner
                .read()
                .expect("Failed to acquire read lock on peers - this should never happen");
            for peer in inner.iter().filter(|peer| keep(peer.id)) {
                if let Err(e) = write_message(&peer.stream, message) {
                    warn!("Failed to send to peer {}: {e}", peer.addr);
                    failed.push(peer.id);
                }
            }
        }
        for id in failed {
            self.evict(id);
        }
    }

    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.inner
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen")
            .iter()
            .map(|peer| peer.addr)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One message per line: compact JSON never contains a raw newline, so the
/// terminator is an unambiguous frame boundary.
fn write_message(mut stream: &TcpStream, message: &Message) -> Result<()> {
    serde_json::to_writer(stream, message)
        .map_err(|e| NodeError::Network(format!("Failed to serialize message: {e}")))?;
    stream
        .write_all(b"\n")
        .and_then(|_| stream.flush())
        .map_err(|e| NodeError::Network(format!("Failed to send message: {e}")))?;
    Ok(())
}
