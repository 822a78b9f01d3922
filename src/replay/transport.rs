use crate::config::Destination;
use crate::dns::message;
use log::debug;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};

/// Largest datagram a nameserver can hand back over UDP.
pub const MAX_DNS_UDP_SIZE: usize = 65535;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no answer from {destination} within {timeout:?}")]
    Timeout {
        destination: Destination,
        timeout: Duration,
    },

    #[error("UDP round-trip failed: {0}")]
    Io(#[from] io::Error),
}

/// One UDP socket, reused for every round-trip of a run.
pub struct QueryTransport {
    socket: UdpSocket,
    destination: Destination,
    timeout: Duration,
    validate_answers: bool,
    recv_buf: Vec<u8>,
}

impl QueryTransport {
    /// Binds an ephemeral local port of the destination's address family.
    pub async fn bind(
        destination: Destination,
        timeout: Duration,
        validate_answers: bool,
    ) -> io::Result<Self> {
        let local: SocketAddr = if destination.addr().is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        debug!("Bound replay socket on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            destination,
            timeout,
            validate_answers,
            recv_buf: vec![0; MAX_DNS_UDP_SIZE],
        })
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Sends `query` as one datagram and waits for its answer.
    ///
    /// The first datagram to arrive is the answer. With answer validation on,
    /// datagrams from another host or that do not answer `query` are skipped
    /// and the wait goes on until the same deadline. No retries.
    pub async fn send_and_receive(&mut self, query: &[u8]) -> Result<&[u8], TransportError> {
        self.discard_stale();

        let destination = self.destination.addr();
        self.socket.send_to(query, destination).await?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let received = timeout_at(deadline, self.socket.recv_from(&mut self.recv_buf)).await;
            let (len, from) = match received {
                Ok(received) => received?,
                Err(_) => {
                    return Err(TransportError::Timeout {
                        destination: self.destination,
                        timeout: self.timeout,
                    });
                }
            };

            if self.validate_answers {
                if !sent_from(destination, from) {
                    debug!("Ignoring {len} byte datagram from {from}");
                    continue;
                }
                if !message::is_answer_to(query, &self.recv_buf[..len]) {
                    debug!("Ignoring {len} byte datagram that does not answer the query");
                    continue;
                }
            }

            return Ok(&self.recv_buf[..len]);
        }
    }

    /// Drops late answers to earlier, timed-out queries so they cannot be
    /// paired with the next one.
    fn discard_stale(&mut self) {
        while let Ok((len, from)) = self.socket.try_recv_from(&mut self.recv_buf) {
            debug!("Discarding late {len} byte datagram from {from}");
        }
    }
}

/// Whether a datagram from `from` can have come from `destination`.
///
/// Only IP and port are compared, so an IPv6 scope id or flow label on the
/// reply does not matter. An unspecified destination IP matches any host.
fn sent_from(destination: SocketAddr, from: SocketAddr) -> bool {
    if destination.port() != from.port() {
        return false;
    }
    destination.ip().is_unspecified() || destination.ip() == from.ip()
}
