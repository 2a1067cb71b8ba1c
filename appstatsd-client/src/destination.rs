use std::{
    fmt, io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs as _, UdpSocket},
    time::Duration,
};

use tracing::{debug, error};

/// A `host:port` pair identifying a UDP collector endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Destination {
    host: String,
    port: u16,
}

impl Destination {
    /// Creates a new `Destination`.
    pub fn new<H>(host: H, port: u16) -> Self
    where
        H: Into<String>,
    {
        Self { host: host.into(), port }
    }

    /// Returns the host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }

    fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
        let addrs = (self.host.as_str(), self.port).to_socket_addrs()?.collect::<Vec<_>>();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("'{self}' did not resolve to any address"),
            ));
        }

        Ok(addrs)
    }

    /// Resolves the destination and opens a connected UDP socket to it.
    ///
    /// The local socket is bound to the unspecified address of the same family as the first resolved address, on an
    /// ephemeral port.
    pub(crate) fn connect(&self, write_timeout: Duration) -> io::Result<UdpSocket> {
        let addrs = self.resolve()?;
        let local_addr = match addrs[0] {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };

        let socket = UdpSocket::bind(local_addr)?;
        socket.connect(&addrs[..])?;
        socket.set_write_timeout(Some(write_timeout))?;
        Ok(socket)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An opened destination.
///
/// When the socket could not be opened, the sink stays in a degraded state where every send fails with
/// [`io::ErrorKind::NotConnected`].
pub(crate) struct DatagramSink {
    destination: Destination,
    socket: Option<UdpSocket>,
}

impl DatagramSink {
    /// Opens the destination, logging the failure and returning a degraded sink if it cannot be opened.
    pub fn open_lenient(destination: Destination, write_timeout: Duration) -> Self {
        match destination.connect(write_timeout) {
            Ok(socket) => Self::from_socket(destination, socket),
            Err(e) => {
                error!(error = %e, %destination, "Failed to open destination socket.");
                Self { destination, socket: None }
            }
        }
    }

    /// Opens the destination, returning an error if it cannot be opened.
    pub fn open_strict(destination: Destination, write_timeout: Duration) -> Result<Self, (Destination, io::Error)> {
        match destination.connect(write_timeout) {
            Ok(socket) => Ok(Self::from_socket(destination, socket)),
            Err(e) => Err((destination, e)),
        }
    }

    fn from_socket(destination: Destination, socket: UdpSocket) -> Self {
        debug!(%destination, local_addr = ?socket.local_addr().ok(), "Opened destination socket.");
        Self { destination, socket: Some(socket) }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Writes `buf` as a single datagram.
    pub fn send(&self, buf: &[u8]) -> io::Result<usize> {
        match &self.socket {
            Some(socket) => socket.send(buf),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("destination '{}' is not open", self.destination),
            )),
        }
    }
}
