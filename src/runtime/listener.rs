//! Listening socket.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

/// Pending connections the kernel may queue before refusing new ones.
pub const BACKLOG: i32 = 1;

/// Source of client connections for the serve loop.
///
/// Implemented by [`Listener`] for real sockets; a different accept strategy
/// (or a test double) only has to hand out streams.
pub trait Accept {
    type Stream: Read + Write;

    /// Block until the next client connects.
    fn accept(&self) -> io::Result<(Self::Stream, SocketAddr)>;
}

/// Blocking TCP listener with a backlog of [`BACKLOG`].
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl Listener {
    /// Bind and listen on `addr`.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = socket2::Socket::new(
            match addr {
                SocketAddr::V4(_) => socket2::Domain::IPV4,
                SocketAddr::V6(_) => socket2::Domain::IPV6,
            },
            socket2::Type::STREAM,
            Some(socket2::Protocol::TCP),
        )?;

        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(BACKLOG)?;

        Ok(Self {
            inner: socket.into(),
            read_timeout: None,
            write_timeout: None,
        })
    }

    /// Apply socket timeouts to every accepted stream. `None` blocks forever.
    pub fn with_timeouts(
        mut self,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Self {
        self.read_timeout = read_timeout;
        self.write_timeout = write_timeout;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl Accept for Listener {
    type Stream = TcpStream;

    fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.inner.accept()?;
        stream.set_read_timeout(self.read_timeout)?;
        stream.set_write_timeout(self.write_timeout)?;
        Ok((stream, peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_bind_ephemeral_port() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_accept_applies_timeouts() {
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap())
            .unwrap()
            .with_timeouts(Some(Duration::from_millis(250)), None);
        let addr = listener.local_addr().unwrap();

        let mut client = TcpStream::connect(addr).unwrap();
        let (mut stream, peer) = listener.accept().unwrap();
        assert_eq!(peer, client.local_addr().unwrap());
        assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_millis(250)));
        assert_eq!(stream.write_timeout().unwrap(), None);

        client.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        // Nothing more arrives, so the configured timeout fires.
        let err = stream.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ));
    }
}
