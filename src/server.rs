//! Single-connection HTTP server loop.
//!
//! Accepts one client at a time, serves exactly one request on it and closes
//! it before accepting the next. Per-connection failures are logged and
//! dropped; the loop itself never stops.

use crate::protocols::http::{Handler, Message};
use crate::runtime::{Accept, Connection, ServeError};
use tracing::{debug, error, info_span, warn, Span};

/// Server instance
pub struct Server<A, H> {
    acceptor: A,
    handler: H,
    max_header_bytes: Option<usize>,
    span: Span,
}

impl<A: Accept, H: Handler> Server<A, H> {
    /// Create a server answering connections from `acceptor` with `handler`.
    pub fn new(acceptor: A, handler: H) -> Self {
        Server {
            acceptor,
            handler,
            max_header_bytes: None,
            span: info_span!("server"),
        }
    }

    /// Cap on header block size. See `Framer::with_max_header_bytes`.
    pub fn with_max_header_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_header_bytes = limit;
        self
    }

    /// Span every connection's log events are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Serve connections forever.
    pub fn run(&self) -> ! {
        loop {
            // Failures are already logged per connection.
            let _ = self.serve_one();
        }
    }

    /// Accept a single connection and drive it to completion.
    ///
    /// Returns the response sent, or the error that ended the connection.
    /// The stream is closed before this returns in either case.
    pub fn serve_one(&self) -> Result<Message, ServeError> {
        let _enter = self.span.enter();

        let (stream, peer) = match self.acceptor.accept() {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                return Err(e.into());
            }
        };
        debug!(peer = %peer, "Client connected");

        let mut connection = Connection::new(stream).with_max_header_bytes(self.max_header_bytes);
        let result = connection.serve(&self.handler);
        drop(connection);

        match &result {
            Ok(_) => debug!(peer = %peer, "Client served"),
            Err(e) if e.is_transport() => {
                debug!(peer = %peer, error = %e, "Client connection dropped")
            }
            Err(e) => warn!(peer = %peer, error = %e, "Client connection rejected"),
        }

        result
    }
}
