//! Per-connection state machine.
//!
//! A connection is served exactly once:
//!
//! ```text
//! ReceivingHeader -> [ReceivingBody] -> Dispatching -> Sending -> Closed
//! ```
//!
//! Any transport failure jumps straight to `Closed`. A malformed request is
//! answered with `400 Bad Request` before closing.

use super::framer::Framer;
use super::ServeError;
use crate::protocols::http::{bad_request, parser, Handler, Message};
use std::io::{Read, Write};
use tracing::{debug, trace, warn};

/// Current state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Reading until the blank line ending the header block.
    ReceivingHeader,
    /// Reading a body announced by `Content-Length`.
    ReceivingBody {
        /// Declared body length in bytes.
        declared: usize,
    },
    /// Handler is producing the response.
    Dispatching,
    /// Writing the serialized response.
    Sending {
        /// Total bytes to write.
        total: usize,
    },
    /// Exchange finished or failed; the stream must be dropped.
    Closed,
}

/// A single accepted client stream.
pub struct Connection<S> {
    stream: S,
    state: ConnState,
    max_header_bytes: Option<usize>,
    /// Protocol of the request line, once one has been framed.
    protocol: Option<String>,
}

impl<S: Read + Write> Connection<S> {
    /// Wrap a freshly accepted stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            state: ConnState::ReceivingHeader,
            max_header_bytes: None,
            protocol: None,
        }
    }

    pub fn with_max_header_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_header_bytes = limit;
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Read and parse one request, body included when one is declared.
    pub fn receive(&mut self) -> Result<Message, ServeError> {
        self.state = ConnState::ReceivingHeader;
        let mut framer =
            Framer::new(&mut self.stream).with_max_header_bytes(self.max_header_bytes);

        let header = framer.receive_header()?;
        self.protocol = parser::request_protocol(&header).map(str::to_owned);
        let mut request = parser::parse(&header)?;

        if let Some(declared) = parser::content_length(&request)? {
            self.state = ConnState::ReceivingBody { declared };
            let body = framer.receive_body(declared)?;
            request.set_content(body);
        }

        if !framer.buffered().is_empty() {
            trace!(bytes = framer.buffered().len(), "Ignoring bytes past end of request");
        }

        Ok(request)
    }

    /// Serialize and write `response`, returning the number of bytes sent.
    pub fn send(&mut self, response: &Message) -> Result<usize, ServeError> {
        let bytes = response.to_bytes();
        self.state = ConnState::Sending { total: bytes.len() };
        self.stream.write_all(&bytes)?;
        self.stream.flush()?;
        Ok(bytes.len())
    }

    /// Run the whole exchange and return the response that was sent.
    ///
    /// The connection is `Closed` afterwards whether or not it succeeded.
    pub fn serve<H: Handler + ?Sized>(&mut self, handler: &H) -> Result<Message, ServeError> {
        let result = self.exchange(handler);
        if let Err(e) = &result {
            match self.state {
                ConnState::ReceivingBody { declared } => {
                    debug!(declared, error = %e, "Exchange aborted while receiving body")
                }
                ConnState::Sending { total } => {
                    debug!(total, error = %e, "Exchange aborted while sending response")
                }
                state => debug!(state = ?state, error = %e, "Exchange aborted"),
            }
        }
        self.state = ConnState::Closed;
        result
    }

    fn exchange<H: Handler + ?Sized>(&mut self, handler: &H) -> Result<Message, ServeError> {
        let response = match self.receive() {
            Ok(request) => {
                debug!(request = ?request, "Request");
                self.state = ConnState::Dispatching;
                handler.handle(&request)
            }
            Err(ServeError::Format(e)) => {
                warn!(error = %e, "Malformed request");
                bad_request(self.protocol.as_deref())
            }
            Err(e) => return Err(e),
        };

        let sent = self.send(&response)?;
        trace!(status = ?response.status().map(|s| s.code()), bytes = sent, "Response sent");

        Ok(response)
    }

    /// Give back the underlying stream.
    #[cfg(test)]
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::http::status::Status;
    use crate::protocols::http::OkHandler;
    use crate::runtime::testing::{ScriptedStream, Step};
    use std::cell::RefCell;
    use std::io;

    #[test]
    fn test_get_served() {
        let stream = ScriptedStream::chunks(&[b"GET /hello?x=1&y=2 HTTP/1.1\r\nHost: test\r\n\r\n"]);
        let mut conn = Connection::new(stream);
        assert_eq!(conn.state(), ConnState::ReceivingHeader);

        let response = conn.serve(&OkHandler).unwrap();
        assert_eq!(response.status(), Some(Status::OK));
        assert_eq!(conn.state(), ConnState::Closed);

        let stream = conn.into_inner();
        assert_eq!(stream.written, b"HTTP/1.1 200 OK\r\n\r\n");
        assert!(stream.flushed);
    }

    #[test]
    fn test_body_attached_as_content() {
        let stream = ScriptedStream::chunks(&[
            b"POST /led HTTP/1.1\r\nContent-Length: 5\r\n\r\n",
            b"hel",
            b"lo",
        ]);
        let mut conn = Connection::new(stream);
        let request = conn.receive().unwrap();
        assert_eq!(conn.state(), ConnState::ReceivingBody { declared: 5 });
        assert_eq!(request.content().unwrap().as_ref(), b"hello");
    }

    #[test]
    fn test_zero_length_body_stays_absent() {
        let stream = ScriptedStream::chunks(&[b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n"]);
        let mut conn = Connection::new(stream);
        let request = conn.receive().unwrap();
        assert!(request.content().is_none());
        assert_eq!(conn.state(), ConnState::ReceivingHeader);
    }

    #[test]
    fn test_handler_sees_request() {
        let seen = RefCell::new(None);
        let handler = |request: &Message| {
            *seen.borrow_mut() = Some(request.clone());
            Message::reply(request, Status::from_code("201").unwrap())
        };

        let stream = ScriptedStream::chunks(&[b"PUT /x HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi"]);
        let mut conn = Connection::new(stream);
        conn.serve(&handler).unwrap();

        let request = seen.into_inner().unwrap();
        assert_eq!(request.method(), "PUT");
        assert_eq!(request.content().unwrap().as_ref(), b"hi");
        assert_eq!(conn.into_inner().written, b"HTTP/1.1 201 Created\r\n\r\n");
    }

    #[test]
    fn test_malformed_request_gets_bad_request() {
        let stream = ScriptedStream::chunks(&[b"GET /\r\nHost: test\r\n\r\n"]);
        let mut conn = Connection::new(stream);

        let response = conn.serve(&OkHandler).unwrap();
        assert_eq!(response.status(), Some(Status::BAD_REQUEST));
        assert_eq!(conn.state(), ConnState::Closed);
        assert_eq!(conn.into_inner().written, b"HTTP/1.1 400 Bad Request\r\n\r\n");
    }

    #[test]
    fn test_bad_request_echoes_request_protocol() {
        let stream = ScriptedStream::chunks(&[b"GET /x?flag HTTP/1.0\r\n\r\n"]);
        let mut conn = Connection::new(stream);

        let response = conn.serve(&OkHandler).unwrap();
        assert_eq!(response.status(), Some(Status::BAD_REQUEST));
        assert_eq!(conn.into_inner().written, b"HTTP/1.0 400 Bad Request\r\n\r\n");
    }

    #[test]
    fn test_bad_header_line_echoes_request_protocol() {
        let stream = ScriptedStream::chunks(&[b"GET / HTTP/1.0\r\nNoSeparator\r\n\r\n"]);
        let mut conn = Connection::new(stream);
        conn.serve(&OkHandler).unwrap();
        assert!(conn.into_inner().written.starts_with(b"HTTP/1.0 400"));
    }

    #[test]
    fn test_invalid_content_length_gets_bad_request() {
        let stream = ScriptedStream::chunks(&[b"POST / HTTP/1.1\r\nContent-Length: -1\r\n\r\n"]);
        let mut conn = Connection::new(stream);
        let response = conn.serve(&OkHandler).unwrap();
        assert_eq!(response.status(), Some(Status::BAD_REQUEST));
    }

    #[test]
    fn test_reset_mid_header_closes_without_reply() {
        let stream = ScriptedStream::new(vec![
            Step::Data(b"GET / HTTP/1.1\r\n".to_vec()),
            Step::Fail(io::ErrorKind::ConnectionReset),
        ]);
        let mut conn = Connection::new(stream);

        let err = conn.serve(&OkHandler).unwrap_err();
        assert!(err.is_transport());
        assert_eq!(conn.state(), ConnState::Closed);
        assert!(conn.into_inner().written.is_empty());
    }

    #[test]
    fn test_reset_mid_body_closes_without_reply() {
        let stream = ScriptedStream::new(vec![
            Step::Data(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc".to_vec()),
            Step::Fail(io::ErrorKind::ConnectionReset),
        ]);
        let mut conn = Connection::new(stream);

        assert!(conn.serve(&OkHandler).unwrap_err().is_transport());
        assert_eq!(conn.state(), ConnState::Closed);
        assert!(conn.into_inner().written.is_empty());
    }

    #[test]
    fn test_header_cap_closes_without_reply() {
        let stream = ScriptedStream::chunks(&[b"GET / HTTP/1.1\r\nX-Pad: 0123456789"]);
        let mut conn = Connection::new(stream).with_max_header_bytes(Some(8));
        assert!(matches!(
            conn.serve(&OkHandler),
            Err(ServeError::HeaderTooLarge(8))
        ));
        assert!(conn.into_inner().written.is_empty());
    }
}
