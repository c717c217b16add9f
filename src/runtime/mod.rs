//! Blocking socket runtime.
//!
//! One connection at a time, fully synchronous:
//! - `Framer`: chunked reads up to a header terminator or a body length
//! - `Connection`: per-connection state machine (receive, dispatch, send)
//! - `Listener`: bound TCP socket with a backlog of one
//!
//! The serve loop itself lives in `crate::server` and only talks to the
//! network through the [`Accept`] trait.

mod connection;
mod framer;
mod listener;

pub use connection::Connection;
pub use framer::CHUNK_SIZE;
pub use listener::{Accept, Listener, BACKLOG};

use crate::protocols::http::FormatError;
use std::io;

/// Errors raised while serving a single connection.
#[derive(Debug)]
pub enum ServeError {
    /// Accept, receive or send failed on the underlying socket
    Transport(io::Error),
    /// Request bytes could not be parsed
    Format(FormatError),
    /// Header block grew past the configured cap without a terminator
    HeaderTooLarge(usize),
}

impl ServeError {
    /// Whether the failure came from the socket rather than the peer's bytes.
    pub fn is_transport(&self) -> bool {
        matches!(self, ServeError::Transport(_))
    }
}

impl std::fmt::Display for ServeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeError::Transport(e) => write!(f, "Transport error: {}", e),
            ServeError::Format(e) => write!(f, "Format error: {}", e),
            ServeError::HeaderTooLarge(limit) => {
                write!(f, "Header exceeds {} bytes without terminator", limit)
            }
        }
    }
}

impl std::error::Error for ServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServeError::Transport(e) => Some(e),
            ServeError::Format(e) => Some(e),
            ServeError::HeaderTooLarge(_) => None,
        }
    }
}

impl From<io::Error> for ServeError {
    fn from(e: io::Error) -> Self {
        ServeError::Transport(e)
    }
}

impl From<FormatError> for ServeError {
    fn from(e: FormatError) -> Self {
        ServeError::Format(e)
    }
}

/// In-memory streams shared by the runtime and server tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};

    /// One scripted outcome of a `read` call.
    pub enum Step {
        Data(Vec<u8>),
        Fail(io::ErrorKind),
    }

    /// Duplex stream replaying scripted reads and recording writes.
    /// Once the script runs out every read reports end of stream.
    pub struct ScriptedStream {
        reads: VecDeque<Step>,
        pub written: Vec<u8>,
        pub flushed: bool,
    }

    impl ScriptedStream {
        pub fn new(reads: Vec<Step>) -> Self {
            Self {
                reads: reads.into(),
                written: Vec::new(),
                flushed: false,
            }
        }

        /// Stream delivering each chunk in its own `read` call.
        pub fn chunks(chunks: &[&[u8]]) -> Self {
            Self::new(chunks.iter().map(|c| Step::Data(c.to_vec())).collect())
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                None => Ok(0),
                Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
                Some(Step::Data(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.reads.push_front(Step::Data(data.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushed = true;
            Ok(())
        }
    }
}
