//! Message framing over a blocking byte stream.
//!
//! Reads arrive in fixed `CHUNK_SIZE` pieces and accumulate in one buffer.
//! The header phase stops at the first `\r\n\r\n`; the body phase stops once
//! the declared length is buffered. Bytes read past a boundary stay buffered
//! for the next phase.

use super::ServeError;
use bytes::{Bytes, BytesMut};
use std::io::{self, Read};

/// Size of each `read` issued against the stream.
pub const CHUNK_SIZE: usize = 1024;

/// Blank line ending the header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Accumulates reads from `R` and splits off framed messages.
pub struct Framer<R> {
    reader: R,
    buffer: BytesMut,
    max_header_bytes: Option<usize>,
}

impl<R: Read> Framer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(CHUNK_SIZE),
            max_header_bytes: None,
        }
    }

    /// Cap the header block. Without a cap a peer that never sends the
    /// terminator is buffered until memory runs out.
    pub fn with_max_header_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_header_bytes = limit;
        self
    }

    /// Read until the header terminator and return the header block,
    /// terminator included.
    pub fn receive_header(&mut self) -> Result<Bytes, ServeError> {
        let limit = self.max_header_bytes;
        // Bytes before `scanned` were already searched; only a terminator
        // straddling that point can start inside them.
        let mut scanned: usize = 0;
        self.receive_until(|buffer| {
            let from = scanned.saturating_sub(HEADER_TERMINATOR.len() - 1);
            scanned = buffer.len();
            match find_terminator(&buffer[from..]) {
                Some(pos) => Ok(Some(from + pos + HEADER_TERMINATOR.len())),
                None => match limit {
                    Some(limit) if buffer.len() > limit => Err(ServeError::HeaderTooLarge(limit)),
                    _ => Ok(None),
                },
            }
        })
    }

    /// Read until `declared` body bytes are available and return exactly
    /// that many.
    pub fn receive_body(&mut self, declared: usize) -> Result<Bytes, ServeError> {
        self.receive_until(|buffer| Ok((buffer.len() >= declared).then_some(declared)))
    }

    /// Bytes read from the stream but not yet returned.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Shared read loop. `boundary` inspects the buffer and yields the length
    /// of a complete frame once one is present.
    fn receive_until<F>(&mut self, mut boundary: F) -> Result<Bytes, ServeError>
    where
        F: FnMut(&[u8]) -> Result<Option<usize>, ServeError>,
    {
        let mut chunk = [0u8; CHUNK_SIZE];

        loop {
            if let Some(end) = boundary(&self.buffer[..])? {
                return Ok(self.buffer.split_to(end).freeze());
            }

            let n = match self.reader.read(&mut chunk) {
                Ok(0) => {
                    return Err(ServeError::Transport(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "peer closed before message boundary",
                    )))
                }
                Ok(n) => n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }
}

fn find_terminator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}
