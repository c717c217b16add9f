//! HTTP/1.1 message engine.
//!
//! A deliberately small subset of HTTP/1.1 for constrained devices:
//!
//! ```text
//! Request:  METHOD SP path[?key=value&...] SP PROTOCOL CRLF (Name: Value CRLF)* CRLF [body]
//! Response: PROTOCOL SP status SP reason CRLF (Name: Value CRLF)* CRLF [body]
//! ```
//!
//! Bodies are framed only by `Content-Length`. There is no chunked transfer
//! encoding and no keep-alive: one request, one response, then close.

#![allow(dead_code)] // Full message API; the default handler only needs part of it

pub mod handler;
pub mod message;
pub mod parser;
pub mod status;

pub use handler::{bad_request, Handler, OkHandler};
pub use message::Message;
pub use parser::FormatError;
