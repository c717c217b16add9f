//! Protocol implementations.
//!
//! - `http`: HTTP/1.1 request/response model, parser and handler hook
//!   used by the serve loop.

pub mod http;
