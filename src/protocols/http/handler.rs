//! Request handler hook.
//!
//! The serve loop hands every parsed request to a single [`Handler`] and
//! sends back whatever response it returns.

use super::message::Message;
use super::status::Status;

/// Protocol used when a request was too malformed to name its own.
pub const DEFAULT_PROTOCOL: &str = "HTTP/1.1";

/// Maps a parsed request to the response sent back to the client.
pub trait Handler {
    fn handle(&self, request: &Message) -> Message;
}

impl<F> Handler for F
where
    F: Fn(&Message) -> Message,
{
    fn handle(&self, request: &Message) -> Message {
        self(request)
    }
}

/// Answers every request with `200 OK`, echoing method, path and protocol.
/// No headers, no content.
#[derive(Debug, Clone, Copy, Default)]
pub struct OkHandler;

impl Handler for OkHandler {
    fn handle(&self, request: &Message) -> Message {
        Message::reply(request, Status::OK)
    }
}

/// Response sent for a request that could not be parsed. Echoes the
/// request's protocol when its request line named one.
pub fn bad_request(protocol: Option<&str>) -> Message {
    Message::response(
        "",
        "",
        protocol.unwrap_or(DEFAULT_PROTOCOL),
        Status::BAD_REQUEST,
    )
}
