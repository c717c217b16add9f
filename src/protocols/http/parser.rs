//! HTTP/1.1 request parser and message serializer.
//!
//! Parsing works on an already framed header block (request line, header
//! lines, blank line). Body bytes are attached separately once the framer has
//! read the length announced by [`content_length`].

use super::message::{Fields, Message};
use bytes::{Bytes, BytesMut};
use std::str;

/// Line terminator.
pub const CRLF: &str = "\r\n";

/// Separator between a header name and its value.
pub const HEADER_SEPARATOR: &str = ": ";

/// Header announcing the body length.
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Malformed message errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Header block is not valid UTF-8
    InvalidUtf8,
    /// Request line has fewer than three space-separated tokens
    MalformedRequestLine(String),
    /// Query piece without `=`
    MalformedParameter(String),
    /// Non-empty header line without `": "`
    MalformedHeader(String),
    /// Status code missing from the reason-phrase table
    UnknownStatus(String),
    /// Content-Length is not a decimal byte count
    InvalidContentLength(String),
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::InvalidUtf8 => write!(f, "Header block is not valid UTF-8"),
            FormatError::MalformedRequestLine(line) => {
                write!(f, "Malformed request line: {:?}", line)
            }
            FormatError::MalformedParameter(piece) => {
                write!(f, "Malformed query parameter: {:?}", piece)
            }
            FormatError::MalformedHeader(line) => write!(f, "Malformed header line: {:?}", line),
            FormatError::UnknownStatus(code) => write!(f, "Unknown status code: {}", code),
            FormatError::InvalidContentLength(value) => {
                write!(f, "Invalid Content-Length: {:?}", value)
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// Parse a framed header block into a request.
///
/// The returned request never has content attached.
pub fn parse(input: &[u8]) -> Result<Message, FormatError> {
    let text = str::from_utf8(input).map_err(|_| FormatError::InvalidUtf8)?;
    let mut lines = text.split(CRLF);

    let request_line = lines.next().unwrap_or_default();
    let tokens: Vec<&str> = request_line.split(' ').collect();
    if tokens.len() < 3 {
        return Err(FormatError::MalformedRequestLine(request_line.to_string()));
    }

    let (path, query) = match tokens[1].split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (tokens[1], None),
    };

    let mut request = Message::request(tokens[0], path, tokens[2]);
    if let Some(query) = query {
        request.set_parameters(parse_query(query)?);
    }
    request.set_headers(parse_headers(lines)?);

    Ok(request)
}

/// Protocol named by the request line of `input`, if it has the three tokens
/// `parse` requires. Usable even when the rest of the block is malformed.
pub fn request_protocol(input: &[u8]) -> Option<&str> {
    let end = input
        .windows(CRLF.len())
        .position(|window| window == CRLF.as_bytes())
        .unwrap_or(input.len());
    let request_line = str::from_utf8(&input[..end]).ok()?;
    request_line.split(' ').nth(2)
}

/// Split `key=value&key=value` into parameters. Only the first `=` of each
/// piece separates key from value.
fn parse_query(query: &str) -> Result<Fields, FormatError> {
    query
        .split('&')
        .map(|piece| {
            piece
                .split_once('=')
                .ok_or_else(|| FormatError::MalformedParameter(piece.to_string()))
        })
        .collect()
}

/// Header lines split on the first `": "`, so values may contain the separator.
fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Fields, FormatError> {
    lines
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split_once(HEADER_SEPARATOR)
                .ok_or_else(|| FormatError::MalformedHeader(line.to_string()))
        })
        .collect()
}

/// Declared body length of `message`.
///
/// Absent or `"0"` means there is no body to read.
pub fn content_length(message: &Message) -> Result<Option<usize>, FormatError> {
    match message.headers().get(CONTENT_LENGTH) {
        None | Some("0") => Ok(None),
        Some(value) => value
            .parse::<usize>()
            .map(Some)
            .map_err(|_| FormatError::InvalidContentLength(value.to_string())),
    }
}

/// Serialize a message to its wire form.
///
/// Requests start with `METHOD target PROTOCOL`, responses with
/// `PROTOCOL code reason`. Absent content contributes no bytes.
pub fn serialize(message: &Message) -> Bytes {
    let content_len = message.content().map_or(0, |c| c.len());
    let mut out = BytesMut::with_capacity(128 + content_len);

    match message.status() {
        Some(status) => {
            push_tokens(
                &mut out,
                &[message.protocol(), status.code(), status.reason()],
            );
        }
        None => {
            let target = request_target(message);
            push_tokens(&mut out, &[message.method(), target.as_str(), message.protocol()]);
        }
    }
    out.extend_from_slice(CRLF.as_bytes());

    for (name, value) in message.headers().iter() {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(HEADER_SEPARATOR.as_bytes());
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(CRLF.as_bytes());
    }
    out.extend_from_slice(CRLF.as_bytes());

    if let Some(content) = message.content() {
        out.extend_from_slice(content);
    }

    out.freeze()
}

/// Path plus `?key=value&...` in parameter order.
fn request_target(message: &Message) -> String {
    let mut target = message.path().to_string();
    for (i, (key, value)) in message.parameters().iter().enumerate() {
        target.push(if i == 0 { '?' } else { '&' });
        target.push_str(key);
        target.push('=');
        target.push_str(value);
    }
    target
}

fn push_tokens(out: &mut BytesMut, tokens: &[&str]) {
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(b" ");
        }
        out.extend_from_slice(token.as_bytes());
    }
}
