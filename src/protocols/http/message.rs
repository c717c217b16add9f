//! Message model shared by requests and responses.
//!
//! A [`Message`] carries the common field set of an HTTP exchange. Whether it
//! is a request or a response is decided by its [`Kind`]; only responses carry
//! a [`Status`].
//!
//! Text fields, the field maps and the content are *set-once*: they may be
//! given at construction or assigned later through the `set_*` methods, but an
//! assignment onto a non-empty value is ignored.

use super::parser;
use super::status::Status;
use bytes::Bytes;
use std::fmt;

/// Ordered name/value pairs with unique names.
///
/// Used for both header fields and query parameters. Inserting an existing
/// name replaces its value in place, so iteration follows the order in which
/// names were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    entries: Vec<(String, String)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning the previous value when the name was present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.as_str() == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<N, V> FromIterator<(N, V)> for Fields
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

/// Which side of the exchange a message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Request,
    Response(Status),
}

/// An HTTP request or response.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    kind: Kind,
    method: String,
    host: String,
    path: String,
    protocol: String,
    headers: Fields,
    parameters: Fields,
    content: Option<Bytes>,
}

impl Message {
    /// Create a request with empty headers, no parameters and no content.
    pub fn request(
        method: impl Into<String>,
        path: impl Into<String>,
        protocol: impl Into<String>,
    ) -> Self {
        Self {
            kind: Kind::Request,
            method: method.into(),
            host: String::new(),
            path: path.into(),
            protocol: protocol.into(),
            headers: Fields::new(),
            parameters: Fields::new(),
            content: None,
        }
    }

    /// Create a response. The method and path are kept for logging; only the
    /// protocol and status reach the wire.
    pub fn response(
        method: impl Into<String>,
        path: impl Into<String>,
        protocol: impl Into<String>,
        status: Status,
    ) -> Self {
        Self {
            kind: Kind::Response(status),
            ..Self::request(method, path, protocol)
        }
    }

    /// Answer `request` with `status`, echoing its method, path and protocol.
    pub fn reply(request: &Message, status: Status) -> Self {
        Self::response(
            request.method.as_str(),
            request.path.as_str(),
            request.protocol.as_str(),
            status,
        )
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_response(&self) -> bool {
        matches!(self.kind, Kind::Response(_))
    }

    pub fn status(&self) -> Option<Status> {
        match self.kind {
            Kind::Response(status) => Some(status),
            Kind::Request => None,
        }
    }

    /// Reason phrase of a response's status.
    pub fn reason(&self) -> Option<&'static str> {
        self.status().map(|status| status.reason())
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn headers(&self) -> &Fields {
        &self.headers
    }

    pub fn parameters(&self) -> &Fields {
        &self.parameters
    }

    /// Body bytes. `None` means no body was ever attached, which is distinct
    /// from an attached zero-length body.
    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn set_method(&mut self, method: impl Into<String>) -> bool {
        set_once(&mut self.method, method.into())
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> bool {
        set_once(&mut self.host, host.into())
    }

    pub fn set_path(&mut self, path: impl Into<String>) -> bool {
        set_once(&mut self.path, path.into())
    }

    pub fn set_protocol(&mut self, protocol: impl Into<String>) -> bool {
        set_once(&mut self.protocol, protocol.into())
    }

    /// Replace the header map if it is still empty. Returns whether it was applied.
    pub fn set_headers(&mut self, headers: Fields) -> bool {
        if !self.headers.is_empty() {
            return false;
        }
        self.headers = headers;
        true
    }

    pub fn set_parameters(&mut self, parameters: Fields) -> bool {
        if !self.parameters.is_empty() {
            return false;
        }
        self.parameters = parameters;
        true
    }

    /// Attach content unless non-empty content is already present.
    pub fn set_content(&mut self, content: impl Into<Bytes>) -> bool {
        if matches!(&self.content, Some(existing) if !existing.is_empty()) {
            return false;
        }
        self.content = Some(content.into());
        true
    }

    pub fn with_headers(mut self, headers: Fields) -> Self {
        self.set_headers(headers);
        self
    }

    pub fn with_parameters(mut self, parameters: Fields) -> Self {
        self.set_parameters(parameters);
        self
    }

    pub fn with_content(mut self, content: impl Into<Bytes>) -> Self {
        self.set_content(content);
        self
    }

    /// Wire form of this message.
    pub fn to_bytes(&self) -> Bytes {
        parser::serialize(self)
    }
}

fn set_once(slot: &mut String, value: String) -> bool {
    if !slot.is_empty() {
        return false;
    }
    *slot = value;
    true
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(if self.is_response() {
            "Response"
        } else {
            "Request"
        });
        out.field("method", &self.method)
            .field("host", &self.host)
            .field("path", &self.path)
            .field("parameters", &self.parameters)
            .field("protocol", &self.protocol);
        if let Kind::Response(status) = self.kind {
            out.field("status", &status.code())
                .field("message", &status.reason());
        }
        out.field("headers", &self.headers)
            .field("content", &self.content)
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}
