//! Status codes and their reason phrases.

use super::parser::FormatError;
use std::fmt;

/// Every status code a response may carry, with its fixed reason phrase.
const REASON_PHRASES: &[(&str, &str)] = &[
    ("100", "Continue"),
    ("101", "Switching Protocols"),
    ("102", "Processing"),
    ("200", "OK"),
    ("201", "Created"),
    ("202", "Accepted"),
    ("204", "No Content"),
    ("206", "Partial Content"),
    ("300", "Multiple Choice"),
    ("301", "Moved Permanently"),
    ("302", "Found"),
    ("400", "Bad Request"),
    ("401", "Unauthorized"),
    ("403", "Forbidden"),
    ("404", "Not Found"),
    ("409", "Conflict"),
];

/// A status code known to the reason-phrase table.
///
/// Values can only be obtained through [`Status::from_code`] or the
/// associated constants, so a `Status` always renders a valid status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    code: &'static str,
    reason: &'static str,
}

impl Status {
    pub const OK: Status = Status {
        code: "200",
        reason: "OK",
    };

    pub const BAD_REQUEST: Status = Status {
        code: "400",
        reason: "Bad Request",
    };

    /// Look up a three-digit code. Codes outside the table are rejected.
    pub fn from_code(code: &str) -> Result<Self, FormatError> {
        REASON_PHRASES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|&(code, reason)| Status { code, reason })
            .ok_or_else(|| FormatError::UnknownStatus(code.to_string()))
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}
