//! Server replies (RFC 5321 section 4.2).

use std::fmt;

use crate::error::Error;

/// Reply category, taken from the first digit of the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// 2yz: the command was accepted.
    Completed,
    /// 3yz: more input is expected (`DATA`, `AUTH` challenges).
    Intermediate,
    /// 4yz: try again later.
    Transient,
    /// 5yz: do not retry.
    Permanent,
}

/// Three-digit reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Greeting and post-STARTTLS go-ahead.
    pub const SERVICE_READY: Self = Self(220);
    /// Answer to `QUIT`.
    pub const CLOSING: Self = Self(221);
    /// Answer to `DATA` before the payload is sent.
    pub const START_DATA: Self = Self(354);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the category, or `None` for codes outside 200-599.
    #[must_use]
    pub const fn class(self) -> Option<ReplyClass> {
        match self.0 / 100 {
            2 => Some(ReplyClass::Completed),
            3 => Some(ReplyClass::Intermediate),
            4 => Some(ReplyClass::Transient),
            5 => Some(ReplyClass::Permanent),
            _ => None,
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// A complete, possibly multiline, reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code shared by every line.
    pub code: ReplyCode,
    /// Text after the code on each line.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true for a 2yz reply.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code.class(), Some(ReplyClass::Completed))
    }

    /// Returns the reply lines joined with newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.message.join("\n")
    }

    /// Turns an unexpected reply to `command` into an error.
    pub(crate) fn rejected(&self, command: &'static str) -> Error {
        Error::rejected(command, self.code.as_u16(), self.text())
    }
}
