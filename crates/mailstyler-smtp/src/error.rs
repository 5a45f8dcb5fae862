//! Error types for SMTP delivery.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS setup or handshake failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Server rejected a command.
    #[error("{command} rejected with {code}: {message}")]
    Rejected {
        /// Command verb that was rejected (e.g. `RCPT`).
        command: &'static str,
        /// Reply code (e.g., 550).
        code: u16,
        /// Reply text from the server.
        message: String,
    },

    /// Server sent something that is not a valid reply.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// No recipients were given.
    #[error("No recipients specified")]
    NoRecipients,

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Credentials would travel over an unencrypted connection to a remote host.
    #[error("Refusing to authenticate to {0} over an unencrypted connection")]
    InsecureAuth(String),

    /// A command did not complete in time.
    #[error("SMTP command timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Creates a rejection error from a command and reply.
    #[must_use]
    pub fn rejected(command: &'static str, code: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            command,
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 400 && *code < 500)
    }
}
