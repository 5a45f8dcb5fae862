//! Error types for envelope operations.

use std::string::FromUtf8Error;

/// Result type alias for envelope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Envelope error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The boundary token occurs inside the body or a part payload.
    #[error("Boundary collision: token {boundary} occurs in {location}")]
    BoundaryCollision {
        /// The colliding token.
        boundary: String,
        /// Where the token was found (e.g. "HTML body", "attachment report.pdf").
        location: String,
    },

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// Missing boundary in multipart message.
    #[error("Missing boundary in multipart message")]
    MissingBoundary,

    /// Invalid multipart structure.
    #[error("Invalid multipart structure: {0}")]
    InvalidMultipart(String),
}
