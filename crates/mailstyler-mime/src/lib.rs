//! # mailstyler-mime
//!
//! Multipart envelope assembly for styled HTML mail.
//!
//! ## Features
//!
//! - **Envelope assembly**: one HTML part followed by attachment and inline-image parts
//!   inside a `multipart/mixed` body
//! - **Content sniffing**: part content types come from the payload's leading bytes,
//!   not from file names
//! - **Inline images**: `Content-ID` headers so the HTML body can reference payloads
//!   with `cid:` URLs
//! - **Inspection**: assembled bytes can be parsed back into headers and parts
//!
//! ## Quick Start
//!
//! ```
//! use mailstyler_mime::{Attachment, Envelope, MailMessage};
//!
//! let message = MailMessage::new("Report", "<p>See attached.</p>")
//!     .to("alice@example.com")
//!     .attach(Attachment::new("notes.txt", b"hello".to_vec()));
//!
//! let bytes = Envelope::assemble(&message, "reports@example.com")?;
//! let parsed = Envelope::parse(&bytes)?;
//! assert_eq!(parsed.parts.len(), 2);
//! # Ok::<(), mailstyler_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod envelope;
mod error;
mod header;
mod message;
mod sniff;

pub mod encoding;

pub use content_type::ContentType;
pub use envelope::{Boundary, Envelope, ParsedEnvelope, Part, TransferEncoding};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Attachment, InlineImage, MailMessage};
pub use sniff::{OCTET_STREAM, detect_content_type};
