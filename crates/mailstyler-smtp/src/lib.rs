//! # mailstyler-smtp
//!
//! A small async SMTP submission client.
//!
//! ## Features
//!
//! - **Type-state session**: the compiler enforces EHLO → AUTH → MAIL → RCPT → DATA
//! - **TLS**: implicit TLS or STARTTLS through `rustls`
//! - **Authentication**: `AUTH PLAIN`, used only when a password is configured
//! - **Timeouts**: an optional limit on connecting and on every command round trip
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailstyler_smtp::{Security, SmtpConfig, SmtpTransport};
//!
//! # async fn run() -> mailstyler_smtp::Result<()> {
//! let config = SmtpConfig::new("smtp.example.com", 587)
//!     .credentials("reports@example.com", Some("app-password".into()))
//!     .security(Security::StartTls);
//!
//! let message = b"Subject: Test\r\n\r\nHello, World!\r\n";
//! SmtpTransport::new(config)
//!     .send("reports@example.com", &["alice@example.com".into()], message)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
mod transport;
pub mod types;

pub use connection::{Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded};
pub use error::{Error, Result};
pub use transport::{Security, SmtpConfig, SmtpTransport, deliver, parse_envelope};
pub use types::{Address, Extension, Reply, ReplyClass, ReplyCode, ServerInfo};
