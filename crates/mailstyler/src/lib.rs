//! # mailstyler
//!
//! Render data-bound HTML templates, inline their CSS and send the result as
//! a multipart message.
//!
//! ## Features
//!
//! - **Templates**: `{{ }}` actions with pipelines, conditionals, ranges and
//!   a default function registry that callers can extend
//! - **CSS inlining**: stylesheet rules resolved by specificity, `!important`
//!   and source order into per-element `style` attributes
//! - **Concurrent styling**: the template renders while the stylesheet loads
//! - **Envelope assembly**: HTML body, attachments and `cid:` inline images in
//!   one `multipart/mixed` message
//! - **Delivery**: SMTP with STARTTLS or implicit TLS, or any [`Transport`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailstyler::{MailMessage, Manager, ManagerConfig, Value};
//!
//! # async fn example() -> mailstyler::Result<()> {
//! let config = ManagerConfig::new("smtp.example.com", 587, "news@example.com")
//!     .password("app-password")
//!     .template_root("assets/templates")
//!     .css_root("assets/templates/css");
//! let manager = Manager::new(config)?;
//!
//! let data = Value::from_iter([("Name", "Ann")]);
//! let html = manager
//!     .render_template_with_css("welcome.html", "newsletter.css", data)
//!     .await?;
//!
//! let message = MailMessage::new("Welcome", html).to("ann@example.com");
//! manager.send_mail(&message).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod manager;
pub mod service;
pub mod transport;

pub use config::{ManagerConfig, ValidationResult};
pub use error::{ConfigError, Error, Result, Stage, StylesheetError, TemplateError, TransportError};
pub use manager::Manager;
pub use service::{CssTools, CssToolsService, StylesheetSource, TemplateService, Templates};
pub use transport::Transport;

// Re-export the types callers need to build requests.
pub use mailstyler_css::InlineOptions;
pub use mailstyler_mime::{Attachment, InlineImage, MailMessage};
pub use mailstyler_smtp::Security;
pub use mailstyler_template::{Func, FuncMap, Value};
