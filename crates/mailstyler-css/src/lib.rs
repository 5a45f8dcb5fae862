//! # mailstyler-css
//!
//! CSS cascade resolution and style inlining for HTML email.
//!
//! ## Features
//!
//! - **Document model**: a lenient HTML tree that serializes back to the markup it was
//!   parsed from
//! - **Stylesheet parsing**: type, class, id and universal selectors with descendant and
//!   child combinators; unsupported rules are skipped, at-rules are kept aside
//! - **Cascade**: `!important`, inline styles, specificity and source order
//! - **Email output**: `style` attributes, optional legacy attributes (`width`,
//!   `bgcolor`, `align`, `valign`) on tables and images
//!
//! ## Quick Start
//!
//! ```
//! use mailstyler_css::{InlineOptions, inline};
//!
//! let html = "<html><body><td class=\"cell\">42</td></body></html>";
//! let css = "td { padding: 4px } .cell { text-align: right }";
//!
//! let styled = inline(html, css, &InlineOptions::default())?;
//! assert!(styled.contains(r#"style="padding: 4px; text-align: right;""#));
//! # Ok::<(), mailstyler_css::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cascade;
mod error;
mod inliner;
mod selector;
mod stylesheet;

pub mod document;

pub use document::{Attribute, Document, Element, Node};
pub use error::{Error, Location, Result};
pub use inliner::{InlineOptions, inline, inline_document};
pub use selector::{Selector, Specificity};
pub use stylesheet::{Declaration, SkippedRule, StyleRule, Stylesheet, parse_declarations};
