//! # mailstyler-template
//!
//! Data-bound HTML templates for email bodies.
//!
//! Templates are plain text with `{{ }}` actions:
//!
//! - field paths (`.Name`, `.User.Email`, `.`, `$.Root`) and variables
//!   (`$x := .Count`, `$x = add $x 1`)
//! - literals, function calls and `|` pipelines, where the previous result
//!   becomes the last argument
//! - `if` / `else if` / `else`, `range` (with `break` and `continue`),
//!   `with` / `else with`, `define`, `template` and `block`
//! - `{{/* comments */}}` and `{{-` / `-}}` whitespace trimming
//!
//! Output is HTML-escaped unless the value is [`Value::Html`]. Missing map
//! keys render as nothing.
//!
//! ## Example
//!
//! ```
//! use mailstyler_template::{FuncMap, Template, Value};
//!
//! let template = Template::parse(
//!     "greeting",
//!     "Hello {{.Name | toUpper}}{{range .Tags}} #{{.}}{{end}}",
//!     FuncMap::defaults(),
//! )?;
//! let data = Value::from_iter([
//!     ("Name", Value::from("Ann")),
//!     ("Tags", Value::from(vec!["<new>"])),
//! ]);
//! assert_eq!(template.execute(&data)?, "Hello ANN #&lt;new&gt;");
//! # Ok::<(), mailstyler_template::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod date;
mod error;
mod exec;
mod funcs;
mod lexer;
mod parser;
mod renderer;
mod template;
mod value;

pub use error::{Error, Result};
pub use exec::escape_html;
pub use funcs::{Func, FuncMap};
pub use renderer::TemplateRenderer;
pub use template::Template;
pub use value::Value;
