//! File-backed template rendering.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::debug;

use crate::error::{Error, Result};
use crate::funcs::FuncMap;
use crate::template::Template;
use crate::value::Value;

/// Loads templates from a directory and renders them.
///
/// Files are read on every call; nothing is cached.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    root: PathBuf,
    defaults: FuncMap,
}

impl TemplateRenderer {
    /// Creates a renderer for templates under `root`, with the default
    /// function registry.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_defaults(root, FuncMap::defaults())
    }

    /// Creates a renderer with a custom default registry.
    #[must_use]
    pub fn with_defaults(root: impl Into<PathBuf>, defaults: FuncMap) -> Self {
        Self {
            root: root.into(),
            defaults,
        }
    }

    /// Returns the template directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the default function registry.
    #[must_use]
    pub const fn defaults(&self) -> &FuncMap {
        &self.defaults
    }

    /// Renders `name` with builtins only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, or if parsing
    /// or execution fails. Calling a default function is a parse error.
    pub fn render(&self, name: &str, data: &Value) -> Result<String> {
        self.render_inner(name, data, FuncMap::new())
    }

    /// Renders `name` with the default registry merged with `funcs`.
    /// Entries of `funcs` override defaults of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, or if parsing
    /// or execution fails.
    pub fn render_with_funcs(
        &self,
        name: &str,
        data: &Value,
        funcs: Option<&FuncMap>,
    ) -> Result<String> {
        let mut merged = self.defaults.clone();
        if let Some(funcs) = funcs {
            merged.extend(funcs);
        }
        self.render_inner(name, data, merged)
    }

    fn render_inner(&self, name: &str, data: &Value, funcs: FuncMap) -> Result<String> {
        let started = Instant::now();
        let source = self.load(name)?;
        let html = Template::parse(name, &source, funcs)?.execute(data)?;
        debug!(template = name, bytes = html.len(), elapsed = ?started.elapsed(), "Template rendered");
        Ok(html)
    }

    fn load(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                Error::NotFound {
                    name: name.to_string(),
                    path,
                }
            } else {
                Error::Io {
                    name: name.to_string(),
                    source,
                }
            }
        })
    }
}
