//! Rendering services.
//!
//! [`Templates`] renders plain HTML. [`CssTools`] renders a template and
//! inlines a stylesheet into the result; its default implementation,
//! [`CssToolsService`], delegates rendering to a [`Templates`] and loads
//! the stylesheet at the same time.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use mailstyler_css::InlineOptions;
use mailstyler_template::{FuncMap, TemplateRenderer, Value};
use tokio::task::{self, JoinError};
use tracing::debug;

use crate::error::{Error, Result, Stage, StylesheetError, TemplateError};

/// Renders named templates to HTML.
pub trait Templates: Send + Sync {
    /// Renders `name` with builtin functions only.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is missing or fails to parse or execute.
    fn render_template(&self, name: &str, data: &Value) -> std::result::Result<String, TemplateError>;

    /// Renders `name` with the default functions plus `funcs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is missing or fails to parse or execute.
    fn render_template_with_funcs(
        &self,
        name: &str,
        data: &Value,
        funcs: Option<&FuncMap>,
    ) -> std::result::Result<String, TemplateError>;
}

/// File-backed [`Templates`].
#[derive(Debug, Clone)]
pub struct TemplateService {
    renderer: TemplateRenderer,
}

impl TemplateService {
    /// Creates a service for templates under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            renderer: TemplateRenderer::new(root),
        }
    }

    /// Wraps an existing renderer.
    #[must_use]
    pub const fn with_renderer(renderer: TemplateRenderer) -> Self {
        Self { renderer }
    }
}

impl Templates for TemplateService {
    fn render_template(&self, name: &str, data: &Value) -> std::result::Result<String, TemplateError> {
        self.renderer.render(name, data)
    }

    fn render_template_with_funcs(
        &self,
        name: &str,
        data: &Value,
        funcs: Option<&FuncMap>,
    ) -> std::result::Result<String, TemplateError> {
        self.renderer.render_with_funcs(name, data, funcs)
    }
}

/// Reads stylesheets from a directory. Nothing is cached.
#[derive(Debug, Clone)]
pub struct StylesheetSource {
    root: PathBuf,
}

impl StylesheetSource {
    /// Creates a source for stylesheets under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the stylesheet directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads the stylesheet `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StylesheetError::NotFound`] when the file does not exist and
    /// [`StylesheetError::Io`] when it cannot be read.
    pub async fn load(&self, name: &str) -> std::result::Result<String, StylesheetError> {
        let path = self.root.join(name);
        tokio::fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StylesheetError::NotFound {
                    name: name.to_string(),
                    path,
                }
            } else {
                StylesheetError::Io {
                    name: name.to_string(),
                    source,
                }
            }
        })
    }
}

/// Renders templates with their stylesheet inlined.
#[async_trait]
pub trait CssTools: Send + Sync {
    /// Renders `template` with builtin functions and inlines `stylesheet`.
    ///
    /// # Errors
    ///
    /// A render error is reported in preference to a stylesheet error.
    async fn render_template_with_css(
        &self,
        template: &str,
        stylesheet: &str,
        data: Value,
    ) -> Result<String>;

    /// Renders `template` with the default functions plus `funcs` and
    /// inlines `stylesheet`.
    ///
    /// # Errors
    ///
    /// A render error is reported in preference to a stylesheet error.
    async fn render_template_with_funcs_and_css(
        &self,
        template: &str,
        stylesheet: &str,
        data: Value,
        funcs: Option<FuncMap>,
    ) -> Result<String>;
}

/// Default [`CssTools`]: renders through a [`Templates`] while the
/// stylesheet loads, then inlines on the blocking pool.
#[derive(Clone)]
pub struct CssToolsService {
    templates: Arc<dyn Templates>,
    stylesheets: StylesheetSource,
    options: InlineOptions,
}

impl std::fmt::Debug for CssToolsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CssToolsService")
            .field("stylesheets", &self.stylesheets)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CssToolsService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        templates: Arc<dyn Templates>,
        stylesheets: StylesheetSource,
        options: InlineOptions,
    ) -> Self {
        Self {
            templates,
            stylesheets,
            options,
        }
    }

    async fn render_styled<F>(&self, operation: &'static str, stylesheet: &str, render: F) -> Result<String>
    where
        F: FnOnce() -> std::result::Result<String, TemplateError> + Send + 'static,
    {
        let started = Instant::now();

        let rendering = task::spawn_blocking(render);
        let source = self.stylesheets.clone();
        let name = stylesheet.to_string();
        let loading = tokio::spawn(async move { source.load(&name).await });
        let (rendered, loaded) = tokio::join!(rendering, loading);

        // Render failures win over stylesheet failures.
        let html = rendered.map_err(|err| task_failed(Stage::Render, &err))??;
        let css = loaded.map_err(|err| task_failed(Stage::Stylesheet, &err))??;

        let options = self.options.clone();
        let styled = task::spawn_blocking(move || mailstyler_css::inline(&html, &css, &options))
            .await
            .map_err(|err| task_failed(Stage::Inline, &err))?
            .map_err(Error::inline)?;

        debug!(operation, stylesheet, elapsed = ?started.elapsed(), "Styled render completed");
        Ok(styled)
    }
}

#[async_trait]
impl CssTools for CssToolsService {
    async fn render_template_with_css(
        &self,
        template: &str,
        stylesheet: &str,
        data: Value,
    ) -> Result<String> {
        let templates = Arc::clone(&self.templates);
        let name = template.to_string();
        self.render_styled("render_template_with_css", stylesheet, move || {
            templates.render_template(&name, &data)
        })
        .await
    }

    async fn render_template_with_funcs_and_css(
        &self,
        template: &str,
        stylesheet: &str,
        data: Value,
        funcs: Option<FuncMap>,
    ) -> Result<String> {
        let templates = Arc::clone(&self.templates);
        let name = template.to_string();
        self.render_styled("render_template_with_funcs_and_css", stylesheet, move || {
            templates.render_template_with_funcs(&name, &data, funcs.as_ref())
        })
        .await
    }
}

fn task_failed(stage: Stage, err: &JoinError) -> Error {
    let message = if err.is_cancelled() {
        "cancelled".to_string()
    } else {
        err.to_string()
    };
    Error::Task { stage, message }
}
