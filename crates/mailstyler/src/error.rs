//! Error types for the mail pipeline.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use mailstyler_smtp::Error as TransportError;
pub use mailstyler_template::Error as TemplateError;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Configuration checks in [`Manager::new`](crate::Manager::new).
    Config,
    /// Template rendering.
    Render,
    /// Stylesheet loading.
    Stylesheet,
    /// HTML parsing and style inlining.
    Inline,
    /// Envelope assembly.
    Assembly,
    /// Delivery.
    Transport,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Config => "config",
            Self::Render => "render",
            Self::Stylesheet => "stylesheet",
            Self::Inline => "inline",
            Self::Assembly => "assembly",
            Self::Transport => "transport",
        })
    }
}

/// Configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// SMTP server is empty.
    #[error("SMTP server is required")]
    EmptyServer,
    /// SMTP port is zero.
    #[error("SMTP port must be 1-65535")]
    InvalidPort,
    /// Sender address is empty.
    #[error("SMTP sender is required")]
    EmptySender,
    /// Sender address is malformed.
    #[error("Invalid sender address: {0}")]
    InvalidSender(String),
    /// Timeout of zero seconds.
    #[error("Timeout must be at least one second")]
    ZeroTimeout,
}

impl ConfigError {
    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyServer => "smtp_server",
            Self::InvalidPort => "smtp_port",
            Self::EmptySender | Self::InvalidSender(_) => "smtp_sender",
            Self::ZeroTimeout => "timeout_secs",
        }
    }
}

/// Stylesheet problem.
#[derive(Debug, Error)]
pub enum StylesheetError {
    /// The stylesheet file does not exist.
    #[error("Stylesheet {name:?} not found at {}", path.display())]
    NotFound {
        /// Stylesheet name as requested.
        name: String,
        /// Resolved file path.
        path: PathBuf,
    },

    /// The stylesheet cannot be tokenized, or (in strict mode) has a
    /// malformed rule.
    #[error("Stylesheet parse error: {0}")]
    Parse(#[source] mailstyler_css::Error),

    /// The stylesheet exists but cannot be read.
    #[error("Failed to read stylesheet {name:?}")]
    Io {
        /// Stylesheet name.
        name: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Errors that can occur in the mail pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template loading, parsing or execution failed.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Stylesheet loading or parsing failed.
    #[error("{0}")]
    Stylesheet(#[from] StylesheetError),

    /// The rendered HTML cannot be parsed.
    #[error("Document error: {0}")]
    Document(#[source] mailstyler_css::Error),

    /// Envelope assembly failed.
    #[error("Assembly error: {0}")]
    Assembly(#[from] mailstyler_mime::Error),

    /// Delivery failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A background task panicked or was cancelled.
    #[error("{stage} task failed: {message}")]
    Task {
        /// Stage the task was running.
        stage: Stage,
        /// Panic message.
        message: String,
    },
}

impl Error {
    /// Classifies an inlining failure by what could not be parsed.
    pub(crate) fn inline(err: mailstyler_css::Error) -> Self {
        if err.is_stylesheet() {
            Self::Stylesheet(StylesheetError::Parse(err))
        } else {
            Self::Document(err)
        }
    }

    /// Returns the pipeline stage that failed.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Config,
            Self::Template(_) => Stage::Render,
            Self::Stylesheet(_) => Stage::Stylesheet,
            Self::Document(_) => Stage::Inline,
            Self::Assembly(_) => Stage::Assembly,
            Self::Transport(_) => Stage::Transport,
            Self::Task { stage, .. } => *stage,
        }
    }
}
