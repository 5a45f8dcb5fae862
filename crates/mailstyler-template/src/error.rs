//! Template error types.

use std::io;
use std::path::PathBuf;

/// Result type alias for template operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading, parsing or executing a template.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The template file does not exist.
    #[error("template {name:?} not found at {}", path.display())]
    NotFound {
        /// Template name as requested.
        name: String,
        /// Resolved file path.
        path: PathBuf,
    },

    /// The template source is malformed.
    #[error("template: {name}:{line}: {message}")]
    Parse {
        /// Template name.
        name: String,
        /// 1-based line of the offending action.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Executing the template against its data failed.
    #[error("template: {name}:{line}: executing: {message}")]
    Execution {
        /// Template name.
        name: String,
        /// 1-based line of the failing action.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// The template file exists but cannot be read.
    #[error("failed to read template {name:?}")]
    Io {
        /// Template name.
        name: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn parse(name: &str, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            name: name.to_string(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn execution(name: &str, line: usize, message: impl Into<String>) -> Self {
        Self::Execution {
            name: name.to_string(),
            line,
            message: message.into(),
        }
    }

    /// Returns the template name the error belongs to.
    #[must_use]
    pub fn template_name(&self) -> &str {
        match self {
            Self::NotFound { name, .. }
            | Self::Parse { name, .. }
            | Self::Execution { name, .. }
            | Self::Io { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::parse("hello.html", 3, "unexpected {{end}}");
        assert_eq!(err.to_string(), "template: hello.html:3: unexpected {{end}}");

        let err = Error::execution("hello.html", 1, "index out of range: 4");
        assert_eq!(
            err.to_string(),
            "template: hello.html:1: executing: index out of range: 4"
        );
        assert_eq!(err.template_name(), "hello.html");
    }
}
