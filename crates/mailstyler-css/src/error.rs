//! Error types for document parsing and style inlining.

use std::fmt;

/// Result type alias for inlining operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Position of an error in the source text (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Line number.
    pub line: usize,
    /// Column number, in characters.
    pub column: usize,
}

impl Location {
    /// Computes the location of a byte offset in `source`.
    #[must_use]
    pub fn of(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let column = before
            .rsplit('\n')
            .next()
            .map_or(0, |l| l.chars().count())
            + 1;
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors raised while parsing HTML or CSS.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The HTML cannot be turned into a document tree.
    #[error("HTML parse error at {location}: {message}")]
    DocumentParse {
        /// What went wrong.
        message: String,
        /// Where it went wrong.
        location: Location,
    },

    /// The stylesheet cannot be tokenized.
    #[error("Stylesheet parse error at {location}: {message}")]
    Stylesheet {
        /// What went wrong.
        message: String,
        /// Where it went wrong.
        location: Location,
    },
}

impl Error {
    pub(crate) fn document(message: impl Into<String>, source: &str, offset: usize) -> Self {
        Self::DocumentParse {
            message: message.into(),
            location: Location::of(source, offset),
        }
    }

    pub(crate) fn stylesheet(message: impl Into<String>, source: &str, offset: usize) -> Self {
        Self::Stylesheet {
            message: message.into(),
            location: Location::of(source, offset),
        }
    }

    /// Returns true for stylesheet errors.
    #[must_use]
    pub const fn is_stylesheet(&self) -> bool {
        matches!(self, Self::Stylesheet { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_of() {
        let src = "ab\ncdé\nf";
        assert_eq!(Location::of(src, 0), Location { line: 1, column: 1 });
        assert_eq!(Location::of(src, 4), Location { line: 2, column: 2 });
        assert_eq!(Location::of(src, src.len()), Location { line: 3, column: 2 });
    }
}
