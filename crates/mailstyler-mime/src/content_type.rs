//! MIME content type handling.

use crate::error::{Error, Result};
use std::fmt;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters in declaration order (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Adds a parameter, replacing an existing one with the same name.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into().to_lowercase();
        let value = value.into();
        match self.parameters.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.parameters.push((key, value)),
        }
        self
    }

    /// Returns a parameter value by (case-insensitive) name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary")
    }

    /// Returns the bare `type/subtype` string.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Parses a `Content-Type` value such as `text/html; charset="UTF-8"`.
    ///
    /// Type and subtype are lowercased. Quoted parameter values may contain
    /// `;` and backslash escapes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentType`] when the `type/subtype` part is
    /// missing or empty.
    pub fn parse(s: &str) -> Result<Self> {
        let (essence, mut rest) = s.split_once(';').unwrap_or((s, ""));
        let (main_type, sub_type) = essence
            .split_once('/')
            .map(|(m, t)| (m.trim().to_lowercase(), t.trim().to_lowercase()))
            .filter(|(m, t)| !m.is_empty() && !t.is_empty())
            .ok_or_else(|| Error::InvalidContentType(format!("expected type/subtype in {s:?}")))?;

        let mut content_type = Self::new(main_type, sub_type);
        while !rest.is_empty() {
            let (param, tail) = next_parameter(rest);
            rest = tail;
            if let Some((key, value)) = param {
                content_type = content_type.with_parameter(key, value);
            }
        }
        Ok(content_type)
    }
}

/// Splits one `key=value` parameter off the front of `input`.
fn next_parameter(input: &str) -> (Option<(&str, String)>, &str) {
    let input = input.trim_start();
    let Some((key, after_eq)) = input.split_once('=') else {
        // A bare token with no value: skip to the next separator.
        return (None, input.split_once(';').map_or("", |(_, r)| r));
    };
    if key.contains(';') {
        return (None, input.split_once(';').map_or("", |(_, r)| r));
    }

    let after_eq = after_eq.trim_start();
    let Some(quoted) = after_eq.strip_prefix('"') else {
        let (value, rest) = after_eq.split_once(';').unwrap_or((after_eq, ""));
        return (Some((key.trim(), value.trim().to_string())), rest);
    };

    let mut value = String::new();
    let mut chars = quoted.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    value.push(escaped);
                }
            }
            '"' => {
                let rest = &quoted[i + 1..];
                let rest = rest.split_once(';').map_or("", |(_, r)| r);
                return (Some((key.trim(), value)), rest);
            }
            _ => value.push(c),
        }
    }
    // Unterminated quote: keep what was read.
    (Some((key.trim(), value)), "")
}

/// RFC 2045 `tspecials`, plus whitespace.
fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "()<>@,;:\\\"/[]?=".contains(c))
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            if needs_quoting(value) {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {key}=\"{escaped}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_mixed() {
        let ct = ContentType::multipart_mixed("boundary123");
        assert_eq!(ct.mime_type(), "multipart/mixed");
        assert_eq!(ct.boundary(), Some("boundary123"));
        assert!(ct.is_multipart());
        assert_eq!(ct.to_string(), "multipart/mixed; boundary=boundary123");
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/HTML; charset=\"UTF-8\"").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "html");
        assert_eq!(ct.charset(), Some("UTF-8"));
    }

    #[test]
    fn test_content_type_parse_quoted_boundary() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
        assert_eq!(
            ct.to_string(),
            "multipart/mixed; boundary=\"----=_Part_123\""
        );
    }

    #[test]
    fn test_content_type_parse_invalid() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("/html").is_err());
    }

    #[test]
    fn test_quoted_parameters_keep_separators() {
        let ct = ContentType::parse(r#"application/pdf; name="a; b \"c\".pdf"; x=1"#).unwrap();
        assert_eq!(ct.parameter("name"), Some(r#"a; b "c".pdf"#));
        assert_eq!(ct.parameter("x"), Some("1"));
        assert_eq!(ct.to_string(), r#"application/pdf; name="a; b \"c\".pdf"; x=1"#);
    }

    #[test]
    fn test_bare_tokens_are_ignored() {
        let ct = ContentType::parse("text/plain; flowed; charset=utf-8").unwrap();
        assert_eq!(ct.parameters, vec![("charset".to_string(), "utf-8".to_string())]);
    }

    #[test]
    fn test_with_parameter_replaces() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "iso-8859-1")
            .with_parameter("Charset", "utf-8");
        assert_eq!(ct.parameters.len(), 1);
        assert_eq!(ct.charset(), Some("utf-8"));
    }
}
