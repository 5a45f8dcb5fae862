//! HTML tokenizer.
//!
//! Splits markup into tags, text, comments and declarations. Text is kept
//! verbatim (entities are not decoded). The contents of raw-text elements
//! (`script`, `style`, `textarea`, `title`) are emitted as a single text token.

use super::node::{Attribute, Quote};
use crate::error::{Error, Result};

/// Elements whose content is not parsed as markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// A lexical HTML token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Doctype(String),
    Comment(String),
    StartTag {
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag(String),
    Text(String),
}

/// HTML tokenizer state.
pub(crate) struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    raw_text_end: Option<String>,
}

impl<'a> Tokenizer<'a> {
    pub(crate) const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_text_end: None,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes()[self.pos..].starts_with(s.as_bytes())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.input[from..].find(needle).map(|p| p + from)
    }

    fn error(&self, message: &str, offset: usize) -> Error {
        Error::document(message, self.input, offset)
    }

    /// Returns the next token, or `None` at end of input.
    pub(crate) fn next_token(&mut self) -> Result<Option<Token>> {
        if let Some(name) = self.raw_text_end.take() {
            let text = self.raw_text(&name);
            if !text.is_empty() {
                return Ok(Some(Token::Text(text)));
            }
        }

        if self.pos >= self.input.len() {
            return Ok(None);
        }

        if self.peek() == Some(b'<') && self.at_markup() {
            return self.markup().map(Some);
        }

        Ok(Some(Token::Text(self.text())))
    }

    fn at_markup(&self) -> bool {
        match self.peek_at(1) {
            Some(b'!') => true,
            Some(b'/') => self.peek_at(2).is_some_and(|b| b.is_ascii_alphabetic()),
            Some(b) => b.is_ascii_alphabetic(),
            None => false,
        }
    }

    fn text(&mut self) -> String {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek() {
            if b == b'<' && self.at_markup() {
                break;
            }
            self.pos += 1;
        }
        self.input[start..self.pos].to_string()
    }

    fn raw_text(&mut self, name: &str) -> String {
        let start = self.pos;
        let closing = format!("</{name}");
        let end = self.bytes()[start..]
            .windows(closing.len())
            .position(|w| w.eq_ignore_ascii_case(closing.as_bytes()))
            .map_or(self.input.len(), |p| p + start);
        self.pos = end;
        self.input[start..end].to_string()
    }

    fn markup(&mut self) -> Result<Token> {
        let open = self.pos;

        if self.starts_with("<!--") {
            let body_start = open + 4;
            let end = self
                .find_from(body_start, "-->")
                .ok_or_else(|| self.error("unterminated comment", open))?;
            self.pos = end + 3;
            return Ok(Token::Comment(self.input[body_start..end].to_string()));
        }

        if self.starts_with("<!") {
            let end = self
                .find_from(open + 2, ">")
                .ok_or_else(|| self.error("unterminated declaration", open))?;
            self.pos = end + 1;
            return Ok(Token::Doctype(self.input[open + 2..end].to_string()));
        }

        if self.starts_with("</") {
            self.pos += 2;
            let name = self.read_name();
            let end = self
                .find_from(self.pos, ">")
                .ok_or_else(|| self.error("unterminated end tag", open))?;
            self.pos = end + 1;
            return Ok(Token::EndTag(name));
        }

        self.start_tag(open)
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b':' | b'_'))
        {
            self.pos += 1;
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn start_tag(&mut self, open: usize) -> Result<Token> {
        self.pos += 1;
        let name = self.read_name();
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error(&format!("unterminated <{name}> tag"), open)),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    self_closing = true;
                    break;
                }
                Some(b'/') => self.pos += 1,
                Some(_) => attrs.push(self.attribute(open)?),
            }
        }

        if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_text_end = Some(name.clone());
        }

        Ok(Token::StartTag {
            name,
            attrs,
            self_closing,
        })
    }

    fn attribute(&mut self, open: usize) -> Result<Attribute> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            let stop = b.is_ascii_whitespace() || b == b'>' || b == b'/' || (b == b'=' && self.pos > start);
            if stop {
                break;
            }
            self.pos += 1;
        }
        let name = self.input[start..self.pos].to_ascii_lowercase();

        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            return Ok(Attribute {
                name,
                value: None,
                quote: Quote::Unquoted,
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let (value, quote) = match self.peek() {
            None => return Err(self.error("unterminated tag", open)),
            Some(q @ (b'"' | b'\'')) => {
                let value_start = self.pos + 1;
                let delimiter = if q == b'"' { "\"" } else { "'" };
                let end = self
                    .find_from(value_start, delimiter)
                    .ok_or_else(|| self.error("unterminated attribute value", self.pos))?;
                self.pos = end + 1;
                let quote = if q == b'"' { Quote::Double } else { Quote::Single };
                (self.input[value_start..end].to_string(), quote)
            }
            Some(_) => {
                let value_start = self.pos;
                while self
                    .peek()
                    .is_some_and(|b| !b.is_ascii_whitespace() && b != b'>')
                {
                    self.pos += 1;
                }
                (self.input[value_start..self.pos].to_string(), Quote::Unquoted)
            }
        };

        Ok(Attribute {
            name,
            value: Some(value),
            quote,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(input);
        let mut out = Vec::new();
        while let Some(token) = tokenizer.next_token().unwrap() {
            out.push(token);
        }
        out
    }

    #[test]
    fn test_tags_and_text() {
        let toks = tokens("<P Class='a'>Hi &amp; bye</p>");
        assert_eq!(toks.len(), 3);
        match &toks[0] {
            Token::StartTag { name, attrs, .. } => {
                assert_eq!(name, "p");
                assert_eq!(attrs[0].name, "class");
                assert_eq!(attrs[0].value.as_deref(), Some("a"));
                assert_eq!(attrs[0].quote, Quote::Single);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(toks[1], Token::Text("Hi &amp; bye".to_string()));
        assert_eq!(toks[2], Token::EndTag("p".to_string()));
    }

    #[test]
    fn test_attribute_forms() {
        let toks = tokens("<input disabled value=abc data-x = \"1 2\"/>");
        let Token::StartTag {
            attrs,
            self_closing,
            ..
        } = &toks[0]
        else {
            panic!("expected start tag");
        };
        assert!(self_closing);
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0].value, None);
        assert_eq!(attrs[1].value.as_deref(), Some("abc"));
        assert_eq!(attrs[2].name, "data-x");
        assert_eq!(attrs[2].value.as_deref(), Some("1 2"));
    }

    #[test]
    fn test_raw_text_element() {
        let toks = tokens("<style>p > a { color: red }</STYLE><p>");
        assert_eq!(toks[1], Token::Text("p > a { color: red }".to_string()));
        assert_eq!(toks[2], Token::EndTag("style".to_string()));
    }

    #[test]
    fn test_comment_and_doctype() {
        let toks = tokens("<!DOCTYPE html><!-- <b>x</b> -->");
        assert_eq!(toks[0], Token::Doctype("DOCTYPE html".to_string()));
        assert_eq!(toks[1], Token::Comment(" <b>x</b> ".to_string()));
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let toks = tokens("a < b <3");
        assert_eq!(toks, vec![Token::Text("a < b <3".to_string())]);
    }

    #[test]
    fn test_errors() {
        for bad in ["<!-- open", "<div class=\"x>", "<p", "</p", "<!DOCTYPE"] {
            let mut tokenizer = Tokenizer::new(bad);
            let mut result = Ok(None);
            for _ in 0..4 {
                result = tokenizer.next_token();
                if result.is_err() {
                    break;
                }
            }
            assert!(result.is_err(), "{bad} should fail");
        }
    }
}
