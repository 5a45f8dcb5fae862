//! Stylesheet parsing.
//!
//! The parser only understands the declarative subset used for inlining:
//! qualified rules with selector lists and declaration blocks. At-rules are
//! kept aside as raw text. Malformed rules are skipped and recorded in
//! [`Stylesheet::skipped`].

use tracing::debug;

use crate::error::{Error, Location, Result};
use crate::selector::Selector;

/// A single `property: value` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Lowercase property name.
    pub property: String,
    /// Value without the `!important` marker.
    pub value: String,
    /// Whether the declaration was marked `!important`.
    pub important: bool,
}

impl Declaration {
    /// Creates a declaration.
    #[must_use]
    pub fn new(property: impl Into<String>, value: impl Into<String>, important: bool) -> Self {
        Self {
            property: property.into().to_ascii_lowercase(),
            value: value.into(),
            important,
        }
    }

    /// Parses `property: value [!important]`. Returns `None` without a colon,
    /// property or value.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (property, value) = text.split_once(':')?;
        let property = property.trim();
        let mut value = value.trim();
        let mut important = false;

        if let Some(bang) = value.rfind('!')
            && value[bang + 1..].trim().eq_ignore_ascii_case("important")
        {
            important = true;
            value = value[..bang].trim_end();
        }

        if property.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self::new(property, value, important))
    }

    /// Writes the declaration as `property: value;`.
    #[must_use]
    pub fn to_css(&self, keep_important: bool) -> String {
        if self.important && keep_important {
            format!("{}: {} !important;", self.property, self.value)
        } else {
            format!("{}: {};", self.property, self.value)
        }
    }
}

/// Splits a declaration block into declarations.
///
/// Returns the parsed declarations and the raw text of each malformed one.
#[must_use]
pub fn parse_declarations(block: &str) -> (Vec<Declaration>, Vec<String>) {
    let mut parsed = Vec::new();
    let mut malformed = Vec::new();
    for part in split_outside(block, b';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match Declaration::parse(part) {
            Some(decl) => parsed.push(decl),
            None => malformed.push(part.to_string()),
        }
    }
    (parsed, malformed)
}

/// A rule with one selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// The selector.
    pub selector: Selector,
    /// Declarations in source order.
    pub declarations: Vec<Declaration>,
    /// Source order of the rule; shared by all selectors of a selector list.
    pub order: usize,
}

/// A rule the parser could not use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    /// Offending text.
    pub text: String,
    /// Why it was skipped.
    pub reason: String,
    /// Where it starts.
    pub location: Location,
}

/// A parsed stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    rules: Vec<StyleRule>,
    at_rules: Vec<String>,
    skipped: Vec<SkippedRule>,
}

impl Stylesheet {
    /// Parses stylesheet text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stylesheet`] when the text cannot be tokenized: an
    /// unterminated comment or string, or unbalanced braces.
    pub fn parse(css: &str) -> Result<Self> {
        let masked = mask_comments(css)?;
        let bytes = masked.as_bytes();
        let mut sheet = Self::default();
        let mut pos = 0;
        let mut order = 0;

        loop {
            pos = skip_trivia(&masked, pos);
            if pos >= bytes.len() {
                break;
            }

            match find_outside(bytes, pos, b"{;}") {
                None => {
                    sheet.skip(css, pos, bytes.len(), "rule without a block");
                    break;
                }
                Some((index, b'}')) => {
                    return Err(Error::stylesheet("unbalanced '}'", css, index));
                }
                Some((index, b';')) => {
                    if bytes[pos] == b'@' {
                        debug!(rule = css[pos..=index].trim(), "Skipping at-rule");
                        sheet.at_rules.push(css[pos..=index].trim().to_string());
                    } else {
                        sheet.skip(css, pos, index, "rule without a block");
                    }
                    pos = index + 1;
                }
                Some((open, _)) => {
                    let close = matching_brace(bytes, open)
                        .ok_or_else(|| Error::stylesheet("unclosed '{'", css, open))?;
                    if bytes[pos] == b'@' {
                        debug!(rule = masked[pos..open].trim(), "Skipping at-rule");
                        sheet.at_rules.push(css[pos..=close].trim().to_string());
                    } else {
                        sheet.add_rule(css, pos, &masked[pos..open], &masked[open + 1..close], order);
                        order += 1;
                    }
                    pos = close + 1;
                }
            }
        }

        Ok(sheet)
    }

    /// Rules in source order, one per selector.
    #[must_use]
    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    /// Raw text of the at-rules (`@media`, `@font-face`, ...).
    #[must_use]
    pub fn at_rules(&self) -> &[String] {
        &self.at_rules
    }

    /// Rules and declarations that were skipped.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedRule] {
        &self.skipped
    }

    /// Number of distinct source rules.
    #[must_use]
    pub fn source_rule_count(&self) -> usize {
        self.rules.last().map_or(0, |r| r.order + 1)
    }

    fn skip(&mut self, css: &str, start: usize, end: usize, reason: &str) {
        let text = css[start..end].trim().to_string();
        debug!(rule = %text, reason, "Skipping CSS rule");
        self.skipped.push(SkippedRule {
            text,
            reason: reason.to_string(),
            location: Location::of(css, start),
        });
    }

    fn add_rule(&mut self, css: &str, start: usize, prelude: &str, block: &str, order: usize) {
        let (declarations, malformed) = parse_declarations(block);
        for text in malformed {
            debug!(declaration = %text, "Skipping malformed declaration");
            self.skipped.push(SkippedRule {
                text,
                reason: "declaration without a colon or value".to_string(),
                location: Location::of(css, start),
            });
        }

        if declarations.is_empty() {
            self.skip(css, start, start + prelude.len(), "empty block");
            return;
        }

        for text in split_outside(prelude, b',') {
            match Selector::parse(text) {
                Ok(selector) => self.rules.push(StyleRule {
                    selector,
                    declarations: declarations.clone(),
                    order,
                }),
                Err(reason) => {
                    debug!(selector = text.trim(), %reason, "Skipping CSS rule");
                    self.skipped.push(SkippedRule {
                        text: text.trim().to_string(),
                        reason,
                        location: Location::of(css, start),
                    });
                }
            }
        }
    }
}

/// Replaces comment bytes with spaces (newlines kept) so offsets stay valid.
fn mask_comments(css: &str) -> Result<String> {
    let bytes = css.as_bytes();
    let mut out = bytes.to_vec();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => {
                pos = string_end(bytes, pos, quote)
                    .ok_or_else(|| Error::stylesheet("unterminated string", css, pos))?;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                let end = css[pos + 2..]
                    .find("*/")
                    .map(|i| i + pos + 4)
                    .ok_or_else(|| Error::stylesheet("unterminated comment", css, pos))?;
                for b in &mut out[pos..end] {
                    if *b != b'\n' {
                        *b = b' ';
                    }
                }
                pos = end;
            }
            _ => pos += 1,
        }
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Returns the index just past the closing quote of the string at `start`.
fn string_end(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b if b == quote => return Some(pos + 1),
            _ => pos += 1,
        }
    }
    None
}

/// Skips whitespace and the legacy `<!--` / `-->` markers.
fn skip_trivia(css: &str, mut pos: usize) -> usize {
    loop {
        let rest = &css[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();
        if trimmed.starts_with("<!--") {
            pos += 4;
        } else if trimmed.starts_with("-->") {
            pos += 3;
        } else {
            return pos;
        }
    }
}

/// Finds the first of `stops` outside strings.
fn find_outside(bytes: &[u8], from: usize, stops: &[u8]) -> Option<(usize, u8)> {
    let mut pos = from;
    while pos < bytes.len() {
        let b = bytes[pos];
        if b == b'"' || b == b'\'' {
            pos = string_end(bytes, pos, b)?;
            continue;
        }
        if stops.contains(&b) {
            return Some((pos, b));
        }
        pos += 1;
    }
    None
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = open;
    while let Some((index, b)) = find_outside(bytes, pos, b"{}") {
        if b == b'{' {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
        pos = index + 1;
    }
    None
}

/// Splits on `sep` outside strings and parentheses.
fn split_outside(text: &str, sep: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => {
                pos = string_end(bytes, pos, quote).unwrap_or(bytes.len());
                continue;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b if b == sep && depth == 0 => {
                parts.push(&text[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
        pos += 1;
    }
    parts.push(&text[start..]);
    parts
}
