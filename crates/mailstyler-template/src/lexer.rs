//! Splits template source into text runs and tokenized actions.

use crate::error::{Error, Result};

const LEFT: &str = "{{";
const RIGHT: &str = "}}";

/// Token inside an action.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Field chain rooted at dot: `.` is an empty chain, `.A.B` is `[A, B]`.
    Field(Vec<String>),
    /// Variable with an optional field chain: `$`, `$x`, `$x.Name`.
    Variable(String, Vec<String>),
    /// Field chain applied to the parenthesized pipeline before it.
    Chain(Vec<String>),
    /// Function name or keyword.
    Ident(String),
    /// String literal, quoted or raw.
    Str(String),
    /// Number literal.
    Number(f64),
    /// `true` or `false`.
    Bool(bool),
    /// `nil`.
    Nil,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `|`
    Pipe,
    /// `:=`
    Declare,
    /// `=`
    Assign,
    /// `,`
    Comma,
}

/// Lexed template source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    /// Literal text, already trimmed.
    Text(String),
    /// An action and the line it starts on.
    Action {
        /// 1-based line of the opening delimiter.
        line: usize,
        /// Tokens between the delimiters.
        tokens: Vec<Token>,
    },
}

/// Lexes `source`. Comments are dropped, trim markers are applied to the
/// neighbouring text.
pub(crate) fn lex(name: &str, source: &str) -> Result<Vec<Item>> {
    Scanner {
        name,
        src: source,
        pos: 0,
        line: 1,
    }
    .run()
}

const fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `{{- ` and ` -}}` need whitespace next to the dash.
fn starts_with_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && chars.next().is_some_and(is_space)
}

fn push_text(items: &mut Vec<Item>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start_matches(is_space);
    }
    if trim_end {
        text = text.trim_end_matches(is_space);
    }
    if !text.is_empty() {
        items.push(Item::Text(text.to_string()));
    }
}

struct Scanner<'a> {
    name: &'a str,
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        let src = self.src;
        &src[self.pos..]
    }

    fn advance(&mut self, bytes: usize) {
        let end = (self.pos + bytes).min(self.src.len());
        self.line += self.src[self.pos..end].matches('\n').count();
        self.pos = end;
    }

    fn error(&self, line: usize, message: impl Into<String>) -> Error {
        Error::parse(self.name, line, message)
    }

    fn run(mut self) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut trim_next = false;

        loop {
            let rest = self.rest();
            let Some(open) = rest.find(LEFT) else {
                push_text(&mut items, rest, trim_next, false);
                return Ok(items);
            };

            let trim_left = starts_with_trim_marker(&rest[open + LEFT.len()..]);
            push_text(&mut items, &rest[..open], trim_next, trim_left);
            self.advance(open);
            let line = self.line;
            self.advance(LEFT.len() + if trim_left { 2 } else { 0 });

            if self.rest().starts_with("/*") {
                trim_next = self.comment(line)?;
            } else {
                let (tokens, trim_right) = self.action(line)?;
                if tokens.is_empty() {
                    return Err(self.error(line, "missing value for command"));
                }
                items.push(Item::Action { line, tokens });
                trim_next = trim_right;
            }
        }
    }

    fn comment(&mut self, line: usize) -> Result<bool> {
        let Some(end) = self.rest().find("*/") else {
            return Err(self.error(line, "unclosed comment"));
        };
        self.advance(end + 2);

        let rest = self.rest();
        if rest.starts_with(RIGHT) {
            self.advance(RIGHT.len());
            return Ok(false);
        }
        let trimmed = rest.trim_start_matches(is_space);
        if trimmed.len() < rest.len() && trimmed.starts_with("-}}") {
            self.advance(rest.len() - trimmed.len() + 3);
            return Ok(true);
        }
        Err(self.error(line, "comment ends before closing delimiter"))
    }

    fn action(&mut self, line: usize) -> Result<(Vec<Token>, bool)> {
        let mut tokens = Vec::new();
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start_matches(is_space);
            let spaced = trimmed.len() < rest.len();
            self.advance(rest.len() - trimmed.len());

            let Some(c) = trimmed.chars().next() else {
                return Err(self.error(line, "unclosed action"));
            };
            if trimmed.starts_with(RIGHT) {
                self.advance(RIGHT.len());
                return Ok((tokens, false));
            }
            if spaced && trimmed.starts_with("-}}") {
                self.advance(3);
                return Ok((tokens, true));
            }

            let next = trimmed[c.len_utf8()..].chars().next();
            let token = match c {
                '"' => Token::Str(self.quoted(line)?),
                '`' => Token::Str(self.raw(line)?),
                '(' => {
                    self.advance(1);
                    Token::LeftParen
                }
                ')' => {
                    self.advance(1);
                    tokens.push(Token::RightParen);
                    let chain = self.fields();
                    if chain.is_empty() {
                        continue;
                    }
                    Token::Chain(chain)
                }
                '|' => {
                    self.advance(1);
                    Token::Pipe
                }
                ',' => {
                    self.advance(1);
                    Token::Comma
                }
                '=' => {
                    self.advance(1);
                    Token::Assign
                }
                ':' if next == Some('=') => {
                    self.advance(2);
                    Token::Declare
                }
                '$' => {
                    self.advance(1);
                    let name = self.ident();
                    Token::Variable(name, self.fields())
                }
                '.' if next.is_some_and(|n| n.is_ascii_digit()) => self.number(line)?,
                '.' => {
                    let chain = self.fields();
                    if chain.is_empty() {
                        self.advance(1);
                    }
                    Token::Field(chain)
                }
                '-' | '+' if next.is_some_and(|n| n.is_ascii_digit() || n == '.') => {
                    self.number(line)?
                }
                c if c.is_ascii_digit() => self.number(line)?,
                c if is_ident_start(c) => match self.ident().as_str() {
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    "nil" => Token::Nil,
                    word => Token::Ident(word.to_string()),
                },
                other => {
                    return Err(self.error(line, format!("unexpected {other:?} in action")));
                }
            };
            tokens.push(token);
        }
    }

    fn ident(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_ident_char(c))
            .map_or(rest.len(), |(i, _)| i);
        self.advance(len);
        rest[..len].to_string()
    }

    /// Reads `.A.B` field chains directly following the current position.
    fn fields(&mut self) -> Vec<String> {
        let mut chain = Vec::new();
        loop {
            let rest = self.rest();
            let mut chars = rest.chars();
            if chars.next() != Some('.') || !chars.next().is_some_and(is_ident_start) {
                return chain;
            }
            self.advance(1);
            chain.push(self.ident());
        }
    }

    fn quoted(&mut self, line: usize) -> Result<String> {
        self.advance(1);
        let rest = self.rest();
        let mut out = String::new();
        let mut chars = rest.char_indices();
        loop {
            match chars.next() {
                None | Some((_, '\n')) => {
                    return Err(self.error(line, "unterminated quoted string"));
                }
                Some((i, '"')) => {
                    self.advance(i + 1);
                    return Ok(out);
                }
                Some((_, '\\')) => {
                    let escaped = match chars.next().map(|(_, c)| c) {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(c @ ('\\' | '"' | '\'')) => c,
                        Some('u') => {
                            let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                            u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| {
                                    self.error(line, format!("invalid escape \\u{hex}"))
                                })?
                        }
                        other => {
                            let shown = other.map(String::from).unwrap_or_default();
                            return Err(
                                self.error(line, format!("invalid escape sequence \\{shown}"))
                            );
                        }
                    };
                    out.push(escaped);
                }
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn raw(&mut self, line: usize) -> Result<String> {
        self.advance(1);
        let rest = self.rest();
        let Some(end) = rest.find('`') else {
            return Err(self.error(line, "unterminated raw quoted string"));
        };
        self.advance(end + 1);
        Ok(rest[..end].to_string())
    }

    fn number(&mut self, line: usize) -> Result<Token> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let mut len = 0;
        while let Some(&b) = bytes.get(len) {
            let sign_ok = len == 0 || matches!(bytes[len - 1], b'e' | b'E');
            let ok = b.is_ascii_alphanumeric()
                || b == b'.'
                || b == b'_'
                || (matches!(b, b'-' | b'+') && sign_ok);
            if !ok {
                break;
            }
            len += 1;
        }
        let text = &rest[..len];
        self.advance(len);

        let cleaned = text.replace('_', "");
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(d) => (true, d),
            None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
        };
        let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            #[allow(clippy::cast_precision_loss)]
            Some(hex) => i64::from_str_radix(hex, 16).ok().map(|n| n as f64),
            None => digits.parse::<f64>().ok().filter(|n| n.is_finite()),
        };
        parsed
            .map(|n| Token::Number(if negative { -n } else { n }))
            .ok_or_else(|| self.error(line, format!("bad number syntax: {text:?}")))
    }
}
