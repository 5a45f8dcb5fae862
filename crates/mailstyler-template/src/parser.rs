//! Builds the node tree from lexed items.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::funcs::is_builtin;
use crate::lexer::{Item, Token};
use crate::value::Value;

/// Parsed template: the main body plus templates named with `define` or
/// `block`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tree {
    pub(crate) root: Vec<Node>,
    pub(crate) defines: HashMap<String, Vec<Node>>,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Action {
        line: usize,
        pipe: Pipeline,
    },
    If {
        line: usize,
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        line: usize,
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    With {
        line: usize,
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Template {
        line: usize,
        name: String,
        pipe: Option<Pipeline>,
    },
    Break,
    Continue,
}

/// Commands joined by `|`, optionally bound to variables.
#[derive(Debug, Clone, Default)]
pub(crate) struct Pipeline {
    /// Declared (or assigned) variable names, including the `$`.
    pub(crate) decl: Vec<String>,
    /// `$x = ...` rather than `$x := ...`.
    pub(crate) assign: bool,
    pub(crate) commands: Vec<Command>,
}

#[derive(Debug, Clone)]
pub(crate) struct Command {
    pub(crate) args: Vec<Arg>,
}

#[derive(Debug, Clone)]
pub(crate) enum Arg {
    Field(Vec<String>),
    Variable(String, Vec<String>),
    Function(String),
    Literal(Value),
    Pipeline(Box<Pipeline>, Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    If,
    Range,
    With,
}

impl Control {
    const fn keyword(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Range => "range",
            Self::With => "with",
        }
    }
}

/// How a list of nodes ended.
enum Stop {
    End,
    Else(usize, Vec<Token>),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(chain) if chain.is_empty() => f.write_str("."),
            Self::Field(chain) | Self::Chain(chain) => write!(f, ".{}", chain.join(".")),
            Self::Variable(name, chain) if chain.is_empty() => write!(f, "${name}"),
            Self::Variable(name, chain) => write!(f, "${name}.{}", chain.join(".")),
            Self::Ident(name) => f.write_str(name),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Nil => f.write_str("nil"),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::Pipe => f.write_str("|"),
            Self::Declare => f.write_str(":="),
            Self::Assign => f.write_str("="),
            Self::Comma => f.write_str(","),
        }
    }
}

/// Parses lexed items. `is_func` reports whether a name is a registered
/// function; builtins are always accepted.
pub(crate) fn parse(name: &str, items: Vec<Item>, is_func: &dyn Fn(&str) -> bool) -> Result<Tree> {
    let mut parser = Parser {
        name,
        items: items.into_iter(),
        is_func,
        defines: HashMap::new(),
        vars: vec!["$".to_string()],
        depth: 0,
        range_depth: 0,
    };
    let (root, stop) = parser.list()?;
    match stop {
        Stop::Eof => Ok(Tree {
            root,
            defines: parser.defines,
        }),
        Stop::End => Err(parser.error(last_line(&root), "unexpected {{end}}")),
        Stop::Else(line, _) => Err(parser.error(line, "unexpected {{else}}")),
    }
}

struct Parser<'a> {
    name: &'a str,
    items: std::vec::IntoIter<Item>,
    is_func: &'a dyn Fn(&str) -> bool,
    defines: HashMap<String, Vec<Node>>,
    /// Variables in scope, innermost last.
    vars: Vec<String>,
    depth: usize,
    range_depth: usize,
}

fn last_line(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .rev()
        .find_map(|node| match node {
            Node::Action { line, .. }
            | Node::If { line, .. }
            | Node::Range { line, .. }
            | Node::With { line, .. }
            | Node::Template { line, .. } => Some(*line),
            _ => None,
        })
        .unwrap_or(1)
}

impl Parser<'_> {
    fn error(&self, line: usize, message: impl Into<String>) -> Error {
        Error::parse(self.name, line, message)
    }

    fn list(&mut self) -> Result<(Vec<Node>, Stop)> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.next() {
            let (line, tokens) = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action { line, tokens } => (line, tokens),
            };

            let keyword = match tokens.first() {
                Some(Token::Ident(word)) => word.as_str(),
                _ => "",
            };
            let rest = &tokens[1.min(tokens.len())..];
            match keyword {
                "end" => {
                    if !rest.is_empty() {
                        return Err(self.error(line, "unexpected tokens after {{end}}"));
                    }
                    return Ok((nodes, Stop::End));
                }
                "else" => return Ok((nodes, Stop::Else(line, rest.to_vec()))),
                "if" => nodes.push(self.control(Control::If, line, rest)?),
                "range" => nodes.push(self.control(Control::Range, line, rest)?),
                "with" => nodes.push(self.control(Control::With, line, rest)?),
                "define" => self.define(line, rest)?,
                "block" => nodes.push(self.block(line, rest)?),
                "template" => nodes.push(self.template(line, rest)?),
                "break" | "continue" => {
                    if self.range_depth == 0 {
                        return Err(self.error(line, format!("{{{{{keyword}}}}} outside {{{{range}}}}")));
                    }
                    if !rest.is_empty() {
                        return Err(self.error(line, format!("unexpected tokens after {{{{{keyword}}}}}")));
                    }
                    nodes.push(if keyword == "break" {
                        Node::Break
                    } else {
                        Node::Continue
                    });
                }
                _ => {
                    let pipe = self.pipeline(line, &tokens, false)?;
                    nodes.push(Node::Action { line, pipe });
                }
            }
        }
        Ok((nodes, Stop::Eof))
    }

    /// Parses the remainder of an `if`, `range` or `with` block, including
    /// `else` and chained `else if` / `else with` branches.
    fn control(&mut self, kind: Control, line: usize, tokens: &[Token]) -> Result<Node> {
        let mark = self.vars.len();
        let pipe = self.pipeline(line, tokens, kind == Control::Range)?;

        self.depth += 1;
        if kind == Control::Range {
            self.range_depth += 1;
        }
        let (body, stop) = self.list()?;
        if kind == Control::Range {
            self.range_depth -= 1;
        }

        let otherwise = match stop {
            Stop::End => Vec::new(),
            Stop::Eof => {
                return Err(self.error(line, format!("unexpected EOF in {{{{{}}}}}", kind.keyword())));
            }
            Stop::Else(else_line, rest) => match rest.first() {
                None => {
                    let (otherwise, stop) = self.list()?;
                    if !matches!(stop, Stop::End) {
                        return Err(self.error(
                            else_line,
                            format!("expected {{{{end}}}} to close {{{{{}}}}}", kind.keyword()),
                        ));
                    }
                    otherwise
                }
                Some(Token::Ident(word))
                    if (word == "if" && kind == Control::If)
                        || (word == "with" && kind == Control::With) =>
                {
                    vec![self.control(kind, else_line, &rest[1..])?]
                }
                Some(token) => {
                    return Err(self.error(else_line, format!("unexpected {token} after else")));
                }
            },
        };

        self.depth -= 1;
        self.vars.truncate(mark);

        Ok(match kind {
            Control::If => Node::If {
                line,
                pipe,
                body,
                otherwise,
            },
            Control::Range => Node::Range {
                line,
                pipe,
                body,
                otherwise,
            },
            Control::With => Node::With {
                line,
                pipe,
                body,
                otherwise,
            },
        })
    }

    fn template_name(&self, line: usize, keyword: &str, tokens: &[Token]) -> Result<String> {
        match tokens.first() {
            Some(Token::Str(name)) => Ok(name.clone()),
            _ => Err(self.error(line, format!("{{{{{keyword}}}}} needs a quoted template name"))),
        }
    }

    /// Parses a named body up to its `{{end}}` in a fresh variable scope.
    fn named_body(&mut self, line: usize, name: &str) -> Result<Vec<Node>> {
        let saved_vars = std::mem::replace(&mut self.vars, vec!["$".to_string()]);
        let saved_range = std::mem::replace(&mut self.range_depth, 0);
        self.depth += 1;
        let (body, stop) = self.list()?;
        self.depth -= 1;
        self.vars = saved_vars;
        self.range_depth = saved_range;

        if !matches!(stop, Stop::End) {
            return Err(self.error(line, format!("unexpected EOF in template {name:?}")));
        }
        if self.defines.contains_key(name) {
            return Err(self.error(line, format!("template {name:?} defined twice")));
        }
        Ok(body)
    }

    fn define(&mut self, line: usize, tokens: &[Token]) -> Result<()> {
        if self.depth > 0 {
            return Err(self.error(line, "{{define}} is only allowed at the top level"));
        }
        let name = self.template_name(line, "define", tokens)?;
        if tokens.len() > 1 {
            return Err(self.error(line, "unexpected tokens after {{define}} name"));
        }
        let body = self.named_body(line, &name)?;
        self.defines.insert(name, body);
        Ok(())
    }

    fn block(&mut self, line: usize, tokens: &[Token]) -> Result<Node> {
        let name = self.template_name(line, "block", tokens)?;
        let pipe = self.optional_pipeline(line, &tokens[1..])?;
        let body = self.named_body(line, &name)?;
        self.defines.insert(name.clone(), body);
        Ok(Node::Template { line, name, pipe })
    }

    fn template(&mut self, line: usize, tokens: &[Token]) -> Result<Node> {
        let name = self.template_name(line, "template", tokens)?;
        let pipe = self.optional_pipeline(line, &tokens[1..])?;
        Ok(Node::Template { line, name, pipe })
    }

    fn optional_pipeline(&mut self, line: usize, tokens: &[Token]) -> Result<Option<Pipeline>> {
        if tokens.is_empty() {
            Ok(None)
        } else {
            self.pipeline(line, tokens, false).map(Some)
        }
    }

    fn pipeline(&mut self, line: usize, tokens: &[Token], range: bool) -> Result<Pipeline> {
        let mut pipe = Pipeline::default();
        let mut start = 0;

        let var = |i: usize| match tokens.get(i) {
            Some(Token::Variable(name, chain)) if chain.is_empty() => Some(format!("${name}")),
            _ => None,
        };
        if let Some(first) = var(0) {
            match tokens.get(1) {
                Some(Token::Declare) => {
                    pipe.decl.push(first);
                    start = 2;
                }
                Some(Token::Assign) => {
                    if !self.vars.contains(&first) {
                        return Err(self.error(line, format!("undefined variable: {first}")));
                    }
                    pipe.decl.push(first);
                    pipe.assign = true;
                    start = 2;
                }
                Some(Token::Comma) if range => match (var(2), tokens.get(3)) {
                    (Some(second), Some(Token::Declare)) => {
                        pipe.decl.push(first);
                        pipe.decl.push(second);
                        start = 4;
                    }
                    _ => return Err(self.error(line, "malformed range declaration")),
                },
                _ => {}
            }
        }

        let body = &tokens[start..];
        if body.is_empty() {
            return Err(self.error(line, "missing value for command"));
        }

        let mut depth = 0usize;
        let mut segment = 0;
        for (i, token) in body.iter().enumerate() {
            match token {
                Token::LeftParen => depth += 1,
                Token::RightParen => depth = depth.saturating_sub(1),
                Token::Pipe if depth == 0 => {
                    let command = self.command(line, &body[segment..i])?;
                    pipe.commands.push(command);
                    segment = i + 1;
                }
                _ => {}
            }
        }
        let command = self.command(line, &body[segment..])?;
        pipe.commands.push(command);

        for (stage, command) in pipe.commands.iter().enumerate().skip(1) {
            if !matches!(command.args.first(), Some(Arg::Function(_))) {
                return Err(self.error(
                    line,
                    format!("non executable command in pipeline stage {}", stage + 1),
                ));
            }
        }

        if !pipe.assign {
            self.vars.extend(pipe.decl.iter().cloned());
        }
        Ok(pipe)
    }

    fn command(&mut self, line: usize, tokens: &[Token]) -> Result<Command> {
        if tokens.is_empty() {
            return Err(self.error(line, "missing command"));
        }
        let mut args = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let (arg, consumed) = self.operand(line, &tokens[i..])?;
            args.push(arg);
            i += consumed;
        }
        if args.len() > 1 && !matches!(args[0], Arg::Function(_)) {
            return Err(self.error(line, "can't give argument to non-function"));
        }
        Ok(Command { args })
    }

    fn operand(&mut self, line: usize, tokens: &[Token]) -> Result<(Arg, usize)> {
        let arg = match &tokens[0] {
            Token::Field(chain) => Arg::Field(chain.clone()),
            Token::Variable(name, chain) => {
                let name = format!("${name}");
                if !self.vars.contains(&name) {
                    return Err(self.error(line, format!("undefined variable: {name}")));
                }
                Arg::Variable(name, chain.clone())
            }
            Token::Ident(name) => {
                if !is_builtin(name) && !(self.is_func)(name) {
                    return Err(self.error(line, format!("function {name:?} not defined")));
                }
                Arg::Function(name.clone())
            }
            Token::Str(s) => Arg::Literal(Value::Text(s.clone())),
            Token::Number(n) => Arg::Literal(Value::Number(*n)),
            Token::Bool(b) => Arg::Literal(Value::Bool(*b)),
            Token::Nil => Arg::Literal(Value::Null),
            Token::LeftParen => return self.parenthesized(line, tokens),
            other => return Err(self.error(line, format!("unexpected {other} in operand"))),
        };
        Ok((arg, 1))
    }

    fn parenthesized(&mut self, line: usize, tokens: &[Token]) -> Result<(Arg, usize)> {
        let mut depth = 0usize;
        let close = tokens.iter().position(|token| {
            match token {
                Token::LeftParen => depth += 1,
                Token::RightParen => depth -= 1,
                _ => {}
            }
            depth == 0
        });
        let Some(close) = close else {
            return Err(self.error(line, "unclosed left paren"));
        };

        let pipe = self.pipeline(line, &tokens[1..close], false)?;
        match tokens.get(close + 1) {
            Some(Token::Chain(chain)) => Ok((Arg::Pipeline(Box::new(pipe), chain.clone()), close + 2)),
            _ => Ok((Arg::Pipeline(Box::new(pipe), Vec::new()), close + 1)),
        }
    }
}
