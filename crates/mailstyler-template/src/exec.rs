//! Walks a parsed tree against its data.

use crate::error::{Error, Result};
use crate::funcs::{FuncMap, call_builtin};
use crate::parser::{Arg, Command, Node, Pipeline, Tree};
use crate::value::Value;

/// Nesting limit for `{{template}}` calls.
const MAX_TEMPLATE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

/// Escapes text for HTML element content and quoted attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => out.push('\u{FFFD}'),
            '"' => out.push_str("&#34;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '+' => out.push_str("&#43;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn execute(name: &str, tree: &Tree, data: &Value, funcs: &FuncMap) -> Result<String> {
    let mut exec = Exec {
        name,
        tree,
        funcs,
        vars: vec![("$".to_string(), data.clone())],
        out: String::new(),
        depth: 0,
        line: 1,
    };
    exec.walk(&tree.root, data)?;
    Ok(exec.out)
}

struct Exec<'a> {
    name: &'a str,
    tree: &'a Tree,
    funcs: &'a FuncMap,
    /// Variables in scope, innermost last.
    vars: Vec<(String, Value)>,
    out: String,
    depth: usize,
    /// Line of the action being executed.
    line: usize,
}

impl Exec<'_> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::execution(self.name, self.line, message)
    }

    fn write(&mut self, value: &Value) {
        match value {
            Value::Html(html) => self.out.push_str(html),
            other => self.out.push_str(&escape_html(&other.to_string())),
        }
    }

    fn walk(&mut self, nodes: &[Node], dot: &Value) -> Result<Flow> {
        for node in nodes {
            let flow = match node {
                Node::Text(text) => {
                    self.out.push_str(text);
                    Flow::Normal
                }
                Node::Action { line, pipe } => {
                    self.line = *line;
                    let value = self.pipeline(pipe, dot)?;
                    if pipe.decl.is_empty() {
                        self.write(&value);
                    }
                    Flow::Normal
                }
                Node::If {
                    line,
                    pipe,
                    body,
                    otherwise,
                } => {
                    self.line = *line;
                    let mark = self.vars.len();
                    let cond = self.pipeline(pipe, dot)?;
                    let branch = if cond.is_truthy() { body } else { otherwise };
                    let flow = self.walk(branch, dot)?;
                    self.vars.truncate(mark);
                    flow
                }
                Node::With {
                    line,
                    pipe,
                    body,
                    otherwise,
                } => {
                    self.line = *line;
                    let mark = self.vars.len();
                    let value = self.pipeline(pipe, dot)?;
                    let flow = if value.is_truthy() {
                        self.walk(body, &value)?
                    } else {
                        self.walk(otherwise, dot)?
                    };
                    self.vars.truncate(mark);
                    flow
                }
                Node::Range {
                    line,
                    pipe,
                    body,
                    otherwise,
                } => {
                    self.line = *line;
                    self.range(pipe, body, otherwise, dot)?
                }
                Node::Template { line, name, pipe } => {
                    self.line = *line;
                    self.template(name, pipe.as_ref(), dot)?;
                    Flow::Normal
                }
                Node::Break => Flow::Break,
                Node::Continue => Flow::Continue,
            };
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn range(
        &mut self,
        pipe: &Pipeline,
        body: &[Node],
        otherwise: &[Node],
        dot: &Value,
    ) -> Result<Flow> {
        let line = self.line;
        let mark = self.vars.len();
        let value = self.eval(pipe, dot)?;

        let entries: Box<dyn Iterator<Item = (Value, Value)>> = match value {
            Value::Seq(items) => Box::new(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (Value::Number(count(i)), item)),
            ),
            Value::Map(map) => Box::new(map.into_iter().map(|(k, v)| (Value::Text(k), v))),
            Value::Null => Box::new(std::iter::empty()),
            Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let n = n as usize;
                Box::new((0..n).map(|i| (Value::Number(count(i)), Value::Number(count(i)))))
            }
            other => return Err(self.error(format!("range can't iterate over {other}"))),
        };
        let mut entries = entries.peekable();

        if entries.peek().is_none() {
            let flow = self.walk(otherwise, dot)?;
            self.vars.truncate(mark);
            return Ok(flow);
        }

        for (key, item) in entries {
            match pipe.decl.as_slice() {
                [elem] => self.vars.push((elem.clone(), item.clone())),
                [k, elem] => {
                    self.vars.push((k.clone(), key));
                    self.vars.push((elem.clone(), item.clone()));
                }
                _ => {}
            }
            let flow = self.walk(body, &item)?;
            self.vars.truncate(mark);
            self.line = line;
            if flow == Flow::Break {
                break;
            }
        }
        Ok(Flow::Normal)
    }

    fn template(&mut self, name: &str, pipe: Option<&Pipeline>, dot: &Value) -> Result<()> {
        let tree = self.tree;
        let body = tree
            .defines
            .get(name)
            .ok_or_else(|| self.error(format!("no such template {name:?}")))?;
        if self.depth >= MAX_TEMPLATE_DEPTH {
            return Err(self.error(format!(
                "exceeded maximum template depth ({MAX_TEMPLATE_DEPTH})"
            )));
        }
        let data = match pipe {
            Some(pipe) => self.eval(pipe, dot)?,
            None => Value::Null,
        };

        let line = self.line;
        let saved = std::mem::replace(&mut self.vars, vec![("$".to_string(), data.clone())]);
        self.depth += 1;
        let result = self.walk(body, &data);
        self.depth -= 1;
        self.vars = saved;
        self.line = line;
        result.map(|_| ())
    }

    /// Evaluates a pipeline and binds its declared variables.
    fn pipeline(&mut self, pipe: &Pipeline, dot: &Value) -> Result<Value> {
        let value = self.eval(pipe, dot)?;
        if pipe.assign {
            for name in &pipe.decl {
                let slot = self
                    .vars
                    .iter_mut()
                    .rev()
                    .find(|(var, _)| var == name)
                    .ok_or_else(|| Error::execution(self.name, self.line, format!("undefined variable: {name}")))?;
                slot.1 = value.clone();
            }
        } else {
            for name in &pipe.decl {
                self.vars.push((name.clone(), value.clone()));
            }
        }
        Ok(value)
    }

    /// Evaluates a pipeline without binding variables.
    fn eval(&mut self, pipe: &Pipeline, dot: &Value) -> Result<Value> {
        let mut result = None;
        for command in &pipe.commands {
            result = Some(self.command(command, dot, result.take())?);
        }
        Ok(result.unwrap_or_default())
    }

    fn command(&mut self, command: &Command, dot: &Value, piped: Option<Value>) -> Result<Value> {
        match command.args.split_first() {
            Some((Arg::Function(name), args)) => self.call(name, args, dot, piped),
            Some((arg, _)) => {
                if piped.is_some() {
                    return Err(self.error("can't give argument to non-function"));
                }
                self.arg(arg, dot)
            }
            None => Ok(Value::Null),
        }
    }

    fn call(&mut self, name: &str, args: &[Arg], dot: &Value, piped: Option<Value>) -> Result<Value> {
        if !self.funcs.contains(name) && matches!(name, "and" | "or") {
            return self.short_circuit(name, args, dot, piped);
        }

        let mut values = Vec::with_capacity(args.len() + 1);
        for arg in args {
            values.push(self.arg(arg, dot)?);
        }
        values.extend(piped);

        let result = match self.funcs.get(name) {
            Some(func) => func(&values),
            None => call_builtin(name, &values),
        };
        result.map_err(|message| self.error(format!("error calling {name}: {message}")))
    }

    /// `and` returns the first falsy operand, `or` the first truthy one;
    /// otherwise the last operand. Later operands are not evaluated.
    fn short_circuit(
        &mut self,
        name: &str,
        args: &[Arg],
        dot: &Value,
        piped: Option<Value>,
    ) -> Result<Value> {
        let operands = args.len() + usize::from(piped.is_some());
        if operands == 0 {
            return Err(self.error(format!(
                "wrong number of args for {name}: want at least 1 got 0"
            )));
        }
        let stop_when = name == "or";

        let mut last = Value::Null;
        for arg in args {
            last = self.arg(arg, dot)?;
            if last.is_truthy() == stop_when {
                return Ok(last);
            }
        }
        Ok(piped.unwrap_or(last))
    }

    fn arg(&mut self, arg: &Arg, dot: &Value) -> Result<Value> {
        match arg {
            Arg::Field(chain) => self.fields(dot.clone(), chain),
            Arg::Variable(name, chain) => {
                let value = self
                    .vars
                    .iter()
                    .rev()
                    .find(|(var, _)| var == name)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| self.error(format!("undefined variable: {name}")))?;
                self.fields(value, chain)
            }
            Arg::Function(name) => self.call(name, &[], dot, None),
            Arg::Literal(value) => Ok(value.clone()),
            Arg::Pipeline(pipe, chain) => {
                let value = self.pipeline(pipe, dot)?;
                self.fields(value, chain)
            }
        }
    }

    fn fields(&self, mut value: Value, chain: &[String]) -> Result<Value> {
        for field in chain {
            value = value.field(field).map_err(|message| self.error(message))?;
        }
        Ok(value)
    }
}

#[allow(clippy::cast_precision_loss)]
const fn count(n: usize) -> f64 {
    n as f64
}
