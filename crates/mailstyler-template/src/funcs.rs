//! Template functions: the always-available builtins and the default
//! registry used by the `*_with_funcs` renderers.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;
use std::sync::Arc;

use crate::date::format_date;
use crate::value::Value;

/// A template function. Errors are reported as execution errors naming the
/// function.
pub type Func = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// Builtins handled by the executor. `and` and `or` short-circuit, so they
/// never reach [`call_builtin`].
const BUILTINS: &[&str] = &[
    "and", "or", "not", "eq", "ne", "lt", "le", "gt", "ge", "len", "index", "print", "printf",
    "println",
];

/// Largest `printf` width or precision; larger ones print `%!(BADWIDTH)`
/// or `%!(BADPREC)` and are ignored.
const MAX_WIDTH: usize = 1_000_000;

pub(crate) fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Named template functions.
#[derive(Clone, Default)]
pub struct FuncMap {
    funcs: HashMap<String, Func>,
}

impl FuncMap {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The default registry: `add`, `toUpper`, `toLower`, `trim`, `title`,
    /// `formatDate`, `isEmpty`, `safeHTML` and `inc`.
    #[must_use]
    pub fn defaults() -> Self {
        Self::new()
            .with("add", |args| {
                let [a, b] = exact::<2>("add", args)?;
                Ok(Value::Number(number("add", a)? + number("add", b)?))
            })
            .with("inc", |args| {
                let [n] = exact::<1>("inc", args)?;
                Ok(Value::Number(number("inc", n)? + 1.0))
            })
            .with("toUpper", |args| Ok(Value::Text(text("toUpper", args)?.to_uppercase())))
            .with("toLower", |args| Ok(Value::Text(text("toLower", args)?.to_lowercase())))
            .with("trim", |args| Ok(Value::Text(text("trim", args)?.trim().to_string())))
            .with("title", |args| Ok(Value::Text(title_case(&text("title", args)?))))
            .with("isEmpty", |args| Ok(Value::Bool(text("isEmpty", args)?.trim().is_empty())))
            .with("safeHTML", |args| Ok(Value::Html(text("safeHTML", args)?)))
            .with("formatDate", |args| {
                let [time, layout] = exact::<2>("formatDate", args)?;
                let layout = layout
                    .as_str()
                    .ok_or_else(|| format!("layout must be a string, got {}", layout.kind()))?;
                format_date(time, layout).map(Value::Text)
            })
    }

    /// Registers `func` under `name`, replacing any previous entry.
    pub fn insert<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(func));
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.insert(name, func);
        self
    }

    /// Copies every entry of `other` into `self`; entries of `other` win.
    pub fn extend(&mut self, other: &Self) {
        self.funcs
            .extend(other.funcs.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
    }

    /// Looks up a function.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Func> {
        self.funcs.get(name)
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.funcs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Runs a builtin other than `and` / `or`.
pub(crate) fn call_builtin(name: &str, args: &[Value]) -> Result<Value, String> {
    match name {
        "not" => {
            let [v] = exact::<1>(name, args)?;
            Ok(Value::Bool(!v.is_truthy()))
        }
        "eq" => {
            let (first, rest) = args
                .split_first()
                .filter(|(_, rest)| !rest.is_empty())
                .ok_or("missing argument for comparison")?;
            for other in rest {
                if equal(first, other)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "ne" => {
            let [a, b] = exact::<2>(name, args)?;
            Ok(Value::Bool(!equal(a, b)?))
        }
        "lt" | "le" | "gt" | "ge" => {
            let [a, b] = exact::<2>(name, args)?;
            let ordering = compare(a, b)?;
            Ok(Value::Bool(match name {
                "lt" => ordering == Ordering::Less,
                "le" => ordering != Ordering::Greater,
                "gt" => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        "len" => {
            let [v] = exact::<1>(name, args)?;
            v.len()
                .map(|n| Value::Number(count(n)))
                .ok_or_else(|| format!("len of type {}", v.kind()))
        }
        "index" => {
            let (item, keys) = args.split_first().ok_or("index of nothing")?;
            keys.iter().try_fold(item.clone(), |item, key| index(&item, key))
        }
        "print" => Ok(Value::Text(sprint(args))),
        "println" => {
            let line: Vec<String> = args.iter().map(ToString::to_string).collect();
            Ok(Value::Text(format!("{}\n", line.join(" "))))
        }
        "printf" => {
            let (format, rest) = args.split_first().ok_or("missing format")?;
            let format = format
                .as_str()
                .ok_or_else(|| format!("format must be a string, got {}", format.kind()))?;
            Ok(Value::Text(sprintf(format, rest)))
        }
        _ => Err(format!("function {name:?} not defined")),
    }
}

fn exact<'a, const N: usize>(name: &str, args: &'a [Value]) -> Result<&'a [Value; N], String> {
    args.try_into()
        .map_err(|_| format!("wrong number of args for {name}: want {N} got {}", args.len()))
}

fn number(name: &str, value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("{name} expects numbers, got {}", value.kind()))
}

/// Single text argument. Nil reads as the empty string.
fn text(name: &str, args: &[Value]) -> Result<String, String> {
    let [v] = exact::<1>(name, args)?;
    match v {
        Value::Text(s) | Value::Html(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(format!("wrong type for value; expected string; got {}", other.kind())),
    }
}

#[allow(clippy::cast_precision_loss)]
const fn count(n: usize) -> f64 {
    n as f64
}

/// Uppercases the first letter of each word and lowercases the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if at_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_start = false;
        } else {
            out.push(c);
            at_start = c != '\'';
        }
    }
    out
}

/// Equality. Nil equals only nil; text and trusted HTML compare by content.
fn equal(a: &Value, b: &Value) -> Result<bool, String> {
    match (a, b) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        #[allow(clippy::float_cmp)]
        (Value::Number(x), Value::Number(y)) => Ok(x == y),
        (Value::Text(x) | Value::Html(x), Value::Text(y) | Value::Html(y)) => Ok(x == y),
        (Value::Seq(_) | Value::Map(_), _) | (_, Value::Seq(_) | Value::Map(_)) => {
            Err("non-comparable type".to_string())
        }
        _ => Err(format!(
            "incompatible types for comparison: {} and {}",
            a.kind(),
            b.kind()
        )),
    }
}

fn compare(a: &Value, b: &Value) -> Result<Ordering, String> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .partial_cmp(y)
            .ok_or_else(|| "cannot compare NaN".to_string()),
        (Value::Text(x) | Value::Html(x), Value::Text(y) | Value::Html(y)) => Ok(x.cmp(y)),
        (Value::Number(_) | Value::Text(_) | Value::Html(_), Value::Number(_) | Value::Text(_) | Value::Html(_)) => {
            Err(format!(
                "incompatible types for comparison: {} and {}",
                a.kind(),
                b.kind()
            ))
        }
        _ => Err(format!("invalid type for comparison: {}", a.kind())),
    }
}

fn index(item: &Value, key: &Value) -> Result<Value, String> {
    match (item, key) {
        (Value::Seq(items), Value::Number(n)) => {
            if n.fract() != 0.0 || *n < 0.0 {
                return Err(format!("cannot index slice with {n}"));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let i = *n as usize;
            items
                .get(i)
                .cloned()
                .ok_or_else(|| format!("index out of range: {n}"))
        }
        (Value::Seq(_), other) => Err(format!("cannot index slice with {}", other.kind())),
        (Value::Map(map), Value::Text(k) | Value::Html(k)) => {
            Ok(map.get(k).cloned().unwrap_or_default())
        }
        (Value::Map(_), other) => Err(format!(
            "value has type {}; should be string",
            other.kind()
        )),
        (Value::Null, _) => Err("index of untyped nil".to_string()),
        (other, _) => Err(format!("can't index item of type {}", other.kind())),
    }
}

/// Concatenates operands, adding a space between two operands when neither
/// is a string.
fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        let is_text = |v: &Value| matches!(v, Value::Text(_) | Value::Html(_));
        if i > 0 && !is_text(arg) && !is_text(&args[i - 1]) {
            out.push(' ');
        }
        let _ = write!(out, "{arg}");
    }
    out
}

/// Reads a decimal run, saturating instead of overflowing.
fn digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> usize {
    let mut n = 0usize;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = n.saturating_mul(10).saturating_add(d as usize);
        chars.next();
    }
    n
}

/// `printf` with the verbs `%v %s %d %f %q %t %x %%`, flags `-`, `+`,
/// `0`, a width and a precision.
fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let (mut left, mut zero, mut plus) = (false, false, false);
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => left = true,
                '0' => zero = true,
                '+' => plus = true,
                _ => break,
            }
            chars.next();
        }
        let mut width = digits(&mut chars);
        if width > MAX_WIDTH {
            out.push_str("%!(BADWIDTH)");
            width = 0;
        }
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let p = digits(&mut chars);
            if p > MAX_WIDTH {
                out.push_str("%!(BADPREC)");
            } else {
                precision = Some(p);
            }
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        let Some(arg) = args.next() else {
            let _ = write!(out, "%!{verb}(MISSING)");
            continue;
        };

        let (body, numeric) = match (verb, arg) {
            ('d', Value::Number(n)) => {
                let sign = if plus && *n >= 0.0 { "+" } else { "" };
                (format!("{sign}{}", n.trunc()), true)
            }
            ('f' | 'F', Value::Number(n)) => {
                let sign = if plus && *n >= 0.0 { "+" } else { "" };
                (format!("{sign}{n:.*}", precision.unwrap_or(6)), true)
            }
            ('x', Value::Number(n)) => {
                #[allow(clippy::cast_possible_truncation)]
                let n = n.trunc() as i64;
                (format!("{n:x}"), true)
            }
            ('x', Value::Text(s) | Value::Html(s)) => {
                (s.bytes().fold(String::new(), |mut acc, b| {
                    let _ = write!(acc, "{b:02x}");
                    acc
                }), false)
            }
            ('t', Value::Bool(b)) => (b.to_string(), false),
            ('q', Value::Text(s) | Value::Html(s)) => (format!("{s:?}"), false),
            ('s' | 'v', v) => {
                let s = v.to_string();
                match precision {
                    Some(p) if verb == 's' => (s.chars().take(p).collect(), false),
                    _ => (s, matches!(v, Value::Number(_))),
                }
            }
            (verb, v) => (format!("%!{verb}({} {v})", v.kind()), false),
        };

        let len = body.chars().count();
        if len >= width {
            out.push_str(&body);
        } else if left {
            out.push_str(&body);
            out.extend(std::iter::repeat_n(' ', width - len));
        } else if zero && numeric {
            let (sign, digits) = match body.strip_prefix(['-', '+']) {
                Some(digits) => (&body[..1], digits),
                None => ("", body.as_str()),
            };
            out.push_str(sign);
            out.extend(std::iter::repeat_n('0', width - len));
            out.push_str(digits);
        } else {
            out.extend(std::iter::repeat_n(' ', width - len));
            out.push_str(&body);
        }
    }

    let extra: Vec<String> = args.map(|v| format!("{}={v}", v.kind())).collect();
    if !extra.is_empty() {
        let _ = write!(out, "%!(EXTRA {})", extra.join(", "));
    }
    out
}
