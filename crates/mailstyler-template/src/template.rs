//! Parsed templates.

use crate::error::Result;
use crate::exec::execute;
use crate::funcs::FuncMap;
use crate::lexer::lex;
use crate::parser::{Tree, parse};
use crate::value::Value;

/// A parsed template bound to the functions it may call.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    tree: Tree,
    funcs: FuncMap,
}

impl Template {
    /// Parses `source`. Calls to functions that are neither builtins nor in
    /// `funcs` are rejected here, before any data is bound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`](crate::Error::Parse) with the offending line.
    pub fn parse(name: impl Into<String>, source: &str, funcs: FuncMap) -> Result<Self> {
        let name = name.into();
        let items = lex(&name, source)?;
        let tree = parse(&name, items, &|f| funcs.contains(f))?;
        Ok(Self { name, tree, funcs })
    }

    /// Returns the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the names of templates declared with `define` or `block`,
    /// sorted.
    #[must_use]
    pub fn defined_templates(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tree.defines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Renders the template against `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`](crate::Error::Execution) when a field,
    /// function call or range fails.
    pub fn execute(&self, data: &Value) -> Result<String> {
        execute(&self.name, &self.tree, data, &self.funcs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_parse_and_execute() {
        let template = Template::parse("hello.html", "Hello {{.Name}}", FuncMap::new()).unwrap();
        assert_eq!(template.name(), "hello.html");
        let data = Value::from_iter([("Name", "Ann")]);
        assert_eq!(template.execute(&data).unwrap(), "Hello Ann");
        // Same data, same output.
        assert_eq!(template.execute(&data).unwrap(), template.execute(&data).unwrap());
    }

    #[test]
    fn test_defaults_need_registration() {
        let err = Template::parse("t", "{{toUpper .Name}}", FuncMap::new()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));

        let template = Template::parse("t", "{{toUpper .Name}}", FuncMap::defaults()).unwrap();
        let data = Value::from_iter([("Name", "ann")]);
        assert_eq!(template.execute(&data).unwrap(), "ANN");
    }

    #[test]
    fn test_defined_templates() {
        let source = r#"{{define "b"}}{{end}}{{define "a"}}{{end}}"#;
        let template = Template::parse("t", source, FuncMap::new()).unwrap();
        assert_eq!(template.defined_templates(), vec!["a", "b"]);
        assert_eq!(template.execute(&Value::Null).unwrap(), "");
    }
}
