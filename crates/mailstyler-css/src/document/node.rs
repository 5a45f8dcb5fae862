//! Document tree nodes.

use std::fmt::{self, Write as _};

/// Elements that never have children or an end tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// How an attribute value was quoted in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quote {
    Double,
    Single,
    Unquoted,
}

/// A single attribute. `value` is `None` for bare boolean attributes.
///
/// Values are kept as written (entities are not decoded) so untouched
/// attributes serialize back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercase attribute name.
    pub name: String,
    /// Raw attribute value.
    pub value: Option<String>,
    pub(crate) quote: Quote,
}

impl Attribute {
    /// Creates a double-quoted attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            value: Some(value.into()),
            quote: Quote::Double,
        }
    }

    fn write_to(&self, out: &mut String) {
        out.push(' ');
        out.push_str(&self.name);
        let Some(value) = &self.value else {
            return;
        };
        match self.quote {
            Quote::Double => {
                let _ = write!(out, "=\"{}\"", value.replace('"', "&quot;"));
            }
            Quote::Single => {
                let _ = write!(out, "='{}'", value.replace('\'', "&#39;"));
            }
            Quote::Unquoted => {
                let _ = write!(out, "={value}");
            }
        }
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element with its subtree.
    Element(Element),
    /// Raw text, as written in the source.
    Text(String),
    /// Comment body (between `<!--` and `-->`).
    Comment(String),
    /// Markup declaration body (between `<!` and `>`), e.g. `DOCTYPE html`.
    Doctype(String),
}

impl Node {
    /// Returns the element if this node is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the element mutably if this node is one.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn write_to(&self, out: &mut String) {
        match self {
            Self::Element(e) => e.write_to(out),
            Self::Text(t) => out.push_str(t),
            Self::Comment(c) => {
                let _ = write!(out, "<!--{c}-->");
            }
            Self::Doctype(d) => {
                let _ = write!(out, "<!{d}>");
            }
        }
    }
}

/// An HTML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub name: String,
    attrs: Vec<Attribute>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
    pub(crate) self_closing: bool,
}

impl Element {
    /// Creates an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    pub(crate) fn with_attrs(name: String, attrs: Vec<Attribute>, self_closing: bool) -> Self {
        Self {
            name,
            attrs,
            children: Vec::new(),
            self_closing,
        }
    }

    /// Returns true for void elements such as `img` or `br`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }

    /// Returns the attributes in source order.
    #[must_use]
    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Returns an attribute value. Bare boolean attributes yield `""`.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    /// Returns true if the attribute is present.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Sets an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(attr) => {
                attr.value = Some(value);
                attr.quote = Quote::Double;
            }
            None => self.attrs.push(Attribute::new(name, value)),
        }
    }

    /// Removes an attribute, returning its value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self
            .attrs
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(index).value.unwrap_or_default())
    }

    /// Returns the `id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Iterates over the class names.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    /// Returns true if the element carries the class.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Appends a child node.
    pub fn append_child(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Inserts a child node at the front.
    pub fn prepend_child(&mut self, node: Node) {
        self.children.insert(0, node);
    }

    /// Iterates over child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Finds the first descendant element (or this element) with the tag name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Self> {
        if self.name == name {
            return Some(self);
        }
        self.child_elements().find_map(|c| c.find(name))
    }

    /// Mutable variant of [`Element::find`].
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Self> {
        if self.name == name {
            return Some(self);
        }
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find_map(|c| c.find_mut(name))
    }

    /// Collects every descendant element (and this element) with the tag name.
    #[must_use]
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Self> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a Self>) {
        if self.name == name {
            found.push(self);
        }
        for child in self.child_elements() {
            child.collect(name, found);
        }
    }

    /// Concatenates all descendant text.
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => text.push_str(t),
                Node::Element(e) => text.push_str(&e.text()),
                Node::Comment(_) | Node::Doctype(_) => {}
            }
        }
        text
    }

    pub(crate) fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attrs {
            attr.write_to(out);
        }
        if self.self_closing {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if self.is_void() {
            return;
        }
        for child in &self.children {
            child.write_to(out);
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_to(&mut out);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_remove_attr() {
        let mut el = Element::new("P");
        assert_eq!(el.name, "p");
        el.set_attr("class", "a b");
        el.set_attr("id", "x");
        el.set_attr("class", "c");

        assert_eq!(el.attr("CLASS"), Some("c"));
        assert_eq!(el.to_string(), "<p class=\"c\" id=\"x\"></p>");
        assert_eq!(el.remove_attr("class"), Some("c".to_string()));
        assert!(!el.has_attr("class"));
    }

    #[test]
    fn test_quotes_are_escaped() {
        let mut el = Element::new("td");
        el.set_attr("style", "font-family: \"Arial\";");
        assert_eq!(
            el.to_string(),
            "<td style=\"font-family: &quot;Arial&quot;;\"></td>"
        );
    }

    #[test]
    fn test_classes() {
        let mut el = Element::new("div");
        el.set_attr("class", "  note\twide ");
        assert!(el.has_class("note"));
        assert!(el.has_class("wide"));
        assert!(!el.has_class("not"));
        assert_eq!(el.classes().count(), 2);
    }

    #[test]
    fn test_void_element_has_no_end_tag() {
        let mut img = Element::new("img");
        img.set_attr("src", "cid:logo");
        assert_eq!(img.to_string(), "<img src=\"cid:logo\">");
    }
}
