//! HTML document tree.
//!
//! A lenient tree builder over the [`tokenizer`]: unknown tags are kept,
//! stray end tags are dropped and unclosed elements are closed at the end of
//! input. Serialization writes nodes back in source form, so a document that
//! is parsed and written without changes keeps its markup.

mod entities;
mod node;
mod tokenizer;

use std::fmt;

pub(crate) use entities::{decode_entities, escape_attribute};
pub use node::{Attribute, Element, Node};
use tokenizer::{Token, Tokenizer};

use crate::error::Result;

/// Elements implicitly closed when the same tag opens again.
const AUTO_CLOSING: &[&str] = &["p", "li", "option", "tr", "td", "th", "dt", "dd"];

/// A parsed HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parses an HTML document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DocumentParse`] for an unterminated comment,
    /// tag or quoted attribute value.
    pub fn parse(html: &str) -> Result<Self> {
        let mut tokenizer = Tokenizer::new(html);
        let mut builder = TreeBuilder::default();
        while let Some(token) = tokenizer.next_token()? {
            builder.push(token);
        }
        Ok(Self {
            nodes: builder.finish(),
        })
    }

    /// Top-level nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Mutable top-level nodes.
    pub fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }

    /// Finds the first element with the tag name, in document order.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.nodes
            .iter()
            .filter_map(Node::as_element)
            .find_map(|e| e.find(name))
    }

    /// Mutable variant of [`Document::find`].
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.nodes
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find_map(|e| e.find_mut(name))
    }

    /// Makes sure the document has a `head` element.
    ///
    /// A missing `html` root is created around every top-level node except
    /// declarations. A missing `head` is inserted as the first child of the
    /// root. Returns true if anything was added.
    pub fn ensure_head(&mut self) -> bool {
        if self.find("head").is_some() {
            return false;
        }

        if self.find("html").is_none() {
            let (declarations, content): (Vec<Node>, Vec<Node>) = std::mem::take(&mut self.nodes)
                .into_iter()
                .partition(|n| matches!(n, Node::Doctype(_)));
            let mut root = Element::new("html");
            root.children = content;
            self.nodes = declarations;
            self.nodes.push(Node::Element(root));
        }

        if let Some(root) = self.find_mut("html") {
            root.prepend_child(Node::Element(Element::new("head")));
        }
        true
    }

    /// Appends a node to the `head` element, creating it when missing.
    pub fn append_to_head(&mut self, node: Node) {
        self.ensure_head();
        if let Some(head) = self.find_mut("head") {
            head.append_child(node);
        }
    }

    /// Serializes the document.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write_to(&mut out);
        }
        out
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

/// Stack of open elements.
#[derive(Default)]
struct TreeBuilder {
    open: Vec<Element>,
    done: Vec<Node>,
}

impl TreeBuilder {
    fn attach(&mut self, node: Node) {
        match self.open.last_mut() {
            Some(parent) => parent.append_child(node),
            None => self.done.push(node),
        }
    }

    fn close_current(&mut self) {
        if let Some(element) = self.open.pop() {
            self.attach(Node::Element(element));
        }
    }

    fn push(&mut self, token: Token) {
        match token {
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => {
                if AUTO_CLOSING.contains(&name.as_str())
                    && self.open.last().is_some_and(|e| e.name == name)
                {
                    self.close_current();
                }
                let element = Element::with_attrs(name, attrs, self_closing);
                if self_closing || element.is_void() {
                    self.attach(Node::Element(element));
                } else {
                    self.open.push(element);
                }
            }
            Token::EndTag(name) => {
                if let Some(index) = self.open.iter().rposition(|e| e.name == name) {
                    while self.open.len() > index {
                        self.close_current();
                    }
                }
            }
            Token::Text(text) => self.attach(Node::Text(text)),
            Token::Comment(text) => self.attach(Node::Comment(text)),
            Token::Doctype(text) => self.attach(Node::Doctype(text)),
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.open.is_empty() {
            self.close_current();
        }
        self.done
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_markup() {
        let html = "<!DOCTYPE html>\n<html><head><title>T</title></head>\
                    <body class=x><p id='a'>Hi <b>there</b><br></p><!-- c --></body></html>";
        let doc = Document::parse(html).unwrap();
        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_tree_shape() {
        let doc = Document::parse("<div><p>one<p>two</div>").unwrap();
        let div = doc.find("div").unwrap();
        let paragraphs: Vec<_> = div.child_elements().collect();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text(), "one");
        assert_eq!(paragraphs[1].text(), "two");
    }

    #[test]
    fn test_stray_end_tag_is_dropped() {
        let doc = Document::parse("<p>a</span>b</p>").unwrap();
        assert_eq!(doc.to_html(), "<p>ab</p>");
    }

    #[test]
    fn test_unclosed_elements_are_closed() {
        let doc = Document::parse("<div><span>x").unwrap();
        assert_eq!(doc.to_html(), "<div><span>x</span></div>");
    }

    #[test]
    fn test_ensure_head_wraps_fragment() {
        let mut doc = Document::parse("<!DOCTYPE html><p>Hello</p>").unwrap();
        assert!(doc.ensure_head());
        assert_eq!(
            doc.to_html(),
            "<!DOCTYPE html><html><head></head><p>Hello</p></html>"
        );
        assert!(!doc.ensure_head());
    }

    #[test]
    fn test_append_to_head_with_existing_root() {
        let mut doc = Document::parse("<html><body></body></html>").unwrap();
        doc.append_to_head(Node::Element(Element::new("style")));
        assert_eq!(
            doc.to_html(),
            "<html><head><style></style></head><body></body></html>"
        );
    }

    #[test]
    fn test_parse_error_location() {
        let err = Document::parse("<p>\n<div class=\"open>").unwrap_err();
        match err {
            crate::Error::DocumentParse { location, .. } => {
                assert_eq!(location.line, 2);
                assert_eq!(location.column, 12);
            }
            other @ crate::Error::Stylesheet { .. } => panic!("unexpected {other}"),
        }
    }
}
