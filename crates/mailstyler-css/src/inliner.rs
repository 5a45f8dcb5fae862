//! Style inlining.
//!
//! Moves stylesheet rules into `style` attributes so the markup renders in
//! mail clients that ignore `<style>` blocks.

use tracing::debug;

use crate::cascade::{Cascade, to_style_attribute};
use crate::document::{Document, Element, Node, decode_entities, escape_attribute};
use crate::error::{Error, Result};
use crate::stylesheet::{Declaration, StyleRule, Stylesheet, parse_declarations};

/// Elements that get legacy presentation attributes.
const ATTRIBUTE_ELEMENTS: &[&str] = &["table", "td", "th", "tr", "img"];

/// Elements that get `valign`.
const VALIGN_ELEMENTS: &[&str] = &["td", "th", "tr"];

/// Inlining options.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
#[allow(clippy::struct_excessive_bools)]
pub struct InlineOptions {
    /// Remove `class` attributes once styles are inlined.
    pub remove_classes: bool,
    /// Remove `<style>` blocks once styles are inlined. At-rules such as
    /// `@media` are kept in a trimmed block.
    pub remove_style_block: bool,
    /// Copy sizes, colors and alignment to legacy attributes on tables and images.
    pub css_to_attributes: bool,
    /// Keep `!important` in the written `style` attribute.
    pub keep_important: bool,
    /// Fail on the first malformed rule instead of skipping it.
    pub strict: bool,
}

impl Default for InlineOptions {
    fn default() -> Self {
        Self {
            remove_classes: true,
            remove_style_block: false,
            css_to_attributes: true,
            keep_important: true,
            strict: false,
        }
    }
}

/// Injects `css` into the document head and inlines every `<style>` block.
///
/// # Errors
///
/// Returns [`Error::DocumentParse`] if `html` cannot form a tree and
/// [`Error::Stylesheet`] if a stylesheet cannot be tokenized (or, in strict
/// mode, contains a malformed rule).
///
/// # Examples
///
/// ```
/// use mailstyler_css::{InlineOptions, inline};
///
/// let html = r#"<p class="note">Hi</p>"#;
/// let css = "p { color: red; } .note { color: blue; }";
/// let out = inline(html, css, &InlineOptions::default()).unwrap();
/// assert!(out.contains(r#"<p style="color: blue;">Hi</p>"#));
/// ```
pub fn inline(html: &str, css: &str, options: &InlineOptions) -> Result<String> {
    let mut document = Document::parse(html)?;
    let mut style = Element::new("style");
    style.append_child(Node::Text(css.to_string()));
    document.append_to_head(Node::Element(style));

    inline_document(&mut document, options)?;
    Ok(document.to_html())
}

/// Inlines the `<style>` blocks already present in a document.
///
/// # Errors
///
/// See [`inline`].
pub fn inline_document(document: &mut Document, options: &InlineOptions) -> Result<()> {
    let sheets = collect_stylesheets(document)?;

    if options.strict
        && let Some(skipped) = sheets.iter().flat_map(Stylesheet::skipped).next()
    {
        return Err(Error::Stylesheet {
            message: format!("malformed rule `{}`: {}", skipped.text, skipped.reason),
            location: skipped.location,
        });
    }

    let mut rules: Vec<StyleRule> = Vec::new();
    let mut offset = 0;
    for sheet in &sheets {
        rules.extend(sheet.rules().iter().cloned().map(|mut rule| {
            rule.order += offset;
            rule
        }));
        offset += sheet.source_rule_count();
    }

    let mut styles = Vec::new();
    for element in document.nodes().iter().filter_map(Node::as_element) {
        resolve_tree(element, &mut Vec::new(), &rules, false, &mut styles);
    }
    let styled = styles.iter().filter(|s| s.is_some()).count();

    let mut styles = styles.into_iter();
    for element in document.nodes_mut().iter_mut().filter_map(Node::as_element_mut) {
        apply_tree(element, &mut styles, options);
    }

    if options.remove_style_block {
        let mut at_rules = sheets.iter().map(|s| s.at_rules().join("\n"));
        strip_style_blocks(document.nodes_mut(), &mut at_rules);
    }

    debug!(rules = rules.len(), styled, "Inlined stylesheet");
    Ok(())
}

fn collect_stylesheets(document: &Document) -> Result<Vec<Stylesheet>> {
    let mut sheets = Vec::new();
    for element in document.nodes().iter().filter_map(Node::as_element) {
        for style in element.find_all("style") {
            sheets.push(Stylesheet::parse(&style.text())?);
        }
    }
    Ok(sheets)
}

/// Pre-order walk that records the resolved style of every element, or
/// `None` if it stays untouched.
fn resolve_tree<'a>(
    element: &'a Element,
    ancestors: &mut Vec<&'a Element>,
    rules: &[StyleRule],
    in_head: bool,
    out: &mut Vec<Option<Vec<Declaration>>>,
) {
    let in_head = in_head || element.name == "head";
    let skip = in_head || element.name == "script" || element.name == "style";
    out.push(if skip {
        None
    } else {
        resolve_element(element, ancestors, rules)
    });

    ancestors.push(element);
    for child in element.child_elements() {
        resolve_tree(child, ancestors, rules, in_head, out);
    }
    ancestors.pop();
}

fn resolve_element(
    element: &Element,
    ancestors: &[&Element],
    rules: &[StyleRule],
) -> Option<Vec<Declaration>> {
    let mut cascade = Cascade::default();
    for rule in rules.iter().filter(|r| r.selector.matches(element, ancestors)) {
        for (index, declaration) in rule.declarations.iter().enumerate() {
            cascade.add_rule_declaration(declaration, rule.selector.specificity(), rule.order, index);
        }
    }
    if cascade.is_empty() {
        return None;
    }

    let existing = decode_entities(element.attr("style").unwrap_or(""));
    let (inline, _) = parse_declarations(&existing);
    for (index, declaration) in inline.into_iter().enumerate() {
        cascade.add_inline_declaration(declaration, index);
    }
    Some(cascade.resolve())
}

/// Mutable pre-order walk consuming the styles produced by [`resolve_tree`].
fn apply_tree(
    element: &mut Element,
    styles: &mut impl Iterator<Item = Option<Vec<Declaration>>>,
    options: &InlineOptions,
) {
    if let Some(Some(declarations)) = styles.next() {
        let style = to_style_attribute(&declarations, options.keep_important);
        element.set_attr("style", escape_attribute(&style));
        if options.css_to_attributes && ATTRIBUTE_ELEMENTS.contains(&element.name.as_str()) {
            copy_to_attributes(element, &declarations);
        }
    }
    if options.remove_classes {
        element.remove_attr("class");
    }

    for child in element.children.iter_mut().filter_map(Node::as_element_mut) {
        apply_tree(child, styles, options);
    }
}

fn copy_to_attributes(element: &mut Element, declarations: &[Declaration]) {
    for declaration in declarations {
        let attribute = match declaration.property.as_str() {
            "width" => "width",
            "height" => "height",
            "background-color" => "bgcolor",
            "text-align" => "align",
            "vertical-align" if VALIGN_ELEMENTS.contains(&element.name.as_str()) => "valign",
            _ => continue,
        };
        if element.has_attr(attribute) {
            continue;
        }

        let value = if matches!(attribute, "width" | "height") {
            match dimension(&declaration.value) {
                Some(value) => value,
                None => continue,
            }
        } else {
            declaration.value.clone()
        };
        element.set_attr(attribute, escape_attribute(&value));
    }
}

/// Converts a CSS length to an HTML dimension: `600px` becomes `600`,
/// percentages are kept, other units are not representable.
fn dimension(value: &str) -> Option<String> {
    let value = value.trim();
    let number = value
        .strip_suffix("px")
        .or_else(|| value.strip_suffix('%'))
        .unwrap_or(value);
    if number.is_empty() || number.parse::<f64>().is_err() {
        return None;
    }
    if value.ends_with('%') {
        Some(value.to_string())
    } else {
        Some(number.to_string())
    }
}

fn strip_style_blocks(nodes: &mut Vec<Node>, at_rules: &mut impl Iterator<Item = String>) {
    nodes.retain_mut(|node| {
        let Some(element) = node.as_element_mut() else {
            return true;
        };
        if element.name != "style" {
            strip_style_blocks(&mut element.children, at_rules);
            return true;
        }
        match at_rules.next() {
            Some(kept) if !kept.is_empty() => {
                element.children = vec![Node::Text(kept)];
                true
            }
            _ => false,
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn run(html: &str, css: &str) -> String {
        inline(html, css, &InlineOptions::default()).unwrap()
    }

    #[test]
    fn test_class_beats_type() {
        let out = run(r#"<p class="note">x</p>"#, "p { color: red; } .note { color: blue; }");
        assert_eq!(
            out,
            "<html><head><style>p { color: red; } .note { color: blue; }</style></head>\
             <p style=\"color: blue;\">x</p></html>"
        );
    }

    #[test]
    fn test_important_beats_specificity() {
        let out = run(
            r#"<div id="a"><p>x</p></div>"#,
            "#a p { color: red } p { color: green !important }",
        );
        assert!(out.contains(r#"<p style="color: green !important;">"#));

        let options = InlineOptions {
            keep_important: false,
            ..InlineOptions::default()
        };
        let out = inline(
            r#"<div id="a"><p>x</p></div>"#,
            "#a p { color: red } p { color: green !important }",
            &options,
        )
        .unwrap();
        assert!(out.contains(r#"<p style="color: green;">"#));
    }

    #[test]
    fn test_existing_inline_style_is_merged() {
        let out = run(
            r#"<p style="color: black; margin: 0">x</p>"#,
            "p { color: red; padding: 4px; margin: 2px !important }",
        );
        assert!(out.contains(r#"<p style="color: black; padding: 4px; margin: 2px !important;">"#));
    }

    #[test]
    fn test_existing_style_with_character_references() {
        let out = run(
            r#"<p style="font-family: &quot;Open Sans&quot;, serif">x</p>"#,
            "p { color: red }",
        );
        assert!(
            out.contains(r#"<p style="color: red; font-family: &quot;Open Sans&quot;, serif;">"#),
            "{out}"
        );

        let again = run(&out, "p { margin: 0 }");
        assert!(again.contains("font-family: &quot;Open Sans&quot;, serif;"), "{again}");
        assert!(again.contains("margin: 0;"), "{again}");
        assert!(!again.contains("&amp;quot;"), "{again}");
    }

    #[test]
    fn test_ampersands_survive_merging() {
        let out = run(
            r#"<p style="background: url(a.png?x=1&amp;y=2)">x</p>"#,
            "p { color: red }",
        );
        assert!(
            out.contains(r#"style="color: red; background: url(a.png?x=1&amp;y=2);""#),
            "{out}"
        );
    }

    #[test]
    fn test_unmatched_elements_are_untouched() {
        let out = run(r#"<span style="COLOR:Red">x</span>"#, "p { color: red }");
        assert!(out.contains(r#"<span style="COLOR:Red">x</span>"#));
    }

    #[test]
    fn test_head_and_script_are_not_styled() {
        let html = "<html><head><title>T</title></head><body><script>var a;</script></body></html>";
        let out = run(html, "* { margin: 0 }");
        assert!(out.contains("<title>T</title>"));
        assert!(out.contains("<script>var a;</script>"));
        assert!(out.contains(r#"<body style="margin: 0;">"#));
        assert!(out.contains(r#"<html style="margin: 0;">"#));
    }

    #[test]
    fn test_css_to_attributes() {
        let html = r#"<table width="50"><tr><td>x</td></tr></table><img src="a.png">"#;
        let css = "table { width: 600px; background-color: #fff } \
                   td { vertical-align: top; text-align: center; height: 2em } \
                   img { width: 100% }";
        let out = run(html, css);
        assert!(out.contains(r##"<table width="50" style="width: 600px; background-color: #fff;" bgcolor="#fff">"##));
        assert!(out.contains(r#"valign="top" align="center">"#));
        assert!(!out.contains("height=\""));
        assert!(out.contains(r#"<img src="a.png" style="width: 100%;" width="100%">"#));
    }

    #[test]
    fn test_existing_style_blocks_are_inlined() {
        let html = "<html><head><style>.a { color: red }</style></head><body><p class=a>x</p></body></html>";
        let out = run(html, ".a { margin: 0 }");
        assert!(out.contains(r#"<p style="color: red; margin: 0;">x</p>"#));
    }

    #[test]
    fn test_remove_style_block_keeps_media_queries() {
        let options = InlineOptions {
            remove_style_block: true,
            remove_classes: false,
            ..InlineOptions::default()
        };
        let out = inline(
            r#"<p class="a">x</p>"#,
            ".a { color: red } @media (max-width: 600px) { .a { color: blue } }",
            &options,
        )
        .unwrap();
        assert_eq!(
            out,
            "<html><head><style>@media (max-width: 600px) { .a { color: blue } }</style></head>\
             <p class=\"a\" style=\"color: red;\">x</p></html>"
        );

        let out = inline("<p>x</p>", "p { color: red }", &options).unwrap();
        assert_eq!(out, "<html><head></head><p style=\"color: red;\">x</p></html>");
    }

    #[test]
    fn test_strict_mode() {
        let css = "p { color: red } a:hover { color: blue }";
        assert!(inline("<p>x</p>", css, &InlineOptions::default()).is_ok());

        let strict = InlineOptions {
            strict: true,
            ..InlineOptions::default()
        };
        let err = inline("<p>x</p>", css, &strict).unwrap_err();
        assert!(err.is_stylesheet());
        assert!(err.to_string().contains("a:hover"));
    }

    #[test]
    fn test_errors() {
        let err = inline("<p class=\"x>", "p {}", &InlineOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DocumentParse { .. }));

        let err = inline("<p>x</p>", "p { color: red", &InlineOptions::default()).unwrap_err();
        assert!(err.is_stylesheet());
    }

    #[test]
    fn test_dimension() {
        assert_eq!(dimension("600px").as_deref(), Some("600"));
        assert_eq!(dimension("50%").as_deref(), Some("50%"));
        assert_eq!(dimension("120").as_deref(), Some("120"));
        assert_eq!(dimension("2em"), None);
        assert_eq!(dimension("auto"), None);
    }
}
