//! Selector parsing and matching.
//!
//! Supported: type, universal, class and id selectors, compounds of those,
//! and the descendant and child combinators. Anything else (pseudo-classes,
//! attribute selectors, sibling combinators) is rejected so the rule can be
//! skipped.

use std::fmt;

use crate::document::Element;

/// Selector specificity as `(ids, classes, types)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// A compound selector such as `td.note#total`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.ids.is_empty() && self.classes.is_empty()
    }

    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag
            && *tag != element.name
        {
            return false;
        }
        self.ids.iter().all(|id| element.id() == Some(id.as_str()))
            && self.classes.iter().all(|c| element.has_class(c))
    }
}

/// A parsed complex selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    text: String,
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
    specificity: Specificity,
}

impl Selector {
    /// Parses a single selector (no commas).
    ///
    /// # Errors
    ///
    /// Returns a description of the unsupported or malformed part.
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("empty selector".to_string());
        }

        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0;
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        let mut pending: Option<Combinator> = None;

        while pos < chars.len() {
            let c = chars[pos];
            if c.is_whitespace() {
                pos += 1;
                if !compounds.is_empty() && pending.is_none() {
                    pending = Some(Combinator::Descendant);
                }
                continue;
            }
            if c == '>' {
                if compounds.is_empty() || pending == Some(Combinator::Child) {
                    return Err(format!("dangling '>' in `{text}`"));
                }
                pending = Some(Combinator::Child);
                pos += 1;
                continue;
            }

            let compound = parse_compound(&chars, &mut pos)
                .map_err(|reason| format!("{reason} in `{text}`"))?;
            if let Some(combinator) = pending.take() {
                combinators.push(combinator);
            } else if !compounds.is_empty() {
                return Err(format!("unexpected token in `{text}`"));
            }
            compounds.push(compound);
        }

        if pending == Some(Combinator::Child) {
            return Err(format!("dangling '>' in `{text}`"));
        }

        let specificity = compounds.iter().fold(Specificity::default(), |acc, c| {
            Specificity(
                acc.0 + count(c.ids.len()),
                acc.1 + count(c.classes.len()),
                acc.2 + u32::from(c.tag.is_some()),
            )
        });

        Ok(Self {
            text: text.to_string(),
            compounds,
            combinators,
            specificity,
        })
    }

    /// Selector text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the specificity.
    #[must_use]
    pub const fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Tests the selector against an element.
    ///
    /// `ancestors` lists the element's ancestors from the root down to its
    /// parent.
    #[must_use]
    pub fn matches(&self, element: &Element, ancestors: &[&Element]) -> bool {
        let Some(last) = self.compounds.last() else {
            return false;
        };
        last.matches(element) && self.match_ancestors(self.compounds.len() - 1, ancestors)
    }

    /// Checks compounds before `index`, given that `compounds[index]` matched an
    /// element whose ancestors are `ancestors`.
    fn match_ancestors(&self, index: usize, ancestors: &[&Element]) -> bool {
        if index == 0 {
            return true;
        }
        let compound = &self.compounds[index - 1];
        match self.combinators[index - 1] {
            Combinator::Child => ancestors.split_last().is_some_and(|(parent, rest)| {
                compound.matches(parent) && self.match_ancestors(index - 1, rest)
            }),
            Combinator::Descendant => (0..ancestors.len()).rev().any(|i| {
                compound.matches(ancestors[i]) && self.match_ancestors(index - 1, &ancestors[..i])
            }),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn read_ident(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn parse_compound(chars: &[char], pos: &mut usize) -> Result<Compound, String> {
    let mut compound = Compound::default();
    let mut universal = false;

    if chars[*pos] == '*' {
        universal = true;
        *pos += 1;
    } else if is_ident_char(chars[*pos]) {
        compound.tag = Some(read_ident(chars, pos).to_ascii_lowercase());
    }

    while *pos < chars.len() {
        match chars[*pos] {
            '.' | '#' => {
                let kind = chars[*pos];
                *pos += 1;
                let name = read_ident(chars, pos);
                if name.is_empty() {
                    return Err(format!("missing name after '{kind}'"));
                }
                if kind == '.' {
                    compound.classes.push(name);
                } else {
                    compound.ids.push(name);
                }
            }
            ':' => return Err("pseudo selectors are not supported".to_string()),
            '[' => return Err("attribute selectors are not supported".to_string()),
            '+' | '~' => return Err("sibling combinators are not supported".to_string()),
            c if c.is_whitespace() || c == '>' => break,
            c => return Err(format!("unexpected '{c}'")),
        }
    }

    if compound.is_empty() && !universal {
        return Err("empty compound selector".to_string());
    }
    Ok(compound)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn test_specificity() {
        let cases = [
            ("p", Specificity(0, 0, 1)),
            ("*", Specificity(0, 0, 0)),
            (".note", Specificity(0, 1, 0)),
            ("#main td.total", Specificity(1, 1, 1)),
            ("ul > li.a.b", Specificity(0, 2, 2)),
        ];
        for (text, expected) in cases {
            assert_eq!(Selector::parse(text).unwrap().specificity(), expected, "{text}");
        }
    }

    #[test]
    fn test_unsupported_selectors() {
        for text in ["a:hover", "input[type=text]", "h1 + p", "p ~ p", "> p", "p >", "", "."] {
            assert!(Selector::parse(text).is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn test_descendant_and_child_matching() {
        let doc =
            Document::parse("<div id=main><table><tr><td class=x>1</td></tr></table></div>")
                .unwrap();
        let div = doc.find("div").unwrap();
        let table = doc.find("table").unwrap();
        let tr = doc.find("tr").unwrap();
        let td = doc.find("td").unwrap();
        let ancestors = [div, table, tr];

        let matching = ["td", "#main td", "div td.x", "tr > td", "table > tr > .x", "* td"];
        for text in matching {
            assert!(Selector::parse(text).unwrap().matches(td, &ancestors), "{text}");
        }

        let not_matching = ["div > td", "#other td", "td.y", "span td", "tr > table td"];
        for text in not_matching {
            assert!(!Selector::parse(text).unwrap().matches(td, &ancestors), "{text}");
        }
    }
}
