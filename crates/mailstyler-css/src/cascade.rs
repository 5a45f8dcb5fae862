//! Per-element cascade resolution.

use crate::selector::Specificity;
use crate::stylesheet::Declaration;

/// Ordering key of a candidate declaration. The greatest key wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Priority {
    important: bool,
    inline: bool,
    specificity: Specificity,
    order: usize,
    index: usize,
}

/// Declarations competing for one element.
#[derive(Debug, Default)]
pub(crate) struct Cascade {
    candidates: Vec<(Priority, Declaration)>,
}

impl Cascade {
    /// Adds a declaration from a stylesheet rule.
    pub(crate) fn add_rule_declaration(
        &mut self,
        declaration: &Declaration,
        specificity: Specificity,
        order: usize,
        index: usize,
    ) {
        let priority = Priority {
            important: declaration.important,
            inline: false,
            specificity,
            order,
            index,
        };
        self.candidates.push((priority, declaration.clone()));
    }

    /// Adds a declaration from the element's own `style` attribute.
    pub(crate) fn add_inline_declaration(&mut self, declaration: Declaration, index: usize) {
        let priority = Priority {
            important: declaration.important,
            inline: true,
            specificity: Specificity::default(),
            order: 0,
            index,
        };
        self.candidates.push((priority, declaration));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Resolves one winning declaration per property.
    ///
    /// Properties appear in the order they are first seen when candidates are
    /// visited from lowest to highest priority.
    pub(crate) fn resolve(mut self) -> Vec<Declaration> {
        self.candidates.sort_by(|a, b| a.0.cmp(&b.0));
        let mut resolved: Vec<Declaration> = Vec::new();
        for (_, declaration) in self.candidates {
            match resolved
                .iter_mut()
                .find(|d| d.property == declaration.property)
            {
                Some(slot) => *slot = declaration,
                None => resolved.push(declaration),
            }
        }
        resolved
    }
}

/// Formats resolved declarations for a `style` attribute.
pub(crate) fn to_style_attribute(declarations: &[Declaration], keep_important: bool) -> String {
    declarations
        .iter()
        .map(|d| d.to_css(keep_important))
        .collect::<Vec<_>>()
        .join(" ")
}
