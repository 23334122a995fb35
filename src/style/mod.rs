// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Style cascade.
//!
//! Computes an effective property set for an element from presentation
//! attributes, matched style sheet rules and the `style` attribute.
//! Resolution is a pure function of the element, its parent style and
//! the style sheet, so it can be done in any order.

use std::collections::HashMap;

use svgtree::{AId, FromValue, SvgNode};

use crate::Options;

mod sheet;

pub use sheet::{parse_declarations, Declaration, StyleSheet};

/// A declaration origin.
///
/// Ordered from the lowest priority to the highest.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Origin {
    Inherited,
    Presentation,
    StyleSheet,
    Inline,
}

/// A resolved property value.
#[derive(Clone, PartialEq, Debug)]
pub struct Property {
    /// Property value with `var()` references substituted.
    pub value: String,
    /// Where the value came from.
    pub origin: Origin,
}

/// An effective property set of an element.
#[derive(Clone, PartialEq, Debug)]
pub struct ResolvedStyle {
    properties: HashMap<AId, Property>,
    custom: HashMap<String, String>,
    font_size: f32,
}

impl ResolvedStyle {
    /// Creates a style without properties.
    ///
    /// Used as a parent of the root element.
    pub fn root(opt: &Options) -> Self {
        ResolvedStyle {
            properties: HashMap::new(),
            custom: HashMap::new(),
            font_size: opt.font_size,
        }
    }

    /// Returns a property value.
    pub fn get(&self, aid: AId) -> Option<&str> {
        self.properties.get(&aid).map(|p| p.value.as_str())
    }

    /// Returns a property origin.
    pub fn origin(&self, aid: AId) -> Option<Origin> {
        self.properties.get(&aid).map(|p| p.origin)
    }

    /// Checks that a property is set.
    pub fn contains(&self, aid: AId) -> bool {
        self.properties.contains_key(&aid)
    }

    /// Returns a computed custom property value, like `--main-color`.
    pub fn custom_property(&self, name: &str) -> Option<&str> {
        self.custom.get(name).map(String::as_str)
    }

    /// Returns an absolute font size.
    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Returns an iterator over all properties.
    pub fn iter(&self) -> impl Iterator<Item = (AId, &Property)> {
        self.properties.iter().map(|(aid, p)| (*aid, p))
    }

    /// Parses a property value.
    ///
    /// Logs a warning when the value cannot be parsed.
    pub(crate) fn parse<T: FromValue>(&self, node: SvgNode, aid: AId) -> Option<T> {
        let value = self.get(aid)?;
        match T::parse(node, aid, value) {
            Some(v) => Some(v),
            None => {
                log::warn!("Failed to parse {} value: '{}'.", aid, value);
                None
            }
        }
    }
}

// (origin, important, specificity, order)
type Rank = (Origin, bool, u32, usize);

/// Resolves element styles against a style sheet.
#[derive(Clone, Copy, Debug)]
pub struct StyleResolver<'a> {
    sheet: &'a StyleSheet,
    opt: &'a Options,
}

impl<'a> StyleResolver<'a> {
    /// Creates a new resolver.
    pub fn new(sheet: &'a StyleSheet, opt: &'a Options) -> Self {
        StyleResolver { sheet, opt }
    }

    /// Resolves an element style.
    ///
    /// `parent` is the style inherited values are taken from. It is usually
    /// the parent element style, but instanced content passes the style of
    /// the referencing `use` instead.
    pub fn resolve(&self, node: SvgNode, parent: Option<&ResolvedStyle>) -> ResolvedStyle {
        let root;
        let parent = match parent {
            Some(p) => p,
            None => {
                root = ResolvedStyle::root(self.opt);
                &root
            }
        };

        let declared = self.cascade(node);

        let mut own_custom = HashMap::new();
        let mut own = Vec::new();
        for (name, (rank, value)) in declared {
            if name.starts_with("--") {
                own_custom.insert(name, value);
            } else if let Some(aid) = AId::from_str(&name) {
                own.push((aid, rank.0, value));
            }
        }

        let scope = VarScope {
            own: &own_custom,
            inherited: &parent.custom,
        };

        let mut custom = parent.custom.clone();
        for name in own_custom.keys() {
            match scope.lookup(name, &mut Vec::new()) {
                Some(value) => {
                    custom.insert(name.clone(), value);
                }
                None => {
                    custom.remove(name);
                }
            }
        }

        let mut properties: HashMap<AId, Property> = parent
            .properties
            .iter()
            .filter(|(aid, _)| aid.is_inheritable())
            .map(|(aid, p)| {
                let p = Property {
                    value: p.value.clone(),
                    origin: Origin::Inherited,
                };
                (*aid, p)
            })
            .collect();

        let mut has_own_font_size = false;
        for (aid, origin, value) in own {
            let value = if value.contains("var(") {
                match scope.substitute(&value, &mut Vec::new()) {
                    Some(v) => v,
                    None => {
                        log::warn!("Failed to resolve '{}' in {}. Unset.", value, aid);
                        if !aid.is_inheritable() {
                            properties.remove(&aid);
                        }
                        continue;
                    }
                }
            } else {
                value
            };

            if value.trim() == "inherit" {
                match parent.properties.get(&aid) {
                    Some(p) => {
                        let p = Property {
                            value: p.value.clone(),
                            origin: Origin::Inherited,
                        };
                        properties.insert(aid, p);
                    }
                    None => {
                        properties.remove(&aid);
                    }
                }
                continue;
            }

            if aid == AId::FontSize {
                has_own_font_size = true;
            }

            properties.insert(aid, Property { value, origin });
        }

        let mut font_size = parent.font_size;
        if has_own_font_size {
            if let Some(p) = properties.get_mut(&AId::FontSize) {
                match crate::units::convert_font_size(&p.value, parent.font_size, self.opt.dpi) {
                    Some(size) => {
                        font_size = size;
                        p.value = size.to_string();
                    }
                    None => {
                        log::warn!("Invalid 'font-size' value: '{}'.", p.value);
                        p.value = font_size.to_string();
                    }
                }
            }
        }

        ResolvedStyle {
            properties,
            custom,
            font_size,
        }
    }

    /// Resolves an element style by walking its ancestors from the root.
    pub fn resolve_in_tree(&self, node: SvgNode) -> ResolvedStyle {
        let mut chain: Vec<_> = node.ancestors().filter(|n| n.is_element()).collect();
        chain.reverse();

        let mut style = ResolvedStyle::root(self.opt);
        for n in chain {
            style = self.resolve(n, Some(&style));
        }

        style
    }

    // Collects winning declarations by name.
    fn cascade(&self, node: SvgNode) -> HashMap<String, (Rank, String)> {
        let mut declared: HashMap<String, (Rank, String)> = HashMap::new();
        let mut insert = |name: &str, rank: Rank, value: &str| {
            let names: &[&str] = if name == "marker" {
                &["marker-start", "marker-mid", "marker-end"]
            } else {
                std::slice::from_ref(&name)
            };

            for name in names {
                if !name.starts_with("--") && !is_property(name) {
                    continue;
                }

                match declared.get(*name) {
                    Some((prev, _)) if *prev > rank => {}
                    _ => {
                        declared.insert(name.to_string(), (rank, value.to_string()));
                    }
                }
            }
        };

        let doc = node.document();
        for attr in node.attributes() {
            if let Some(aid) = attr.id() {
                if aid.is_presentation() {
                    insert(aid.to_str(), (Origin::Presentation, false, 0, 0), &attr.value(doc));
                }
            }
        }

        for rule in self.sheet.matching_rules(node) {
            for decl in &rule.declarations {
                let rank = (Origin::StyleSheet, decl.important, rule.specificity, rule.order);
                insert(&decl.name, rank, &decl.value);
            }
        }

        if let Some(text) = node.attribute_value(AId::Style) {
            for (i, decl) in parse_declarations(&text).into_iter().enumerate() {
                insert(&decl.name, (Origin::Inline, decl.important, 0, i), &decl.value);
            }
        }

        declared
    }
}

fn is_property(name: &str) -> bool {
    AId::from_str(name).map(|aid| aid.is_presentation()).unwrap_or(false)
}

// Custom properties visible to an element.
struct VarScope<'a> {
    own: &'a HashMap<String, String>,
    inherited: &'a HashMap<String, String>,
}

impl VarScope<'_> {
    // `stack` holds custom properties being substituted.
    fn lookup(&self, name: &str, stack: &mut Vec<String>) -> Option<String> {
        if let Some(raw) = self.own.get(name) {
            if stack.iter().any(|n| n == name) {
                log::warn!("Custom property '{}' references itself.", name);
                return None;
            }

            stack.push(name.to_string());
            let value = self.substitute(raw, stack);
            stack.pop();
            return value;
        }

        self.inherited.get(name).cloned()
    }

    fn substitute(&self, value: &str, stack: &mut Vec<String>) -> Option<String> {
        let mut out = String::with_capacity(value.len());
        let mut s = value;
        while let Some(start) = s.find("var(") {
            out.push_str(&s[..start]);

            let args_start = start + 4;
            let end = find_closing_paren(s, args_start)?;
            let args = &s[args_start..end];
            let (name, fallback) = match args.find(',') {
                Some(idx) => (args[..idx].trim(), Some(args[idx + 1..].trim())),
                None => (args.trim(), None),
            };

            let resolved = match self.lookup(name, stack) {
                Some(v) => v,
                None => self.substitute(fallback?, stack)?,
            };
            out.push_str(resolved.trim());

            s = &s[end + 1..];
        }

        out.push_str(s);
        Some(out)
    }
}

fn find_closing_paren(s: &str, from: usize) -> Option<usize> {
    let mut depth = 1;
    for (i, c) in s[from..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + i);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgtree::Document;

    fn find<'a>(doc: &'a Document, id: &str) -> SvgNode<'a> {
        doc.descendants().find(|n| n.element_id() == id).unwrap()
    }

    #[test]
    fn var_with_nesting() {
        let own: HashMap<String, String> = [
            ("--a".to_string(), "var(--b)".to_string()),
            ("--b".to_string(), "red".to_string()),
        ]
        .into_iter()
        .collect();
        let inherited = HashMap::new();
        let scope = VarScope {
            own: &own,
            inherited: &inherited,
        };
        assert_eq!(scope.substitute("var(--a)", &mut Vec::new()).as_deref(), Some("red"));
        assert_eq!(
            scope.substitute("var(--x, var(--b))", &mut Vec::new()).as_deref(),
            Some("red")
        );
        assert_eq!(scope.substitute("var(--x)", &mut Vec::new()), None);
    }

    #[test]
    fn var_cycle() {
        let own: HashMap<String, String> = [
            ("--a".to_string(), "var(--b)".to_string()),
            ("--b".to_string(), "var(--a)".to_string()),
        ]
        .into_iter()
        .collect();
        let inherited = HashMap::new();
        let scope = VarScope {
            own: &own,
            inherited: &inherited,
        };
        assert_eq!(scope.substitute("var(--a)", &mut Vec::new()), None);
        assert_eq!(
            scope.substitute("var(--a, blue)", &mut Vec::new()).as_deref(),
            Some("blue")
        );
    }

    #[test]
    fn inheritance() {
        let doc = Document::parse_str(
            "<svg fill='red' opacity='0.5'><g id='g' stroke='blue'><rect id='r'/></g></svg>",
        );
        let opt = Options::default();
        let sheet = StyleSheet::new();
        let resolver = StyleResolver::new(&sheet, &opt);
        let style = resolver.resolve_in_tree(find(&doc, "r"));
        assert_eq!(style.get(AId::Fill), Some("red"));
        assert_eq!(style.get(AId::Stroke), Some("blue"));
        assert_eq!(style.origin(AId::Fill), Some(Origin::Inherited));
        assert_eq!(style.get(AId::Opacity), None);
    }

    #[test]
    fn explicit_inherit() {
        let doc = Document::parse_str(
            "<svg><g opacity='0.5'><rect id='r' opacity='inherit'/></g></svg>",
        );
        let opt = Options::default();
        let sheet = StyleSheet::new();
        let resolver = StyleResolver::new(&sheet, &opt);
        let style = resolver.resolve_in_tree(find(&doc, "r"));
        assert_eq!(style.get(AId::Opacity), Some("0.5"));
    }

    #[test]
    fn important_beats_specificity() {
        let doc = Document::parse_str("<svg><rect id='r' class='a'/></svg>");
        let opt = Options::default();
        let mut sheet = StyleSheet::new();
        sheet.parse_more("rect { fill: green !important } #r.a { fill: red }");
        let resolver = StyleResolver::new(&sheet, &opt);
        let style = resolver.resolve_in_tree(find(&doc, "r"));
        assert_eq!(style.get(AId::Fill), Some("green"));
    }

    #[test]
    fn later_rule_wins_on_equal_specificity() {
        let doc = Document::parse_str("<svg><rect id='r' class='a b'/></svg>");
        let opt = Options::default();
        let mut sheet = StyleSheet::new();
        sheet.parse_more(".b { fill: red } .a { fill: green }");
        let resolver = StyleResolver::new(&sheet, &opt);
        let style = resolver.resolve_in_tree(find(&doc, "r"));
        assert_eq!(style.get(AId::Fill), Some("green"));
    }

    #[test]
    fn marker_shorthand() {
        let doc = Document::parse_str("<svg><path id='p' style='marker:url(#m)'/></svg>");
        let opt = Options::default();
        let sheet = StyleSheet::new();
        let resolver = StyleResolver::new(&sheet, &opt);
        let style = resolver.resolve_in_tree(find(&doc, "p"));
        assert_eq!(style.get(AId::MarkerStart), Some("url(#m)"));
        assert_eq!(style.get(AId::MarkerEnd), Some("url(#m)"));
    }

    #[test]
    fn font_size() {
        let doc = Document::parse_str(
            "<svg font-size='20'><g style='font-size:50%'><text id='t' font-size='2em'/></g></svg>",
        );
        let opt = Options::default();
        let sheet = StyleSheet::new();
        let resolver = StyleResolver::new(&sheet, &opt);
        let style = resolver.resolve_in_tree(find(&doc, "t"));
        assert_eq!(style.font_size(), 20.0);
    }

    #[test]
    fn unresolved_var_is_unset() {
        let doc = Document::parse_str(
            "<svg fill='blue'><rect id='r' style='fill:var(--missing); opacity: var(--x)'/></svg>",
        );
        let opt = Options::default();
        let sheet = StyleSheet::new();
        let resolver = StyleResolver::new(&sheet, &opt);
        let style = resolver.resolve_in_tree(find(&doc, "r"));
        assert_eq!(style.get(AId::Fill), Some("blue"));
        assert_eq!(style.get(AId::Opacity), None);
    }
}
