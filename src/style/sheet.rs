// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use svgtree::{Document, EId, Span, SvgNode};

use crate::Options;

/// A single `name: value` pair.
#[derive(Clone, PartialEq, Debug)]
pub struct Declaration {
    /// Property name. Lowercased unless it is a custom property.
    pub name: String,
    /// Property value without `!important`.
    pub value: String,
    /// Marked as `!important`.
    pub important: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct Rule {
    // Kept as text, since `simplecss::Selector` borrows its input.
    pub selector: String,
    pub specificity: u32,
    pub order: usize,
    pub declarations: Vec<Declaration>,
}

/// A list of CSS rules in document order.
#[derive(Clone, Default, Debug)]
pub struct StyleSheet {
    rules: Vec<Rule>,
    // `<?xml-stylesheet?>` links that could not be loaded.
    missing: Vec<(String, Span)>,
}

impl StyleSheet {
    /// Creates an empty style sheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects style sheets from a document.
    ///
    /// Sources are `<?xml-stylesheet?>` processing instructions (loaded through
    /// [`Options::resource_loader`]), `style` elements in document order and
    /// [`Options::style_sheet`], which is appended last.
    pub fn from_document(doc: &Document, opt: &Options) -> Self {
        let mut sheet = StyleSheet::new();

        for node in doc.prolog() {
            if let Some(href) = xml_stylesheet_href(node) {
                let path = opt.get_abs_path(std::path::Path::new(&href));
                match opt.resource_loader.load(&path) {
                    Some(data) => match String::from_utf8(data) {
                        Ok(text) => sheet.parse_more(&text),
                        Err(_) => {
                            log::warn!("'{}' is not an UTF-8 style sheet. Skipped.", href);
                            sheet.missing.push((href, node.span()));
                        }
                    },
                    None => {
                        log::warn!("Failed to load '{}'. Skipped.", href);
                        sheet.missing.push((href, node.span()));
                    }
                }
            }
        }

        for node in doc.descendants().filter(|n| n.has_tag_name(EId::Style)) {
            match node.attribute_value(svgtree::AId::Type).as_deref() {
                Some("text/css") | Some("") | None => {}
                Some(_) => continue,
            }

            let text: String = node
                .children()
                .filter(|n| n.is_text())
                .map(|n| n.text())
                .collect();
            sheet.parse_more(&text);
        }

        if let Some(ref text) = opt.style_sheet {
            sheet.parse_more(text);
        }

        sheet
    }

    /// Parses a style sheet text and appends its rules.
    ///
    /// Invalid selectors are skipped. At-rules are ignored.
    pub fn parse_more(&mut self, text: &str) {
        let text = strip_comments(text);
        let mut s = text.as_str();

        loop {
            s = s.trim_start();
            if let Some(rest) = s.strip_prefix("<!--").or_else(|| s.strip_prefix("-->")) {
                s = rest;
                continue;
            }

            if s.is_empty() {
                break;
            }

            if s.starts_with('@') {
                s = skip_at_rule(s);
                continue;
            }

            let open = match s.find('{') {
                Some(idx) => idx,
                None => {
                    log::warn!("A CSS rule without a block. Skipped.");
                    break;
                }
            };

            let selectors = &s[..open];
            let close = match find_block_end(s, open) {
                Some(idx) => idx,
                None => s.len(),
            };
            let block = &s[open + 1..close];
            s = s.get(close + 1..).unwrap_or("");

            let declarations = parse_declarations(block);
            for selector in selectors.split(',') {
                let selector = selector.trim();
                if simplecss::Selector::parse(selector).is_none() {
                    log::warn!("'{}' is not a supported selector. Skipped.", selector);
                    continue;
                }

                let order = self.rules.len();
                self.rules.push(Rule {
                    selector: selector.to_string(),
                    specificity: specificity(selector),
                    order,
                    declarations: declarations.clone(),
                });
            }
        }
    }

    /// Returns the number of rules.
    ///
    /// A selector list produces one rule per selector.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Checks that the style sheet has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns style sheet links that could not be loaded.
    pub(crate) fn missing(&self) -> &[(String, Span)] {
        &self.missing
    }

    /// Returns rules matching `node`, in document order.
    pub(crate) fn matching_rules<'a>(
        &'a self,
        node: SvgNode<'a>,
    ) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |rule| {
            simplecss::Selector::parse(&rule.selector)
                .map(|selector| selector.matches(&CssNode(node)))
                .unwrap_or(false)
        })
    }
}

fn xml_stylesheet_href(node: SvgNode) -> Option<String> {
    if node.pi_target() != Some("xml-stylesheet") {
        return None;
    }

    let value = node.text();
    let mut href = None;
    let mut is_css = true;
    for (name, value) in pseudo_attributes(value) {
        match name {
            "href" => href = Some(value.to_string()),
            "type" => is_css = value == "text/css",
            _ => {}
        }
    }

    if is_css {
        href
    } else {
        None
    }
}

fn pseudo_attributes(text: &str) -> impl Iterator<Item = (&str, &str)> {
    let mut s = text;
    std::iter::from_fn(move || {
        s = s.trim_start();
        let eq = s.find('=')?;
        let name = s[..eq].trim();
        let rest = s[eq + 1..].trim_start();
        let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let end = rest[1..].find(quote)? + 1;
        let value = &rest[1..end];
        s = &rest[end + 1..];
        Some((name, value))
    })
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut s = text;
    while let Some(start) = s.find("/*") {
        out.push_str(&s[..start]);
        match s[start + 2..].find("*/") {
            Some(end) => s = &s[start + 2 + end + 2..],
            None => {
                s = "";
                break;
            }
        }
    }
    out.push_str(s);
    out
}

fn skip_at_rule(s: &str) -> &str {
    let semicolon = s.find(';');
    let open = s.find('{');
    match (semicolon, open) {
        (Some(sc), Some(o)) if sc < o => &s[sc + 1..],
        (Some(sc), None) => &s[sc + 1..],
        (_, Some(o)) => match find_block_end(s, o) {
            Some(end) => &s[end + 1..],
            None => "",
        },
        (None, None) => "",
    }
}

// Returns the index of a `}` that closes a `{` at `open`.
fn find_block_end(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0;
    let mut quote = None;
    for (i, c) in s[open..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parses a declaration block, like the content of a `style` attribute.
///
/// Custom properties (`--name`) keep their case. `!important` is detected
/// and removed from the value. Empty names and values are skipped.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    let mut list = Vec::new();
    for item in split_top_level(text, ';') {
        let colon = match item.find(':') {
            Some(idx) => idx,
            None => {
                if !item.trim().is_empty() {
                    log::warn!("Invalid CSS declaration: '{}'. Skipped.", item.trim());
                }
                continue;
            }
        };

        let name = item[..colon].trim();
        let mut value = item[colon + 1..].trim();
        if name.is_empty() {
            continue;
        }

        let mut important = false;
        if let Some(idx) = value.rfind('!') {
            if value[idx + 1..].trim().eq_ignore_ascii_case("important") {
                important = true;
                value = value[..idx].trim_end();
            }
        }

        if value.is_empty() {
            continue;
        }

        let name = if name.starts_with("--") {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        };

        list.push(Declaration {
            name,
            value: value.to_string(),
            important,
        });
    }

    list
}

// Splits by `sep` outside of quotes and parentheses.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, c) if c == sep && depth <= 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Computes a selector specificity as `ids * 10000 + classes * 100 + types`.
///
/// Attribute selectors and pseudo-classes are counted as classes.
fn specificity(selector: &str) -> u32 {
    let (mut ids, mut classes, mut types) = (0u32, 0u32, 0u32);
    let bytes = selector.as_bytes();
    let mut i = 0;
    let mut at_compound_start = true;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'#' => {
                ids += 1;
                i = skip_ident(bytes, i + 1);
                at_compound_start = false;
            }
            b'.' | b':' => {
                classes += 1;
                i = skip_ident(bytes, i + 1);
                // `:first-child` and friends may have arguments.
                if bytes.get(i) == Some(&b'(') {
                    while i < bytes.len() && bytes[i] != b')' {
                        i += 1;
                    }
                    i += 1;
                }
                at_compound_start = false;
            }
            b'[' => {
                classes += 1;
                while i < bytes.len() && bytes[i] != b']' {
                    i += 1;
                }
                i += 1;
                at_compound_start = false;
            }
            b'*' => {
                i += 1;
                at_compound_start = false;
            }
            b' ' | b'>' | b'+' | b'~' | b'\t' | b'\n' => {
                i += 1;
                at_compound_start = true;
            }
            _ => {
                if at_compound_start {
                    types += 1;
                }
                i = skip_ident(bytes, i).max(i + 1);
                at_compound_start = false;
            }
        }
    }

    ids * 10000 + classes * 100 + types
}

fn skip_ident(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b'_') || bytes[i] >= 0x80) {
        i += 1;
    }
    i
}

#[derive(Clone, Copy)]
struct CssNode<'a>(SvgNode<'a>);

impl simplecss::Element for CssNode<'_> {
    fn parent_element(&self) -> Option<Self> {
        self.0.parent_element().map(CssNode)
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.0.prev_sibling_element().map(CssNode)
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.0.local_name() == local_name
    }

    fn attribute_matches(&self, local_name: &str, operator: simplecss::AttributeOperator) -> bool {
        let doc = self.0.document();
        match self
            .0
            .attributes()
            .iter()
            .find(|a| a.local_name(doc) == local_name)
        {
            Some(attr) => operator.matches(&attr.value(doc)),
            None => false,
        }
    }

    fn pseudo_class_matches(&self, class: simplecss::PseudoClass) -> bool {
        match class {
            simplecss::PseudoClass::FirstChild => self.prev_sibling_element().is_none(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations() {
        let list = parse_declarations("fill: red; --Main-Color:#00f ;stroke:url(#a) !important;;");
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].name, "fill");
        assert_eq!(list[0].value, "red");
        assert_eq!(list[1].name, "--Main-Color");
        assert_eq!(list[1].value, "#00f");
        assert_eq!(list[2].value, "url(#a)");
        assert!(list[2].important);
    }

    #[test]
    fn declarations_with_nested_semicolons() {
        let list = parse_declarations("font-family: 'a;b'; fill: var(--c, rgb(1, 2, 3))");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].value, "'a;b'");
        assert_eq!(list[1].value, "var(--c, rgb(1, 2, 3))");
    }

    #[test]
    fn rules() {
        let mut sheet = StyleSheet::new();
        sheet.parse_more(
            "/* comment */ @import url(a.css); @media print { rect { fill: red } }\
             rect, .a { fill: green } #b > g { stroke: blue }",
        );
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.rules[0].selector, "rect");
        assert_eq!(sheet.rules[1].selector, ".a");
        assert_eq!(sheet.rules[2].declarations[0].name, "stroke");
    }

    #[test]
    fn selector_specificity() {
        assert_eq!(specificity("rect"), 1);
        assert_eq!(specificity(".a"), 100);
        assert_eq!(specificity("#a"), 10000);
        assert_eq!(specificity("g > rect.a:first-child"), 202);
        assert_eq!(specificity("rect[fill='red']"), 101);
        assert_eq!(specificity("*"), 0);
    }

    #[test]
    fn matching() {
        let doc = Document::parse_str("<svg><g class='x'><rect id='r'/></g></svg>");
        let mut sheet = StyleSheet::new();
        sheet.parse_more(".x rect { fill: red } circle { fill: blue } g > #r { fill: green }");
        let rect = doc
            .descendants()
            .find(|n| n.element_id() == "r")
            .unwrap();
        let matched: Vec<_> = sheet
            .matching_rules(rect)
            .map(|r| r.selector.as_str())
            .collect();
        assert_eq!(matched, vec![".x rect", "g > #r"]);
    }

    #[test]
    fn xml_stylesheet_pi() {
        let doc = Document::parse_str(
            "<?xml-stylesheet type='text/css' href='style.css'?><svg/>",
        );
        let pi = doc.prolog().next().unwrap();
        assert_eq!(xml_stylesheet_href(pi).as_deref(), Some("style.css"));
    }
}
