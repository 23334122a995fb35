// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use crate::{AId, Diagnostic, DiagnosticCode, Document, EId, NodeId, SvgNode};

/// A lookup table from `id` attribute values to elements.
///
/// The first element in document order wins. Subsequent elements with
/// the same `id` are reported via [`SymbolTable::diagnostics`] and ignored.
///
/// Besides the generic map, there are typed maps for paint servers, clip paths,
/// masks and patterns, so a reference to an element of a wrong kind
/// can be detected without looking at the element.
#[derive(Clone, Default, Debug)]
pub struct SymbolTable {
    elements: HashMap<String, NodeId>,
    gradients: HashMap<String, NodeId>,
    clip_paths: HashMap<String, NodeId>,
    masks: HashMap<String, NodeId>,
    patterns: HashMap<String, NodeId>,
    duplicates: Vec<NodeId>,
    diagnostics: Vec<Diagnostic>,
}

impl SymbolTable {
    /// Collects all element IDs from a document.
    pub fn build(doc: &Document) -> Self {
        let mut table = SymbolTable::default();
        for node in doc.descendants() {
            let id = node.element_id();
            if id.is_empty() {
                continue;
            }

            if table.elements.contains_key(id) {
                let diag = Diagnostic::new(
                    DiagnosticCode::DuplicateId,
                    format!("element ID '{}' is already used", id),
                    Some(node.span()),
                );
                diag.log();
                table.diagnostics.push(diag);
                table.duplicates.push(node.id());
                continue;
            }

            table.elements.insert(id.to_string(), node.id());

            let typed = match node.tag_name() {
                Some(EId::LinearGradient) | Some(EId::RadialGradient) => &mut table.gradients,
                Some(EId::ClipPath) => &mut table.clip_paths,
                Some(EId::Mask) => &mut table.masks,
                Some(EId::Pattern) => &mut table.patterns,
                _ => continue,
            };
            typed.insert(id.to_string(), node.id());
        }

        table
    }

    /// Returns an element by ID.
    #[inline]
    pub fn try_get(&self, id: &str) -> Option<NodeId> {
        self.elements.get(id).copied()
    }

    /// Returns a `linearGradient` or a `radialGradient` element by ID.
    #[inline]
    pub fn try_get_gradient(&self, id: &str) -> Option<NodeId> {
        self.gradients.get(id).copied()
    }

    /// Returns a `clipPath` element by ID.
    #[inline]
    pub fn try_get_clip_path(&self, id: &str) -> Option<NodeId> {
        self.clip_paths.get(id).copied()
    }

    /// Returns a `mask` element by ID.
    #[inline]
    pub fn try_get_mask(&self, id: &str) -> Option<NodeId> {
        self.masks.get(id).copied()
    }

    /// Returns a `pattern` element by ID.
    #[inline]
    pub fn try_get_pattern(&self, id: &str) -> Option<NodeId> {
        self.patterns.get(id).copied()
    }

    /// Returns the number of unique IDs.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Checks that the table has no IDs.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns elements shadowed by a previous element with the same ID.
    #[inline]
    pub fn duplicates(&self) -> &[NodeId] {
        &self.duplicates
    }

    /// Returns `duplicate-id` diagnostics collected during building.
    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns an element referenced by an `href` attribute.
    pub fn href_target<'a>(&self, node: SvgNode<'a>) -> Option<SvgNode<'a>> {
        let value = node.attribute_value(AId::Href)?;
        let id = parse_iri(&value)?;
        self.try_get(id).map(|id| node.document().get(id))
    }

    /// Returns an iterator over an `href` chain starting at `node`.
    ///
    /// The first item is `node` itself. The iteration stops at the first
    /// missing link or at the first element that was already visited.
    pub fn href_iter<'a>(&'a self, node: SvgNode<'a>) -> HrefIter<'a> {
        HrefIter {
            table: self,
            origin: node,
            curr: Some(node),
            visited: Vec::new(),
        }
    }
}

/// An iterator over `href` links.
#[derive(Clone, Debug)]
pub struct HrefIter<'a> {
    table: &'a SymbolTable,
    origin: SvgNode<'a>,
    curr: Option<SvgNode<'a>>,
    visited: Vec<NodeId>,
}

impl<'a> HrefIter<'a> {
    /// Checks that the iteration was stopped by a reference cycle.
    pub fn has_cycle(&self) -> bool {
        match self.curr {
            Some(node) => self.visited.contains(&node.id()),
            None => false,
        }
    }
}

impl<'a> Iterator for HrefIter<'a> {
    type Item = SvgNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.curr?;
        if self.visited.contains(&node.id()) {
            log::warn!(
                "Element '#{}' has a recursive 'xlink:href' chain.",
                self.origin.element_id()
            );
            return None;
        }

        self.visited.push(node.id());
        self.curr = self.table.href_target(node);
        Some(node)
    }
}

/// Parses an `#id` link.
///
/// Returns the ID without `#`. External references are not supported.
pub fn parse_iri(text: &str) -> Option<&str> {
    svgtypes::IRI::from_str(text).ok().map(|v| v.0)
}

/// Parses a `url(#id)` link.
///
/// Returns the ID without `#`.
pub fn parse_func_iri(text: &str) -> Option<&str> {
    svgtypes::FuncIRI::from_str(text).ok().map(|v| v.0)
}
