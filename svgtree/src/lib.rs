// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Represents an SVG document as a read-only tree.

Unlike most XML parsers, the builder never fails: malformed markup is
recovered from and reported as [`Diagnostic`]s attached to the [`Document`].
Attribute values are stored as spans into a shared [`SourceBuffer`],
so building a tree does not copy attribute text.

```
let doc = svgtree::Document::parse_str("<svg><rect width='10' height='10'/>");
assert_eq!(doc.root_element().unwrap().children().count(), 1);
assert_eq!(doc.diagnostics().len(), 1); // unclosed `svg`
```
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::borrow::Cow;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::str::FromStr;

mod diagnostics;
mod names;
mod parse;
mod source;
mod stream;
mod symbols;
mod text;

pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use names::{AId, EId};
pub use parse::TextEdit;
pub use source::{SourceBuffer, Span, TextPos};
pub use symbols::{parse_func_iri, parse_iri, HrefIter, SymbolTable};
pub use text::normalize_text;

pub use svgtypes;

/// The SVG namespace.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
/// The XLink namespace.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
/// The XML namespace.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// An SVG document.
///
/// Immutable once built. Use [`Document::reparse`] to get a document for an edited text.
pub struct Document {
    source: SourceBuffer,
    nodes: Vec<NodeData>,
    attrs: Vec<Attribute>,
    namespaces: Vec<String>,
    entities: HashMap<String, String>,
    diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// Returns the root node.
    ///
    /// The root node is not an element. Its children are the prolog nodes,
    /// the root element and the epilog nodes.
    #[inline]
    pub fn root(&self) -> SvgNode {
        self.get(NodeId::new(0))
    }

    /// Returns the root element.
    ///
    /// `None` only when the text has no elements at all.
    #[inline]
    pub fn root_element(&self) -> Option<SvgNode> {
        self.root().first_element_child()
    }

    /// Returns comments and processing instructions preceding the root element.
    pub fn prolog(&self) -> impl Iterator<Item = SvgNode<'_>> + '_ {
        self.root().children().take_while(|n| !n.is_element())
    }

    /// Returns comments and processing instructions following the root element.
    pub fn epilog(&self) -> impl Iterator<Item = SvgNode<'_>> + '_ {
        self.root()
            .children()
            .skip_while(|n| !n.is_element())
            .skip(1)
            .filter(|n| !n.is_element())
    }

    /// Returns an iterator over document's descendant nodes.
    ///
    /// Shorthand for `doc.root().descendants()`.
    #[inline]
    pub fn descendants(&self) -> Descendants {
        self.root().descendants()
    }

    /// Returns a node by ID.
    ///
    /// # Panics
    ///
    /// When the ID belongs to another document and is out of bounds.
    #[inline]
    pub fn get(&self, id: NodeId) -> SvgNode {
        SvgNode {
            id,
            d: &self.nodes[id.get_usize()],
            doc: self,
        }
    }

    /// Returns the source text.
    #[inline]
    pub fn source(&self) -> &SourceBuffer {
        &self.source
    }

    /// Returns diagnostics collected during building.
    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns the number of nodes, including the root one.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks that the document has no nodes besides the root one.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn namespace_uri(&self, ns: NsId) -> &str {
        &self.namespaces[ns.0 as usize]
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        if !self.root().has_children() {
            return write!(f, "Document []");
        }

        macro_rules! writeln_indented {
            ($depth:expr, $f:expr, $fmt:expr) => {
                for _ in 0..$depth { write!($f, "    ")?; }
                writeln!($f, $fmt)?;
            };
            ($depth:expr, $f:expr, $fmt:expr, $($arg:tt)*) => {
                for _ in 0..$depth { write!($f, "    ")?; }
                writeln!($f, $fmt, $($arg)*)?;
            };
        }

        fn print_children(
            parent: SvgNode,
            depth: usize,
            f: &mut std::fmt::Formatter,
        ) -> Result<(), std::fmt::Error> {
            for child in parent.children() {
                if child.is_element() {
                    writeln_indented!(depth, f, "Element {{");
                    writeln_indented!(depth, f, "    name: {:?}", child.local_name());

                    if !child.attributes().is_empty() {
                        writeln_indented!(depth + 1, f, "attributes: [");
                        for attr in child.attributes() {
                            writeln_indented!(
                                depth + 2,
                                f,
                                "{} = {:?}",
                                attr.local_name(child.doc),
                                attr.value(child.doc)
                            );
                        }
                        writeln_indented!(depth + 1, f, "]");
                    }

                    if child.has_children() {
                        writeln_indented!(depth, f, "    children: [");
                        print_children(child, depth + 2, f)?;
                        writeln_indented!(depth, f, "    ]");
                    }

                    writeln_indented!(depth, f, "}}");
                } else {
                    writeln_indented!(depth, f, "{:?}", child);
                }
            }

            Ok(())
        }

        writeln!(f, "Document [")?;
        print_children(self.root(), 1, f)?;
        writeln!(f, "]")?;

        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct ShortRange {
    start: u32,
    end: u32,
}

impl ShortRange {
    #[inline]
    fn new(start: u32, end: u32) -> Self {
        ShortRange { start, end }
    }

    #[inline]
    fn to_urange(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// A node ID.
///
/// Valid only for the document that produced it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    #[inline]
    fn new(id: u32) -> Self {
        debug_assert!(id < u32::MAX);

        // We are using `NonZeroU32` to reduce overhead of `Option<NodeId>`.
        NodeId(NonZeroU32::MIN.saturating_add(id))
    }

    /// Returns the node's index in document order.
    #[inline]
    pub fn get(self) -> u32 {
        self.0.get() - 1
    }

    #[inline]
    fn get_usize(self) -> usize {
        self.get() as usize
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(id: usize) -> Self {
        // We already checked that `id` is limited by u32::MAX.
        debug_assert!(id <= u32::MAX as usize);
        NodeId::new(id as u32)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct NsId(u16);

/// A qualified name.
#[derive(Clone, Copy, Debug)]
struct QName {
    ns: Option<NsId>,
    prefix: Option<Span>,
    local: Span,
}

/// The `xml:space` mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[allow(missing_docs)]
pub enum XmlSpace {
    Default,
    Preserve,
}

impl Default for XmlSpace {
    fn default() -> Self {
        XmlSpace::Default
    }
}

/// Element flags.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ElementFlags {
    /// The element was written as `<name/>`.
    pub self_closing: bool,
    /// The element has a non-empty `id` attribute.
    pub has_id: bool,
    /// The element has a `style` attribute.
    pub has_style: bool,
}

struct ElementData {
    name: QName,
    tag: Option<EId>,
    attributes: ShortRange,
    xml_space: XmlSpace,
    flags: ElementFlags,
    id: Box<str>,
    span: Span,
}

enum NodeKind {
    Root,
    Element(ElementData),
    Text { text: String, span: Span },
    Comment(Span),
    ProcessingInstruction { target: Span, value: Option<Span> },
}

struct NodeData {
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    children: Option<(NodeId, NodeId)>,
    kind: NodeKind,
}

/// An attribute.
///
/// Stores only spans. Use [`Attribute::value`] to materialize the text.
#[derive(Clone, Copy, Debug)]
pub struct Attribute {
    name: QName,
    aid: Option<AId>,
    value: Span,
    span: Span,
}

impl Attribute {
    /// Returns a known attribute ID.
    ///
    /// `None` for unknown attributes and attributes in foreign namespaces.
    #[inline]
    pub fn id(&self) -> Option<AId> {
        self.aid
    }

    /// Returns attribute's local name.
    #[inline]
    pub fn local_name<'a>(&self, doc: &'a Document) -> &'a str {
        doc.source.slice(self.name.local)
    }

    /// Returns attribute's prefix.
    #[inline]
    pub fn prefix<'a>(&self, doc: &'a Document) -> Option<&'a str> {
        self.name.prefix.map(|span| doc.source.slice(span))
    }

    /// Returns attribute's namespace URI.
    #[inline]
    pub fn namespace<'a>(&self, doc: &'a Document) -> Option<&'a str> {
        self.name.ns.map(|ns| doc.namespace_uri(ns))
    }

    /// Returns the raw value as written in the source, including quotes.
    #[inline]
    pub fn raw<'a>(&self, doc: &'a Document) -> &'a str {
        doc.source.slice(self.value)
    }

    /// Returns the value with quotes stripped, references expanded
    /// and whitespace normalized.
    pub fn value<'a>(&self, doc: &'a Document) -> Cow<'a, str> {
        let raw = strip_quotes(self.raw(doc));
        text::decode(raw, &doc.entities, true)
    }

    /// Returns the span of the value, including quotes.
    #[inline]
    pub fn value_span(&self) -> Span {
        self.value
    }

    /// Returns the span of the whole attribute.
    #[inline]
    pub fn span(&self) -> Span {
        self.span
    }
}

/// Removes matching surrounding quotes.
pub(crate) fn strip_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &text[1..text.len() - 1];
        }
    }

    if let Some(first) = bytes.first() {
        if *first == b'"' || *first == b'\'' {
            // An unterminated value.
            return &text[1..];
        }
    }

    text
}

/// An SVG node.
#[derive(Clone, Copy)]
pub struct SvgNode<'a> {
    id: NodeId,
    doc: &'a Document,
    d: &'a NodeData,
}

impl Eq for SvgNode<'_> {}

impl PartialEq for SvgNode<'_> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.doc, other.doc)
    }
}

impl<'a> SvgNode<'a> {
    /// Returns node's ID.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns node's document.
    #[inline]
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    #[inline]
    fn element_data(&self) -> Option<&'a ElementData> {
        match self.d.kind {
            NodeKind::Element(ref data) => Some(data),
            _ => None,
        }
    }

    /// Checks if the current node is an element.
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.d.kind, NodeKind::Element(_))
    }

    /// Checks if the current node is a text.
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.d.kind, NodeKind::Text { .. })
    }

    /// Checks if the current node is a comment.
    #[inline]
    pub fn is_comment(&self) -> bool {
        matches!(self.d.kind, NodeKind::Comment(_))
    }

    /// Checks if the current node is a processing instruction.
    #[inline]
    pub fn is_processing_instruction(&self) -> bool {
        matches!(self.d.kind, NodeKind::ProcessingInstruction { .. })
    }

    /// Returns element's tag name.
    ///
    /// Only elements in the SVG namespace (or without a namespace) have one.
    #[inline]
    pub fn tag_name(&self) -> Option<EId> {
        self.element_data().and_then(|d| d.tag)
    }

    /// Checks that the element has a specified tag name.
    #[inline]
    pub fn has_tag_name(&self, eid: EId) -> bool {
        self.tag_name() == Some(eid)
    }

    /// Returns element's local name.
    ///
    /// Returns an empty string for non-element nodes.
    #[inline]
    pub fn local_name(&self) -> &'a str {
        match self.element_data() {
            Some(d) => self.doc.source.slice(d.name.local),
            None => "",
        }
    }

    /// Returns element's prefix.
    #[inline]
    pub fn prefix(&self) -> Option<&'a str> {
        let d = self.element_data()?;
        d.name.prefix.map(|span| self.doc.source.slice(span))
    }

    /// Returns element's namespace URI.
    #[inline]
    pub fn namespace(&self) -> Option<&'a str> {
        let d = self.element_data()?;
        d.name.ns.map(|ns| self.doc.namespace_uri(ns))
    }

    /// Returns element's normalized `id` attribute value.
    ///
    /// Returns an empty string otherwise.
    #[inline]
    pub fn element_id(&self) -> &'a str {
        match self.element_data() {
            Some(d) => &d.id,
            None => "",
        }
    }

    /// Returns element's `xml:space` mode.
    ///
    /// For non-element nodes returns the parent's mode.
    pub fn xml_space(&self) -> XmlSpace {
        match self.element_data() {
            Some(d) => d.xml_space,
            None => self
                .parent_element()
                .map(|n| n.xml_space())
                .unwrap_or_default(),
        }
    }

    /// Returns element's flags.
    #[inline]
    pub fn flags(&self) -> ElementFlags {
        self.element_data().map(|d| d.flags).unwrap_or_default()
    }

    /// Returns node's span in the source text.
    pub fn span(&self) -> Span {
        match self.d.kind {
            NodeKind::Root => Span::new(0, self.doc.source.len()),
            NodeKind::Element(ref d) => d.span,
            NodeKind::Text { span, .. } => span,
            NodeKind::Comment(span) => span,
            NodeKind::ProcessingInstruction { target, value } => {
                Span::new(target.start as usize, value.unwrap_or(target).end as usize)
            }
        }
    }

    /// Returns a list of all element's attributes.
    #[inline]
    pub fn attributes(&self) -> &'a [Attribute] {
        match self.element_data() {
            Some(d) => &self.doc.attrs[d.attributes.to_urange()],
            None => &[],
        }
    }

    /// Returns an attribute by ID.
    #[inline]
    pub fn attribute_node(&self, aid: AId) -> Option<&'a Attribute> {
        self.attributes().iter().find(|a| a.aid == Some(aid))
    }

    /// Checks if an attribute is present.
    #[inline]
    pub fn has_attribute(&self, aid: AId) -> bool {
        self.attribute_node(aid).is_some()
    }

    /// Returns an attribute value.
    #[inline]
    pub fn attribute_value(&self, aid: AId) -> Option<Cow<'a, str>> {
        self.attribute_node(aid).map(|a| a.value(self.doc))
    }

    /// Parses an attribute value.
    ///
    /// Logs a warning when the value cannot be parsed.
    pub fn attribute<T: FromValue>(&self, aid: AId) -> Option<T> {
        let value = self.attribute_value(aid)?;
        match T::parse(*self, aid, &value) {
            Some(v) => Some(v),
            None => {
                let pos = self.doc.source.text_pos(self.span().start as usize);
                log::warn!("Failed to parse {} value: '{}' at {}.", aid, value, pos);
                None
            }
        }
    }

    /// Returns node's text data.
    ///
    /// For text nodes returns its content. For elements returns the first child node text.
    pub fn text(&self) -> &'a str {
        match self.d.kind {
            NodeKind::Element(_) => match self.first_child() {
                Some(child) => match child.d.kind {
                    NodeKind::Text { ref text, .. } => text,
                    _ => "",
                },
                None => "",
            },
            NodeKind::Text { ref text, .. } => text,
            NodeKind::Comment(span) => self.doc.source.slice(span),
            NodeKind::ProcessingInstruction { value, .. } => {
                value.map(|span| self.doc.source.slice(span)).unwrap_or("")
            }
            NodeKind::Root => "",
        }
    }

    /// Returns a processing instruction's target.
    pub fn pi_target(&self) -> Option<&'a str> {
        match self.d.kind {
            NodeKind::ProcessingInstruction { target, .. } => Some(self.doc.source.slice(target)),
            _ => None,
        }
    }

    /// Returns a parent node.
    #[inline]
    pub fn parent(&self) -> Option<Self> {
        self.d.parent.map(|id| self.doc.get(id))
    }

    /// Returns the parent element.
    #[inline]
    pub fn parent_element(&self) -> Option<Self> {
        self.ancestors().skip(1).find(|n| n.is_element())
    }

    /// Returns the previous sibling.
    #[inline]
    pub fn prev_sibling(&self) -> Option<Self> {
        self.d.prev_sibling.map(|id| self.doc.get(id))
    }

    /// Returns the previous sibling element.
    pub fn prev_sibling_element(&self) -> Option<Self> {
        let mut node = self.prev_sibling();
        while let Some(n) = node {
            if n.is_element() {
                return Some(n);
            }
            node = n.prev_sibling();
        }
        None
    }

    /// Returns the next sibling.
    #[inline]
    pub fn next_sibling(&self) -> Option<Self> {
        self.d.next_sibling.map(|id| self.doc.get(id))
    }

    /// Returns the first child.
    #[inline]
    pub fn first_child(&self) -> Option<Self> {
        self.d.children.map(|(id, _)| self.doc.get(id))
    }

    /// Returns the first child element.
    #[inline]
    pub fn first_element_child(&self) -> Option<Self> {
        self.children().find(|n| n.is_element())
    }

    /// Returns the last child.
    #[inline]
    pub fn last_child(&self) -> Option<Self> {
        self.d.children.map(|(_, id)| self.doc.get(id))
    }

    /// Checks if the node has child nodes.
    #[inline]
    pub fn has_children(&self) -> bool {
        self.d.children.is_some()
    }

    /// Returns an iterator over ancestor nodes starting at this node.
    #[inline]
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors(Some(*self))
    }

    /// Returns an iterator over children nodes.
    #[inline]
    pub fn children(&self) -> Children<'a> {
        Children {
            front: self.first_child(),
            back: self.last_child(),
        }
    }

    /// Returns an iterator which traverses the subtree starting at this node.
    #[inline]
    pub fn traverse(&self) -> Traverse<'a> {
        Traverse {
            root: *self,
            edge: None,
        }
    }

    /// Returns an iterator over this node and its descendants.
    #[inline]
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants(self.traverse())
    }

    /// Checks that `self` is an ancestor of `other` or `other` itself.
    pub fn is_ancestor_of(&self, other: SvgNode) -> bool {
        other.ancestors().any(|n| n.id == self.id)
    }
}

impl std::fmt::Debug for SvgNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self.d.kind {
            NodeKind::Root => write!(f, "Root"),
            NodeKind::Element(_) => {
                write!(f, "Element {{ name: {:?} }}", self.local_name())
            }
            NodeKind::Text { ref text, .. } => write!(f, "Text({:?})", text),
            NodeKind::Comment(span) => write!(f, "Comment({:?})", self.doc.source.slice(span)),
            NodeKind::ProcessingInstruction { .. } => write!(
                f,
                "ProcessingInstruction({:?}, {:?})",
                self.pi_target().unwrap_or(""),
                self.text()
            ),
        }
    }
}

/// An iterator over ancestor nodes.
#[derive(Clone, Debug)]
pub struct Ancestors<'a>(Option<SvgNode<'a>>);

impl<'a> Iterator for Ancestors<'a> {
    type Item = SvgNode<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.0.take();
        self.0 = node.as_ref().and_then(SvgNode::parent);
        node
    }
}

/// An iterator over children nodes.
#[derive(Clone, Debug)]
pub struct Children<'a> {
    front: Option<SvgNode<'a>>,
    back: Option<SvgNode<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = SvgNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            let node = self.front.take();
            self.back = None;
            node
        } else {
            let node = self.front.take();
            self.front = node.as_ref().and_then(SvgNode::next_sibling);
            node
        }
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.back == self.front {
            let node = self.back.take();
            self.front = None;
            node
        } else {
            let node = self.back.take();
            self.back = node.as_ref().and_then(SvgNode::prev_sibling);
            node
        }
    }
}

/// A subtree traversal edge.
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub enum Edge<'a> {
    Open(SvgNode<'a>),
    Close(SvgNode<'a>),
}

/// A subtree traversal.
#[derive(Clone, Debug)]
pub struct Traverse<'a> {
    root: SvgNode<'a>,
    edge: Option<Edge<'a>>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = Edge<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.edge {
            Some(Edge::Open(node)) => {
                self.edge = Some(match node.first_child() {
                    Some(first_child) => Edge::Open(first_child),
                    None => Edge::Close(node),
                });
            }
            Some(Edge::Close(node)) => {
                if node == self.root {
                    self.edge = None;
                } else if let Some(next_sibling) = node.next_sibling() {
                    self.edge = Some(Edge::Open(next_sibling));
                } else {
                    self.edge = node.parent().map(Edge::Close);
                }
            }
            None => {
                self.edge = Some(Edge::Open(self.root));
            }
        }

        self.edge
    }
}

/// A descendants iterator.
#[derive(Clone, Debug)]
pub struct Descendants<'a>(Traverse<'a>);

impl<'a> Iterator for Descendants<'a> {
    type Item = SvgNode<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for edge in &mut self.0 {
            if let Edge::Open(node) = edge {
                return Some(node);
            }
        }

        None
    }
}

/// A trait for parsing attribute values.
pub trait FromValue: Sized {
    /// Parses an attribute value.
    ///
    /// When `None` is returned, the attribute value will be logged as a parsing failure.
    fn parse(node: SvgNode, aid: AId, value: &str) -> Option<Self>;
}

impl FromValue for String {
    fn parse(_: SvgNode, _: AId, value: &str) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FromValue for f32 {
    fn parse(_: SvgNode, _: AId, value: &str) -> Option<Self> {
        svgtypes::Number::from_str(value).ok().map(|v| v.0 as f32)
    }
}

impl FromValue for svgtypes::Length {
    fn parse(_: SvgNode, _: AId, value: &str) -> Option<Self> {
        svgtypes::Length::from_str(value).ok()
    }
}

impl FromValue for svgtypes::AspectRatio {
    fn parse(_: SvgNode, _: AId, value: &str) -> Option<Self> {
        svgtypes::AspectRatio::from_str(value).ok()
    }
}

impl FromValue for svgtypes::Color {
    fn parse(_: SvgNode, _: AId, value: &str) -> Option<Self> {
        svgtypes::Color::from_str(value).ok()
    }
}

impl FromValue for svgtypes::ViewBox {
    fn parse(_: SvgNode, _: AId, value: &str) -> Option<Self> {
        svgtypes::ViewBox::from_str(value).ok()
    }
}

impl FromValue for svgtypes::Transform {
    fn parse(_: SvgNode, _: AId, value: &str) -> Option<Self> {
        svgtypes::Transform::from_str(value).ok()
    }
}

impl FromValue for Vec<f32> {
    fn parse(_: SvgNode, _: AId, value: &str) -> Option<Self> {
        let mut list = Vec::new();
        for n in svgtypes::NumberListParser::from(value) {
            list.push(n.ok()? as f32);
        }

        Some(list)
    }
}

impl FromValue for Vec<svgtypes::Length> {
    fn parse(_: SvgNode, _: AId, value: &str) -> Option<Self> {
        let mut list = Vec::new();
        for n in svgtypes::LengthListParser::from(value) {
            list.push(n.ok()?);
        }

        Some(list)
    }
}
