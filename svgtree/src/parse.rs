// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use crate::stream::{ByteExt, Stream};
use crate::text::{self, Reference};
use crate::{
    AId, Attribute, DiagnosticCode, Diagnostics, Document, EId, ElementData, ElementFlags, NodeData,
    NodeId, NodeKind, NsId, QName, ShortRange, SourceBuffer, Span, XmlSpace, SVG_NS, XLINK_NS,
    XML_NS,
};

/// We do not allow documents with more than 1_000_000 elements for security reasons.
const ELEMENTS_LIMIT: usize = 1_000_000;

/// A text edit.
#[derive(Clone, PartialEq, Debug)]
pub struct TextEdit {
    /// A byte range in the old text.
    pub span: Span,
    /// A replacement text.
    pub text: String,
}

impl TextEdit {
    /// Creates a new edit.
    pub fn new(span: Span, text: impl Into<String>) -> Self {
        TextEdit {
            span,
            text: text.into(),
        }
    }
}

impl Document {
    /// Parses a [`Document`] from a string.
    ///
    /// Never fails. Malformed markup produces diagnostics and a best-effort tree.
    pub fn parse_str(text: &str) -> Document {
        let source = SourceBuffer::new(text);
        let text = source.clone();
        let mut builder = Builder::new(source, text.as_str());
        builder.parse_document();
        builder.finish()
    }

    /// Builds a new document for this document's text with `edits` applied.
    ///
    /// Edit spans are relative to the current text and can be passed in any order.
    /// The result is identical to `Document::parse_str` on the edited text.
    ///
    /// # Panics
    ///
    /// When edits overlap or are not on char boundaries.
    pub fn reparse(&self, edits: &[TextEdit]) -> Document {
        let mut sorted: Vec<&TextEdit> = edits.iter().collect();
        sorted.sort_by_key(|e| std::cmp::Reverse(e.span.start));

        let mut text = self.source.as_str().to_string();
        let mut limit = text.len();
        for edit in sorted {
            assert!(
                edit.span.end as usize <= limit,
                "text edits must not overlap"
            );
            text.replace_range(edit.span.to_range(), &edit.text);
            limit = edit.span.start as usize;
        }

        Document::parse_str(&text)
    }

    fn append(&mut self, parent_id: NodeId, kind: NodeKind) -> NodeId {
        let new_child_id = NodeId::from(self.nodes.len());
        let last_child_id = self.nodes[parent_id.get_usize()].children.map(|(_, id)| id);

        self.nodes.push(NodeData {
            parent: Some(parent_id),
            prev_sibling: last_child_id,
            next_sibling: None,
            children: None,
            kind,
        });

        if let Some(id) = last_child_id {
            self.nodes[id.get_usize()].next_sibling = Some(new_child_id);
        }

        self.nodes[parent_id.get_usize()].children = Some(
            if let Some((first_child_id, _)) = self.nodes[parent_id.get_usize()].children {
                (first_child_id, new_child_id)
            } else {
                (new_child_id, new_child_id)
            },
        );

        new_child_id
    }

    fn intern_namespace(&mut self, uri: &str) -> Option<NsId> {
        if let Some(idx) = self.namespaces.iter().position(|ns| ns == uri) {
            return Some(NsId(idx as u16));
        }

        let idx = u16::try_from(self.namespaces.len()).ok()?;
        self.namespaces.push(uri.to_string());
        Some(NsId(idx))
    }
}

struct RawAttribute {
    prefix: Option<Span>,
    local: Span,
    value: Span,
    span: Span,
}

struct OpenElement<'s> {
    node: NodeId,
    qname: &'s str,
    bindings_len: usize,
}

struct Builder<'s> {
    text: &'s str,
    s: Stream<'s>,
    doc: Document,
    diagnostics: Diagnostics,
    // (prefix, namespace), where an empty prefix is the default namespace.
    bindings: Vec<(&'s str, Option<NsId>)>,
    open: Vec<OpenElement<'s>>,
    elements_count: usize,
    root_closed: bool,
}

impl<'s> Builder<'s> {
    fn new(source: SourceBuffer, text: &'s str) -> Self {
        let mut doc = Document {
            source,
            nodes: Vec::new(),
            attrs: Vec::new(),
            namespaces: Vec::new(),
            entities: HashMap::new(),
            diagnostics: Vec::new(),
        };

        // Add a root node.
        doc.nodes.push(NodeData {
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            children: None,
            kind: NodeKind::Root,
        });

        let xml_ns = doc.intern_namespace(XML_NS);

        Builder {
            text,
            s: Stream::from(text),
            doc,
            diagnostics: Diagnostics::new(),
            bindings: vec![("xml", xml_ns)],
            open: Vec::new(),
            elements_count: 0,
            root_closed: false,
        }
    }

    fn parent(&self) -> NodeId {
        match self.open.last() {
            Some(e) => e.node,
            None => NodeId::new(0),
        }
    }

    fn report(&mut self, code: DiagnosticCode, message: String, start: usize, end: usize) {
        self.diagnostics
            .report(code, message, Some(Span::new(start, end)));
    }

    fn syntax_error(&mut self, message: impl Into<String>, start: usize, end: usize) {
        self.report(DiagnosticCode::XmlSyntax, message.into(), start, end);
    }

    fn parse_document(&mut self) {
        while !self.s.at_end() {
            if self.s.starts_with(b"<?") {
                self.parse_pi();
            } else if self.s.starts_with(b"<!--") {
                self.parse_comment();
            } else if self.s.starts_with(b"<![CDATA[") {
                self.parse_cdata();
            } else if self.s.starts_with(b"<!DOCTYPE") {
                self.parse_doctype();
            } else if self.s.starts_with(b"</") {
                self.parse_end_tag();
            } else if self.s.curr_byte() == Some(b'<')
                && self.s.next_byte().map_or(false, |c| c.is_name_start())
            {
                self.parse_start_tag();
            } else {
                self.parse_text();
            }
        }

        while let Some(e) = self.open.last() {
            let name = e.qname;
            let pos = self.s.pos();
            self.syntax_error(format!("element '{}' is not closed", name), pos, pos);
            self.close_element(pos);
        }
    }

    fn finish(mut self) -> Document {
        if self.doc.root_element().is_none() {
            self.syntax_error("the document has no root element", 0, 0);
        }

        self.doc.diagnostics = self.diagnostics.into_vec();
        self.doc
    }

    fn parse_pi(&mut self) {
        let text = self.text;
        let start = self.s.pos();
        self.s.advance(2);
        let target = self.s.consume_name();
        let (content, found) = self.s.consume_until(b"?>");
        if !found {
            self.syntax_error("unterminated processing instruction", start, self.s.pos());
        }

        let target_text = &text[target.to_range()];
        if target.is_empty() {
            self.syntax_error("processing instruction without a target", start, self.s.pos());
            return;
        }

        if target_text.eq_ignore_ascii_case("xml") {
            if start != 0 {
                self.syntax_error(
                    "XML declaration is allowed only at the start of the document",
                    start,
                    self.s.pos(),
                );
            }
            return;
        }

        let value = trim_span(self.text, content);
        let value = if value.is_empty() { None } else { Some(value) };
        let parent = self.parent();
        self.doc
            .append(parent, NodeKind::ProcessingInstruction { target, value });
    }

    fn parse_comment(&mut self) {
        let start = self.s.pos();
        self.s.advance(4);
        let (content, found) = self.s.consume_until(b"-->");
        if !found {
            self.syntax_error("unterminated comment", start, self.s.pos());
        }

        let parent = self.parent();
        self.doc.append(parent, NodeKind::Comment(content));
    }

    fn parse_cdata(&mut self) {
        let text = self.text;
        let start = self.s.pos();
        self.s.advance(9);
        let (content, found) = self.s.consume_until(b"]]>");
        if !found {
            self.syntax_error("unterminated CDATA section", start, self.s.pos());
        }

        let text = &text[content.to_range()];
        if self.open.is_empty() {
            if !text.trim().is_empty() {
                self.syntax_error("text outside of the root element", start, self.s.pos());
            }
            return;
        }

        self.append_text(text.to_string(), content);
    }

    fn parse_text(&mut self) {
        let source = self.text;
        let start = self.s.pos();
        if self.s.curr_byte() == Some(b'<') {
            self.syntax_error("unexpected '<'", start, start + 1);
            self.s.advance(1);
        }

        let span = self.s.consume_while(|c| c != b'<');
        let span = Span::new(start, span.end as usize);
        let raw = &source[span.to_range()];

        if self.open.is_empty() {
            if !raw.trim().is_empty() {
                self.syntax_error("text outside of the root element", start, self.s.pos());
            }
            return;
        }

        self.check_references(raw, start);
        let decoded = text::decode(raw, &self.doc.entities, false).into_owned();
        self.append_text(decoded, span);
    }

    fn append_text(&mut self, text: String, span: Span) {
        let parent = self.parent();
        if let Some((_, last)) = self.doc.nodes[parent.get_usize()].children {
            if let NodeKind::Text {
                text: ref mut prev,
                span: ref mut prev_span,
            } = self.doc.nodes[last.get_usize()].kind
            {
                prev.push_str(&text);
                prev_span.end = span.end;
                return;
            }
        }

        self.doc.append(parent, NodeKind::Text { text, span });
    }

    fn check_references(&mut self, raw: &str, offset: usize) {
        let mut pos = 0;
        while let Some(idx) = raw[pos..].find('&') {
            let start = pos + idx;
            match text::parse_reference(&raw[start..]) {
                Some((Reference::Entity(name), len)) => {
                    if !self.doc.entities.contains_key(name) {
                        self.syntax_error(
                            format!("unknown entity '{}'", name),
                            offset + start,
                            offset + start + len,
                        );
                    }
                    pos = start + len;
                }
                Some((Reference::Char(_), len)) => pos = start + len,
                None => {
                    self.syntax_error("unescaped '&'", offset + start, offset + start + 1);
                    pos = start + 1;
                }
            }
        }
    }

    fn parse_doctype(&mut self) {
        let start = self.s.pos();
        if self.doc.root_element().is_some() {
            self.syntax_error("DOCTYPE after the root element", start, start + 9);
        }

        self.s.advance(9);
        let _ = self.s.consume_while(|c| c != b'[' && c != b'>');
        if self.s.curr_byte() == Some(b'[') {
            self.s.advance(1);
            self.parse_internal_subset();
        }

        let (_, found) = self.s.consume_until(b">");
        if !found {
            self.syntax_error("unterminated DOCTYPE", start, self.s.pos());
        }
    }

    fn parse_internal_subset(&mut self) {
        loop {
            self.s.skip_spaces();
            if self.s.at_end() {
                return;
            }

            if self.s.consume(b"]") {
                return;
            } else if self.s.starts_with(b"<!ENTITY") {
                self.parse_entity_decl();
            } else if self.s.starts_with(b"<!--") {
                let _ = self.s.consume_until(b"-->");
            } else if self.s.starts_with(b"<") {
                let _ = self.s.consume_until(b">");
            } else {
                // Parameter entity references and other garbage.
                self.s.advance_char();
            }
        }
    }

    fn parse_entity_decl(&mut self) {
        let text = self.text;
        let start = self.s.pos();
        self.s.advance(8);
        self.s.skip_spaces();

        if self.s.consume(b"%") {
            // Parameter entities are not supported.
            let _ = self.s.consume_until(b">");
            return;
        }

        let name = self.s.consume_name();
        self.s.skip_spaces();

        match self.s.curr_byte() {
            Some(q) if q.is_quote() => {
                self.s.advance(1);
                let (value, found) = self.s.consume_until(&[q]);
                if !found {
                    self.syntax_error("unterminated entity value", start, self.s.pos());
                    return;
                }

                let name = &text[name.to_range()];
                if !name.is_empty() {
                    // The first declaration is binding.
                    self.doc
                        .entities
                        .entry(name.to_string())
                        .or_insert_with(|| text[value.to_range()].to_string());
                }
            }
            _ => {
                self.diagnostics.report(
                    DiagnosticCode::Unsupported,
                    "external entities are not supported",
                    Some(Span::new(start, self.s.pos())),
                );
            }
        }

        let _ = self.s.consume_until(b">");
    }

    fn parse_start_tag(&mut self) {
        let start = self.s.pos();
        self.s.advance(1);
        let name = self.s.consume_name();

        let mut attrs: Vec<RawAttribute> = Vec::new();
        let mut self_closing = false;
        loop {
            self.s.skip_spaces();
            match self.s.curr_byte() {
                None => {
                    self.syntax_error("unexpected end of the start tag", start, self.s.pos());
                    break;
                }
                Some(b'>') => {
                    self.s.advance(1);
                    break;
                }
                Some(b'/') if self.s.next_byte() == Some(b'>') => {
                    self.s.advance(2);
                    self_closing = true;
                    break;
                }
                Some(b'<') => {
                    self.syntax_error("unclosed start tag", start, self.s.pos());
                    break;
                }
                Some(c) if c.is_name_start() => {
                    if let Some(attr) = self.parse_attribute() {
                        attrs.push(attr);
                    }
                }
                Some(_) => {
                    let pos = self.s.pos();
                    self.syntax_error("unexpected character in the start tag", pos, pos + 1);
                    self.s.advance_char();
                }
            }
        }

        self.open_element(start, name, attrs, self_closing);
    }

    fn parse_attribute(&mut self) -> Option<RawAttribute> {
        let text = self.text;
        let start = self.s.pos();
        let name = self.s.consume_name();
        self.s.skip_spaces();

        if !self.s.consume(b"=") {
            let name = &text[name.to_range()];
            self.syntax_error(
                format!("attribute '{}' has no value", name),
                start,
                self.s.pos(),
            );
            return None;
        }

        self.s.skip_spaces();
        let value_start = self.s.pos();
        match self.s.curr_byte() {
            Some(q) if q.is_quote() => {
                self.s.advance(1);
                let (_, found) = self.s.consume_until(&[q]);
                if !found {
                    self.syntax_error("unterminated attribute value", value_start, self.s.pos());
                }
            }
            Some(_) => {
                while let Some(c) = self.s.curr_byte() {
                    if c.is_xml_space() || c == b'>' || self.s.starts_with(b"/>") {
                        break;
                    }
                    self.s.advance(1);
                }
                self.syntax_error(
                    "attribute value must be quoted",
                    value_start,
                    self.s.pos(),
                );
            }
            None => {}
        }

        let value = Span::new(value_start, self.s.pos());
        let (prefix, local) = split_qname(self.text, name);
        Some(RawAttribute {
            prefix,
            local,
            value,
            span: Span::new(start, self.s.pos()),
        })
    }

    fn open_element(
        &mut self,
        start: usize,
        name: Span,
        raw_attrs: Vec<RawAttribute>,
        self_closing: bool,
    ) {
        let text = self.text;
        let end = self.s.pos();

        if self.elements_count >= ELEMENTS_LIMIT {
            self.report(
                DiagnosticCode::ElementLimit,
                format!(
                    "the maximum number of elements ({}) has been reached",
                    ELEMENTS_LIMIT
                ),
                start,
                end,
            );
            self.s.jump_to_end();
            return;
        }
        self.elements_count += 1;

        if self.root_closed && self.open.is_empty() {
            self.syntax_error("the document has more than one root element", start, end);
        }

        // Namespace declarations must be processed first,
        // since they affect the element itself and all its attributes.
        let bindings_len = self.bindings.len();
        for attr in &raw_attrs {
            let prefix = attr.prefix.map(|s| &text[s.to_range()]);
            let local = &text[attr.local.to_range()];
            let binding = match (prefix, local) {
                (None, "xmlns") => "",
                (Some("xmlns"), prefix) => prefix,
                _ => continue,
            };

            let uri = crate::strip_quotes(&text[attr.value.to_range()]);
            let uri = text::decode(uri, &self.doc.entities, true);
            if uri.is_empty() {
                if binding.is_empty() {
                    self.bindings.push(("", None));
                } else {
                    self.syntax_error(
                        format!("namespace prefix '{}' cannot be bound to an empty URI", binding),
                        attr.span.start as usize,
                        attr.span.end as usize,
                    );
                }
                continue;
            }

            let ns = self.doc.intern_namespace(&uri);
            self.bindings.push((binding, ns));
        }

        let (prefix, local) = split_qname(text, name);
        let ns = match prefix {
            Some(prefix) => self.resolve_prefix(prefix, true),
            None => self.default_namespace(),
        };

        let is_svg = match ns {
            Some(ns) => self.doc.namespace_uri(ns) == SVG_NS,
            None => true,
        };
        let local_name = &text[local.to_range()];
        let tag = if is_svg {
            EId::from_str(local_name)
        } else {
            None
        };

        let attrs_start = self.doc.attrs.len() as u32;
        for (idx, attr) in raw_attrs.iter().enumerate() {
            let prefix_text = attr.prefix.map(|s| &text[s.to_range()]);
            let attr_local = &text[attr.local.to_range()];
            if matches!((prefix_text, attr_local), (None, "xmlns") | (Some("xmlns"), _)) {
                continue;
            }

            let qname = &text[attr.span.start as usize..attr.local.end as usize];
            let is_duplicate = raw_attrs[..idx].iter().any(|prev| {
                &text[prev.span.start as usize..prev.local.end as usize] == qname
            });
            if is_duplicate {
                self.syntax_error(
                    format!("duplicated attribute '{}'", qname),
                    attr.span.start as usize,
                    attr.span.end as usize,
                );
                continue;
            }

            let attr_ns = match attr.prefix {
                Some(prefix) => self.resolve_prefix(prefix, false),
                None => None,
            };

            let aid = match attr_ns.map(|ns| self.doc.namespace_uri(ns)) {
                None => AId::from_str(attr_local).filter(|aid| *aid != AId::XmlSpace),
                Some(XLINK_NS) if attr_local == "href" => Some(AId::Href),
                Some(XML_NS) if attr_local == "space" => Some(AId::XmlSpace),
                Some(XML_NS) if attr_local == "lang" => Some(AId::Lang),
                Some(SVG_NS) => AId::from_str(attr_local),
                Some(_) => None,
            };

            if let Some(tag) = tag {
                let is_foreign = match attr_ns.map(|ns| self.doc.namespace_uri(ns)) {
                    None | Some(SVG_NS) | Some(XLINK_NS) | Some(XML_NS) => false,
                    Some(_) => true,
                };
                let is_custom_data =
                    attr_local.starts_with("data-") || attr_local.starts_with("aria-");

                if !is_foreign && !is_custom_data && !aid.map_or(false, |aid| tag.allows(aid)) {
                    self.report(
                        DiagnosticCode::AttributeNotAllowed,
                        format!("attribute '{}' is not allowed on '{}'", qname, tag),
                        attr.span.start as usize,
                        attr.span.end as usize,
                    );
                }
            }

            let raw_value = crate::strip_quotes(&text[attr.value.to_range()]);
            if raw_value.contains('<') {
                self.syntax_error(
                    "'<' is not allowed in attribute values",
                    attr.value.start as usize,
                    attr.value.end as usize,
                );
            }
            self.check_references(raw_value, attr.value.start as usize + 1);

            self.doc.attrs.push(Attribute {
                name: QName {
                    ns: attr_ns,
                    prefix: attr.prefix,
                    local: attr.local,
                },
                aid,
                value: attr.value,
                span: attr.span,
            });
        }
        let attrs_end = self.doc.attrs.len() as u32;
        let attributes = ShortRange::new(attrs_start, attrs_end);
        let attrs = &self.doc.attrs[attributes.to_urange()];

        let parent_space = match self.open.last() {
            Some(e) => match self.doc.nodes[e.node.get_usize()].kind {
                NodeKind::Element(ref d) => d.xml_space,
                _ => XmlSpace::Default,
            },
            None => XmlSpace::Default,
        };

        let mut xml_space = parent_space;
        let mut space_error = None;
        if let Some(attr) = attrs.iter().find(|a| a.aid == Some(AId::XmlSpace)) {
            match attr.value(&self.doc).as_ref() {
                "preserve" => xml_space = XmlSpace::Preserve,
                "default" => xml_space = XmlSpace::Default,
                _ => space_error = Some(attr.value),
            }
        }

        let id = attrs
            .iter()
            .find(|a| a.aid == Some(AId::Id))
            .map(|a| normalize_id(&a.value(&self.doc)).to_string())
            .unwrap_or_default();

        let flags = ElementFlags {
            self_closing,
            has_id: !id.is_empty(),
            has_style: attrs.iter().any(|a| a.aid == Some(AId::Style)),
        };

        if let Some(span) = space_error {
            self.report(
                DiagnosticCode::InvalidValue,
                "'xml:space' must be 'default' or 'preserve'".to_string(),
                span.start as usize,
                span.end as usize,
            );
        }

        let parent = self.parent();
        let node = self.doc.append(
            parent,
            NodeKind::Element(ElementData {
                name: QName { ns, prefix, local },
                tag,
                attributes,
                xml_space,
                flags,
                id: id.into_boxed_str(),
                span: Span::new(start, end),
            }),
        );

        if self_closing {
            self.bindings.truncate(bindings_len);
            if self.open.is_empty() {
                self.root_closed = true;
            }
        } else {
            self.open.push(OpenElement {
                node,
                qname: &text[name.to_range()],
                bindings_len,
            });
        }
    }

    fn parse_end_tag(&mut self) {
        let text = self.text;
        let start = self.s.pos();
        self.s.advance(2);
        let name = self.s.consume_name();
        self.s.skip_spaces();
        if !self.s.consume(b">") {
            self.syntax_error("expected '>'", start, self.s.pos());
            let _ = self.s.consume_while(|c| c != b'>' && c != b'<');
            self.s.consume(b">");
        }

        let end = self.s.pos();
        let qname = &text[name.to_range()];
        match self.open.iter().rposition(|e| e.qname == qname) {
            Some(idx) => {
                while self.open.len() > idx + 1 {
                    let unclosed = self.open.last().map(|e| e.qname).unwrap_or("");
                    self.syntax_error(
                        format!("element '{}' is not closed", unclosed),
                        start,
                        end,
                    );
                    self.close_element(start);
                }
                self.close_element(end);
            }
            None => {
                self.syntax_error(format!("unexpected closing tag '{}'", qname), start, end);
            }
        }
    }

    fn close_element(&mut self, end: usize) {
        if let Some(e) = self.open.pop() {
            self.bindings.truncate(e.bindings_len);
            if let NodeKind::Element(ref mut d) = self.doc.nodes[e.node.get_usize()].kind {
                d.span.end = end as u32;
            }

            if self.open.is_empty() {
                self.root_closed = true;
            }
        }
    }

    fn lookup_prefix(&self, prefix: &str) -> Option<Option<NsId>> {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| *p == prefix)
            .map(|(_, ns)| *ns)
    }

    fn default_namespace(&self) -> Option<NsId> {
        self.lookup_prefix("").flatten()
    }

    fn resolve_prefix(&mut self, prefix: Span, is_element: bool) -> Option<NsId> {
        let all = self.text;
        let text = &all[prefix.to_range()];
        if let Some(Some(ns)) = self.lookup_prefix(text) {
            return Some(ns);
        }

        self.report(
            DiagnosticCode::UnresolvedPrefix,
            format!("namespace prefix '{}' is not declared", text),
            prefix.start as usize,
            prefix.end as usize,
        );

        if is_element {
            self.default_namespace()
        } else {
            None
        }
    }
}

fn split_qname(text: &str, name: Span) -> (Option<Span>, Span) {
    let name_text = &text[name.to_range()];
    match name_text.find(':') {
        Some(idx) if idx > 0 && idx + 1 < name_text.len() => {
            let start = name.start as usize;
            (
                Some(Span::new(start, start + idx)),
                Span::new(start + idx + 1, name.end as usize),
            )
        }
        _ => (None, name),
    }
}

fn trim_span(text: &str, span: Span) -> Span {
    let s = &text[span.to_range()];
    let leading = s.len() - s.trim_start().len();
    let trimmed = s.trim();
    let start = span.start as usize + leading;
    Span::new(start, start + trimmed.len())
}

/// Trims spaces and surrounding quotes.
pub(crate) fn normalize_id(id: &str) -> &str {
    let id = id.trim();
    crate::strip_quotes(id).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiagnosticCode, Severity};

    fn codes(doc: &Document) -> Vec<&'static str> {
        doc.diagnostics().iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn simple_tree() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'><g id='g1'><rect width='10'/></g></svg>",
        );
        assert!(doc.diagnostics().is_empty());

        let svg = doc.root_element().unwrap();
        assert_eq!(svg.tag_name(), Some(EId::Svg));
        assert_eq!(svg.namespace(), Some(SVG_NS));

        let g = svg.first_element_child().unwrap();
        assert_eq!(g.element_id(), "g1");
        assert!(g.flags().has_id);

        let rect = g.first_element_child().unwrap();
        assert!(rect.flags().self_closing);
        assert_eq!(rect.attribute_value(AId::Width).unwrap(), "10");
    }

    #[test]
    fn unresolved_prefix_falls_back_to_default_namespace() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'><foo:rect width='1'/></svg>",
        );
        assert_eq!(codes(&doc), vec!["unresolved-prefix"]);
        assert_eq!(doc.diagnostics()[0].severity, Severity::Error);

        let rect = doc.root_element().unwrap().first_element_child().unwrap();
        assert_eq!(rect.namespace(), Some(SVG_NS));
        assert_eq!(rect.tag_name(), Some(EId::Rect));
    }

    #[test]
    fn namespace_scopes_are_popped() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>\
                <g xmlns:a='urn:a'><a:item/></g>\
                <a:item/>\
            </svg>",
        );
        assert_eq!(codes(&doc), vec!["unresolved-prefix"]);

        let svg = doc.root_element().unwrap();
        let items: Vec<_> = svg
            .descendants()
            .filter(|n| n.local_name() == "item")
            .collect();
        assert_eq!(items[0].namespace(), Some("urn:a"));
        assert_eq!(items[1].namespace(), Some(SVG_NS));
    }

    #[test]
    fn xlink_href() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>\
                <use xlink:href='#r'/>\
            </svg>",
        );
        assert!(doc.diagnostics().is_empty());
        let node = doc.root_element().unwrap().first_element_child().unwrap();
        assert_eq!(node.attribute_value(AId::Href).unwrap(), "#r");
        assert_eq!(node.attribute_node(AId::Href).unwrap().prefix(&doc), Some("xlink"));
    }

    #[test]
    fn xml_space_inheritance() {
        let doc = Document::parse_str(
            "<svg><g xml:space='preserve'><text>a</text><text xml:space='default'/></g></svg>",
        );
        let g = doc.root_element().unwrap().first_element_child().unwrap();
        let mut texts = g.children();
        assert_eq!(doc.root_element().unwrap().xml_space(), XmlSpace::Default);
        assert_eq!(texts.next().unwrap().xml_space(), XmlSpace::Preserve);
        assert_eq!(texts.next().unwrap().xml_space(), XmlSpace::Default);
    }

    #[test]
    fn unknown_attribute_is_a_warning() {
        let doc = Document::parse_str("<svg><circle width='5' data-x='1' r='2'/></svg>");
        assert_eq!(codes(&doc), vec!["attribute-not-allowed"]);
        assert_eq!(doc.diagnostics()[0].severity, Severity::Warning);

        // Still in the tree.
        let circle = doc.root_element().unwrap().first_element_child().unwrap();
        assert_eq!(circle.attributes().len(), 3);
    }

    #[test]
    fn unclosed_elements() {
        let doc = Document::parse_str("<svg><g><rect/></svg>");
        assert_eq!(codes(&doc), vec!["xml-syntax"]);
        let svg = doc.root_element().unwrap();
        let g = svg.first_element_child().unwrap();
        assert_eq!(g.children().count(), 1);
    }

    #[test]
    fn unexpected_end_tag_is_ignored() {
        let doc = Document::parse_str("<svg></g><rect/></svg>");
        assert_eq!(codes(&doc), vec!["xml-syntax"]);
        assert_eq!(doc.root_element().unwrap().children().count(), 1);
    }

    #[test]
    fn garbage_in_tag() {
        let doc = Document::parse_str("<svg><rect x=5 $ y='2'/></svg>");
        assert_eq!(doc.diagnostics().len(), 2);
        let rect = doc.root_element().unwrap().first_element_child().unwrap();
        assert_eq!(rect.attribute_value(AId::X).unwrap(), "5");
        assert_eq!(rect.attribute_value(AId::Y).unwrap(), "2");
    }

    #[test]
    fn duplicated_attribute_keeps_first() {
        let doc = Document::parse_str("<svg><rect x='1' x='2'/></svg>");
        assert_eq!(codes(&doc), vec!["xml-syntax"]);
        let rect = doc.root_element().unwrap().first_element_child().unwrap();
        assert_eq!(rect.attribute_value(AId::X).unwrap(), "1");
    }

    #[test]
    fn empty_text() {
        let doc = Document::parse_str("");
        assert_eq!(codes(&doc), vec!["xml-syntax"]);
        assert!(doc.root_element().is_none());
    }

    #[test]
    fn prolog_and_epilog() {
        let doc = Document::parse_str(
            "<?xml version='1.0'?>\n<!-- a -->\n<?xml-stylesheet href='s.css'?><svg/><!-- b -->",
        );
        assert!(doc.diagnostics().is_empty());
        let prolog: Vec<_> = doc.prolog().collect();
        assert_eq!(prolog.len(), 2);
        assert!(prolog[0].is_comment());
        assert_eq!(prolog[1].pi_target(), Some("xml-stylesheet"));
        assert_eq!(prolog[1].text(), "href='s.css'");
        assert_eq!(doc.epilog().count(), 1);
    }

    #[test]
    fn entities() {
        let doc = Document::parse_str(
            "<!DOCTYPE svg [<!ENTITY color 'red'>]>\
             <svg><rect fill='&color;'/><text>&lt;&color;&#33;</text></svg>",
        );
        assert!(doc.diagnostics().is_empty());
        let svg = doc.root_element().unwrap();
        let rect = svg.first_element_child().unwrap();
        assert_eq!(rect.attribute_value(AId::Fill).unwrap(), "red");
        assert_eq!(rect.attribute_node(AId::Fill).unwrap().raw(&doc), "'&color;'");
        let text = rect.next_sibling().unwrap();
        assert_eq!(text.text(), "<red!");
    }

    #[test]
    fn unknown_entity() {
        let doc = Document::parse_str("<svg><text>&nbsp;</text></svg>");
        assert_eq!(codes(&doc), vec!["xml-syntax"]);
        let text = doc.root_element().unwrap().first_element_child().unwrap();
        assert_eq!(text.text(), "&nbsp;");
    }

    #[test]
    fn cdata_is_merged_with_text() {
        let doc = Document::parse_str("<svg><style>a<![CDATA[{b}]]>c</style></svg>");
        let style = doc.root_element().unwrap().first_element_child().unwrap();
        assert_eq!(style.children().count(), 1);
        assert_eq!(style.text(), "a{b}c");
    }

    #[test]
    fn stray_less_than() {
        let doc = Document::parse_str("<svg><text>1 < 2</text></svg>");
        assert_eq!(codes(&doc), vec!["xml-syntax"]);
        let text = doc.root_element().unwrap().first_element_child().unwrap();
        assert_eq!(text.text(), "1 < 2");
    }

    #[test]
    fn normalized_id() {
        let doc = Document::parse_str("<svg><g id=' \"a\" '/></svg>");
        let g = doc.root_element().unwrap().first_element_child().unwrap();
        assert_eq!(g.element_id(), "a");
    }

    #[test]
    fn reparse_is_identical_to_full_parse() {
        let doc = Document::parse_str("<svg><rect width='10'/><circle r='5'/></svg>");
        let edited = doc.reparse(&[
            TextEdit::new(Span::new(23, 23), "<g/>"),
            TextEdit::new(Span::new(18, 20), "20"),
        ]);
        let fresh = Document::parse_str("<svg><rect width='20'/><g/><circle r='5'/></svg>");
        assert_eq!(edited.source().as_str(), fresh.source().as_str());
        assert_eq!(format!("{:?}", edited), format!("{:?}", fresh));
    }

    #[test]
    fn element_spans() {
        let text = "<svg><g>\n</g></svg>";
        let doc = Document::parse_str(text);
        let g = doc.root_element().unwrap().first_element_child().unwrap();
        assert_eq!(doc.source().slice(g.span()), "<g>\n</g>");
    }

    #[test]
    fn diagnostic_positions() {
        let doc = Document::parse_str("<svg>\n  <rect foo='1'/>\n</svg>");
        let diag = &doc.diagnostics()[0];
        assert_eq!(diag.code, DiagnosticCode::AttributeNotAllowed);
        let pos = doc.source().text_pos(diag.span.unwrap().start as usize);
        assert_eq!((pos.row, pos.col), (2, 9));
    }
}
