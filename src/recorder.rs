// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use svgtree::{AId, Diagnostic, DiagnosticCode, Diagnostics, Document, EId, NodeId, SvgNode, SymbolTable};
use svgtypes::{Length, LengthUnit as Unit, PaintOrderKind};

use crate::geom::{convert_transform, is_axis_aligned, rect_path};
use crate::picture::{commands_bounds, is_draw};
use crate::{
    clip, image, mask, paint_server, shapes, switch, text, units, use_node, BlendMode, Command,
    ElementRef, Error, NonZeroRect, Opacity, Options, PathCommand, Picture, ResolvedStyle, Size,
    StyleResolver, StyleSheet, Transform, Units, ViewBox, Visibility,
};

/// A maximum number of `use` expansions per document.
///
/// Nested `use` elements can expand exponentially, like a "billion laughs" XML.
pub const MAX_INSTANCES: usize = 10_000;

/// A recording result.
#[derive(Clone, Debug)]
pub struct Recording {
    /// Recorded picture.
    pub picture: Picture,
    /// Document, symbol table and recording diagnostics, in that order.
    pub diagnostics: Vec<Diagnostic>,
}

impl Recording {
    /// Parses and records an SVG string.
    pub fn from_str(text: &str, opt: &Options) -> Result<Self, Error> {
        let doc = Document::parse_str(text);
        let symbols = SymbolTable::build(&doc);
        let sheet = StyleSheet::from_document(&doc, opt);
        record(&doc, &symbols, &sheet, opt)
    }

    /// Parses and records SVG data.
    ///
    /// Can contain an SVG string or a gzip compressed data.
    pub fn from_data(data: &[u8], opt: &Options) -> Result<Self, Error> {
        if data.starts_with(&[0x1f, 0x8b]) {
            let data = crate::decompress_svgz(data)?;
            let text = std::str::from_utf8(&data).map_err(|_| Error::NotAnUtf8Str)?;
            Self::from_str(text, opt)
        } else {
            let text = std::str::from_utf8(data).map_err(|_| Error::NotAnUtf8Str)?;
            Self::from_str(text, opt)
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct State<'a> {
    pub(crate) opt: &'a Options,
    /// The size of the root SVG element.
    pub(crate) size: Size,
    /// A viewBox of the parent SVG element.
    pub(crate) view_box: NonZeroRect,
    /// A size of the parent `use` element.
    /// Used only during nested `svg` size resolving.
    /// Width and height can be set independently.
    pub(crate) use_size: (Option<f32>, Option<f32>),
}

pub(crate) struct Context<'a> {
    pub(crate) symbols: &'a SymbolTable,
    pub(crate) resolver: StyleResolver<'a>,
    pub(crate) diagnostics: Diagnostics,
    /// `use` targets being expanded.
    pub(crate) use_chain: Vec<NodeId>,
    /// Patterns, clip paths and masks being resolved.
    pub(crate) ref_chain: Vec<NodeId>,
    instances: usize,
    reported_cycles: Vec<Vec<NodeId>>,
    reported_unsupported: Vec<&'static str>,
    limit_reported: bool,
    strict: bool,
    error: Option<Error>,
}

impl<'a> Context<'a> {
    fn new(symbols: &'a SymbolTable, resolver: StyleResolver<'a>, strict: bool) -> Self {
        Context {
            symbols,
            resolver,
            diagnostics: Diagnostics::new(),
            use_chain: Vec::new(),
            ref_chain: Vec::new(),
            instances: 0,
            reported_cycles: Vec::new(),
            reported_unsupported: Vec::new(),
            limit_reported: false,
            strict,
            error: None,
        }
    }

    pub(crate) fn report(&mut self, code: DiagnosticCode, message: impl Into<String>, node: SvgNode) {
        self.diagnostics.report(code, message, Some(node.span()));
    }

    /// Reports a reference cycle once per set of its members.
    pub(crate) fn report_cycle(&mut self, members: &[NodeId], message: impl Into<String>, node: SvgNode) {
        let mut key = members.to_vec();
        key.sort();
        key.dedup();
        if self.reported_cycles.contains(&key) {
            return;
        }

        self.reported_cycles.push(key);
        self.report(DiagnosticCode::ReferenceCycle, message, node);
    }

    /// Reports an unsupported feature once per document.
    pub(crate) fn report_unsupported(&mut self, feature: &'static str, message: impl Into<String>, node: SvgNode) {
        if self.reported_unsupported.contains(&feature) {
            return;
        }

        self.reported_unsupported.push(feature);
        self.report(DiagnosticCode::Unsupported, message, node);
    }

    /// Reports a resource that cannot be used.
    ///
    /// In strict mode, the first such resource fails the whole recording.
    pub(crate) fn resource_failed(
        &mut self,
        code: DiagnosticCode,
        message: impl Into<String>,
        error: Error,
        node: SvgNode,
    ) {
        self.report(code, message, node);
        if self.strict && self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Counts a new instance.
    ///
    /// Returns `false` when the instance budget is exhausted.
    pub(crate) fn take_instance(&mut self, node: SvgNode) -> bool {
        if self.instances >= MAX_INSTANCES {
            if !self.limit_reported {
                self.limit_reported = true;
                self.report(
                    DiagnosticCode::InstanceLimit,
                    format!("more than {} 'use' instances, the rest are skipped", MAX_INSTANCES),
                    node,
                );
            }

            return false;
        }

        self.instances += 1;
        true
    }
}

/// Returns a reference to the source element of a draw command.
pub(crate) fn element_ref(node: SvgNode) -> ElementRef {
    ElementRef {
        node: node.id(),
        id: node.element_id().to_string(),
    }
}

/// Records a document into a picture.
///
/// Data problems never fail the recording: they are reported as diagnostics
/// and the affected content is skipped. The only error is a resource failure
/// when [`Options::strict_resources`] is set.
pub fn record(
    doc: &Document,
    symbols: &SymbolTable,
    sheet: &StyleSheet,
    opt: &Options,
) -> Result<Recording, Error> {
    let mut ctx = Context::new(symbols, StyleResolver::new(sheet, opt), opt.strict_resources);
    ctx.diagnostics.extend(doc.diagnostics().iter().cloned());
    ctx.diagnostics.extend(symbols.diagnostics().iter().cloned());

    for (href, span) in sheet.missing() {
        ctx.diagnostics.report(
            DiagnosticCode::ResourceNotFound,
            format!("style sheet '{}' cannot be loaded", href),
            Some(*span),
        );
        if ctx.strict && ctx.error.is_none() {
            ctx.error = Some(Error::ResourceNotFound(href.clone()));
        }
    }

    let svg = match doc.root_element() {
        Some(v) if v.has_tag_name(EId::Svg) => v,
        root => {
            let span = root.map(|n| n.span());
            ctx.diagnostics.report(
                DiagnosticCode::Unsupported,
                "the root element is not 'svg'",
                span,
            );

            let size = opt.default_size;
            let view_box = ViewBox {
                rect: size.to_non_zero_rect(0.0, 0.0),
                aspect: Default::default(),
            };

            return finish(ctx, Picture::new(Vec::new(), size, view_box));
        }
    };

    let root_style = ctx.resolver.resolve(svg, None);
    let size = match resolve_svg_size(svg, &root_style, opt) {
        Some(v) => v,
        None => {
            ctx.report(
                DiagnosticCode::InvalidValue,
                "the root 'svg' element has an invalid size, using the default one",
                svg,
            );
            opt.default_size
        }
    };

    let view_box = ViewBox {
        rect: get_view_box(svg).unwrap_or_else(|| size.to_non_zero_rect(0.0, 0.0)),
        aspect: svg.attribute(AId::PreserveAspectRatio).unwrap_or_default(),
    };

    let state = State {
        opt,
        size,
        view_box: view_box.rect,
        use_size: (None, None),
    };

    let mut commands = vec![Command::Save];
    let ts = view_box.to_transform(size);
    if !ts.is_identity() {
        commands.push(Command::SetTransform(ts));
    }

    record_element(svg, &ResolvedStyle::root(opt), &state, &mut ctx, &mut commands);
    commands.push(Command::Restore);

    finish(ctx, Picture::new(commands, size, view_box))
}

fn finish(ctx: Context, picture: Picture) -> Result<Recording, Error> {
    if let Some(e) = ctx.error {
        return Err(e);
    }

    Ok(Recording {
        picture,
        diagnostics: ctx.diagnostics.into_vec(),
    })
}

fn resolve_svg_size(svg: SvgNode, style: &ResolvedStyle, opt: &Options) -> Option<Size> {
    let def = Length::new(100.0, Unit::Percent);
    let mut width: Length = svg.attribute(AId::Width).unwrap_or(def);
    let mut height: Length = svg.attribute(AId::Height).unwrap_or(def);

    let view_box = get_view_box(svg);

    if view_box.is_none() {
        // Apply the percentages to the fallback size.
        if width.unit == Unit::Percent {
            width = Length::new(
                (width.number / 100.0) * opt.default_size.width() as f64,
                Unit::None,
            );
        }

        if height.unit == Unit::Percent {
            height = Length::new(
                (height.number / 100.0) * opt.default_size.height() as f64,
                Unit::None,
            );
        }
    }

    let state = State {
        opt,
        size: opt.default_size,
        view_box: view_box.unwrap_or_else(|| opt.default_size.to_non_zero_rect(0.0, 0.0)),
        use_size: (None, None),
    };

    let w = units::convert_user_length(width, AId::Width, style, &state);
    let h = units::convert_user_length(height, AId::Height, style, &state);
    Size::from_wh(w, h)
}

/// Parses a `viewBox` attribute.
pub(crate) fn get_view_box(node: SvgNode) -> Option<NonZeroRect> {
    let vb: svgtypes::ViewBox = node.attribute(AId::ViewBox)?;
    NonZeroRect::from_xywh(vb.x as f32, vb.y as f32, vb.w as f32, vb.h as f32)
}

#[inline(never)]
pub(crate) fn record_children(
    parent_node: SvgNode,
    style: &ResolvedStyle,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) {
    for node in parent_node.children() {
        record_element(node, style, state, ctx, out);
    }
}

#[inline(never)]
pub(crate) fn record_element(
    node: SvgNode,
    parent_style: &ResolvedStyle,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) {
    let tag_name = match node.tag_name() {
        Some(v) => v,
        None => return,
    };

    if !tag_name.is_graphic() && !matches!(tag_name, EId::G | EId::A | EId::Switch | EId::Svg) {
        return;
    }

    let style = ctx.resolver.resolve(node, Some(parent_style));
    if !is_visible_element(node, &style, state.opt) {
        return;
    }

    let transform = match resolve_transform(node, &style) {
        Some(v) => v,
        None => return,
    };

    let mut body = Vec::new();
    match tag_name {
        EId::Rect
        | EId::Circle
        | EId::Ellipse
        | EId::Line
        | EId::Polyline
        | EId::Polygon
        | EId::Path => {
            record_path(node, &style, state, ctx, &mut body);
        }
        EId::Image => {
            image::convert(node, &style, state, ctx, &mut body);
        }
        EId::Text => {
            text::convert(node, &style, state, ctx, &mut body);
        }
        EId::Use => {
            use_node::convert(node, &style, state, ctx, &mut body);
        }
        EId::Switch => {
            switch::convert(node, &style, state, ctx, &mut body);
        }
        EId::Svg => {
            if node.parent_element().is_some() {
                use_node::convert_svg(node, &style, state, ctx, &mut body);
            } else {
                // Root `svg` viewport is set up by the caller.
                record_children(node, &style, state, ctx, &mut body);
            }
        }
        EId::G | EId::A => {
            record_children(node, &style, state, ctx, &mut body);
        }
        _ => {}
    }

    record_group(node, &style, transform, body, state, ctx, out);
}

/// Checks `display` and conditional attributes.
pub(crate) fn is_visible_element(node: SvgNode, style: &ResolvedStyle, opt: &Options) -> bool {
    style.get(AId::Display) != Some("none") && switch::is_condition_passed(node, opt)
}

/// Resolves the element's own `transform`.
///
/// Returns `None` for a non-invertible transform, which disables rendering of the element.
pub(crate) fn resolve_transform(node: SvgNode, style: &ResolvedStyle) -> Option<Transform> {
    let ts = match style.parse::<svgtypes::Transform>(node, AId::Transform) {
        Some(v) => v,
        None => return Some(Transform::default()),
    };

    let ts = convert_transform(ts);
    if ts.is_none() {
        log::warn!("Element '{}' has an invalid transform. Skipped.", node.element_id());
    }

    ts
}

/// Wraps element content into a state scope.
///
/// The scope is omitted when the element has nothing to push.
fn record_group(
    node: SvgNode,
    style: &ResolvedStyle,
    transform: Transform,
    body: Vec<Command>,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) {
    if !body.iter().any(is_draw) {
        return;
    }

    let opacity = style
        .get(AId::Opacity)
        .and_then(crate::paint::parse_opacity)
        .unwrap_or(Opacity::ONE);
    let blend_mode: BlendMode = style.parse(node, AId::MixBlendMode).unwrap_or_default();

    // Object bounding box in the element's user space.
    let bbox = commands_bounds(&body, false);

    let mut clips = Vec::new();
    if clip::convert_clip_path(node, style, bbox, state, ctx, &mut clips).is_none() {
        return;
    }
    if mask::convert(node, style, bbox, state, ctx, &mut clips).is_none() {
        return;
    }

    let has_layer = opacity != Opacity::ONE || blend_mode != BlendMode::Normal;
    if !has_layer && clips.is_empty() && transform.is_identity() {
        out.extend(body);
        return;
    }

    if has_layer {
        out.push(Command::SaveLayer {
            opacity,
            blend_mode,
        });
    } else {
        out.push(Command::Save);
    }

    // Clips precede the element transform, so they are mapped into the parent space.
    for cmd in clips {
        if let Some(cmd) = map_clip(cmd, transform) {
            out.push(cmd);
        }
    }

    if !transform.is_identity() {
        out.push(Command::SetTransform(transform));
    }

    out.extend(body);
    out.push(Command::Restore);
}

fn map_clip(cmd: Command, ts: Transform) -> Option<Command> {
    if ts.is_identity() {
        return Some(cmd);
    }

    match cmd {
        Command::ClipRect(rect) if is_axis_aligned(ts) => rect.transform(ts).map(Command::ClipRect),
        Command::ClipRect(rect) => Some(Command::ClipPath {
            path: rect_path(rect, ts)?,
            rule: crate::FillRule::NonZero,
        }),
        Command::ClipPath { path, rule } => Some(Command::ClipPath {
            path: std::sync::Arc::new(path.as_ref().clone().transform(ts)?),
            rule,
        }),
        cmd => Some(cmd),
    }
}

fn record_path(
    node: SvgNode,
    style: &ResolvedStyle,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) {
    let path = match shapes::convert(node, style, state) {
        Some(v) => v.to_path(),
        None => return,
    };

    let visibility: Visibility = style.parse(node, AId::Visibility).unwrap_or_default();
    if visibility != Visibility::Visible {
        return;
    }

    let bbox = path.compute_tight_bounds();
    let fill = paint_server::resolve_fill(node, style, bbox, state, ctx);
    let stroke = paint_server::resolve_stroke(node, style, bbox, state, ctx);

    // If a path doesn't have a fill or a stroke than it's invisible.
    if fill.is_none() && stroke.is_none() {
        return;
    }

    let anti_alias = !matches!(
        style.get(AId::ShapeRendering),
        Some("optimizeSpeed") | Some("crispEdges")
    );

    let paint_order = style
        .get(AId::PaintOrder)
        .and_then(|v| svgtypes::PaintOrder::from_str(v).ok())
        .unwrap_or_default();
    let stroke_first = match (paint_order.order[0], paint_order.order[1]) {
        (PaintOrderKind::Stroke, _) => true,
        (PaintOrderKind::Markers, PaintOrderKind::Stroke) => true,
        _ => false,
    };

    let element = Some(element_ref(node));
    if stroke_first && fill.is_some() && stroke.is_some() {
        out.push(Command::DrawPath(PathCommand {
            path: path.clone(),
            fill: None,
            stroke,
            anti_alias,
            element: element.clone(),
        }));
        out.push(Command::DrawPath(PathCommand {
            path,
            fill,
            stroke: None,
            anti_alias,
            element,
        }));
    } else {
        out.push(Command::DrawPath(PathCommand {
            path,
            fill,
            stroke,
            anti_alias,
            element,
        }));
    }
}

/// Converts an `x`/`y`/`width`/`height` rectangle, like a mask region.
pub(crate) fn convert_rect(
    node: SvgNode,
    units: Units,
    defaults: [Length; 4],
    style: &ResolvedStyle,
    state: &State,
) -> Option<NonZeroRect> {
    NonZeroRect::from_xywh(
        units::convert_attr(node, AId::X, units, style, state, defaults[0]),
        units::convert_attr(node, AId::Y, units, style, state, defaults[1]),
        units::convert_attr(node, AId::Width, units, style, state, defaults[2]),
        units::convert_attr(node, AId::Height, units, style, state, defaults[3]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_str(text: &str) -> Recording {
        Recording::from_str(text, &Options::default()).unwrap()
    }

    fn balance(commands: &[Command]) -> i32 {
        commands.iter().fold(0, |n, cmd| match cmd {
            Command::Save | Command::SaveLayer { .. } => n + 1,
            Command::Restore => n - 1,
            _ => n,
        })
    }

    #[test]
    fn plain_group_has_no_scope() {
        let rec = record_str(
            "<svg xmlns='http://www.w3.org/2000/svg' width='10' height='10'>
                <g><rect width='5' height='5'/></g>
            </svg>",
        );
        let commands = rec.picture.commands();
        assert_eq!(commands.len(), 3);
        assert!(matches!(commands[1], Command::DrawPath(_)));
    }

    #[test]
    fn opacity_layer() {
        let rec = record_str(
            "<svg xmlns='http://www.w3.org/2000/svg' width='10' height='10'>
                <rect width='5' height='5' opacity='0.5' transform='translate(1 1)'/>
            </svg>",
        );
        let commands = rec.picture.commands();
        assert!(matches!(commands[1], Command::SaveLayer { opacity, .. } if opacity.get() == 0.5));
        assert!(matches!(commands[2], Command::SetTransform(_)));
        assert!(matches!(commands[3], Command::DrawPath(_)));
        assert!(matches!(commands[4], Command::Restore));
        assert_eq!(balance(commands), 0);
    }

    #[test]
    fn invalid_transform_skips_element() {
        let rec = record_str(
            "<svg xmlns='http://www.w3.org/2000/svg' width='10' height='10'>
                <rect width='5' height='5' transform='scale(0)'/>
            </svg>",
        );
        assert!(rec.picture.is_empty());
    }

    #[test]
    fn display_none() {
        let rec = record_str(
            "<svg xmlns='http://www.w3.org/2000/svg' width='10' height='10'>
                <g style='display:none'><rect width='5' height='5'/></g>
            </svg>",
        );
        assert!(rec.picture.is_empty());
    }

    #[test]
    fn paint_order_splits_draws() {
        let rec = record_str(
            "<svg xmlns='http://www.w3.org/2000/svg' width='10' height='10'>
                <rect width='5' height='5' stroke='red' paint-order='stroke'/>
            </svg>",
        );
        let draws: Vec<_> = rec
            .picture
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::DrawPath(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(draws.len(), 2);
        assert!(draws[0].fill.is_none() && draws[0].stroke.is_some());
        assert!(draws[1].fill.is_some() && draws[1].stroke.is_none());
    }

    #[test]
    fn view_box_transform_goes_first() {
        let rec = record_str(
            "<svg xmlns='http://www.w3.org/2000/svg' width='20' height='20' viewBox='0 0 10 10'>
                <rect width='5' height='5'/>
            </svg>",
        );
        let commands = rec.picture.commands();
        assert!(matches!(commands[0], Command::Save));
        assert!(matches!(commands[1], Command::SetTransform(ts) if ts == Transform::from_scale(2.0, 2.0)));
        assert_eq!(rec.picture.size(), Size::from_wh(20.0, 20.0).unwrap());
    }

    #[test]
    fn not_an_svg() {
        let rec = record_str("<html/>");
        assert!(rec.picture.is_empty());
        assert!(rec
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::Unsupported));
    }

    #[test]
    fn strict_resources() {
        let opt = Options {
            strict_resources: true,
            resource_loader: Box::new(crate::NoResourceLoader),
            ..Options::default()
        };
        let res = Recording::from_str(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <image xlink:href='missing.png' width='10' height='10'/>
            </svg>",
            &opt,
        );
        assert!(matches!(res, Err(Error::ResourceNotFound(_))));
    }
}
