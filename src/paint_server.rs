// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fill, stroke and paint server resolving.

use std::sync::Arc;

use strict_num::{ApproxEqUlps, PositiveF32};
use svgtree::{AId, DiagnosticCode, EId, NodeId, SvgNode};
use svgtypes::{Length, LengthUnit as Unit};

use crate::clip;
use crate::paint::{parse_opacity, split_alpha};
use crate::picture::is_draw;
use crate::recorder::{self, Context, State};
use crate::{
    units, ApproxZeroUlps, BaseGradient, Color, Command, Fill, IsValidLength, LinearGradient,
    NonZeroRect, Opacity, OptionLog, Paint, Pattern, Picture, RadialGradient, Rect,
    ResolvedStyle, SpreadMethod, Stop, StopOffset, Stroke, StrokeMiterlimit, StrokeWidth,
    Transform, Units, ViewBox, ZeroBBoxPaint,
};

enum ServerOrColor {
    Server(Paint),
    Color { color: Color, opacity: Opacity },
    /// An `objectBoundingBox` server applied to a shape without an area.
    ZeroBBox,
}

pub(crate) fn resolve_fill(
    node: SvgNode,
    style: &ResolvedStyle,
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
) -> Option<Fill> {
    let mut sub_opacity = Opacity::ONE;
    let paint = if style.contains(AId::Fill) {
        convert_paint(node, AId::Fill, style, bbox, state, ctx, &mut sub_opacity)?
    } else {
        Paint::Color(Color::black())
    };

    let opacity = style
        .get(AId::FillOpacity)
        .and_then(parse_opacity)
        .unwrap_or(Opacity::ONE);

    Some(Fill {
        paint,
        opacity: multiply(sub_opacity, opacity),
        rule: style.parse(node, AId::FillRule).unwrap_or_default(),
    })
}

pub(crate) fn resolve_stroke(
    node: SvgNode,
    style: &ResolvedStyle,
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
) -> Option<Stroke> {
    if !style.contains(AId::Stroke) {
        return None;
    }

    let width = units::convert_property(node, AId::StrokeWidth, style, state, 1.0);
    let width = StrokeWidth::new(width)?;

    let mut sub_opacity = Opacity::ONE;
    let paint = convert_paint(node, AId::Stroke, style, bbox, state, ctx, &mut sub_opacity)?;

    // Must be bigger than 1.
    let miterlimit = style.parse::<f32>(node, AId::StrokeMiterlimit).unwrap_or(4.0);
    let miterlimit = StrokeMiterlimit::new(miterlimit);

    let opacity = style
        .get(AId::StrokeOpacity)
        .and_then(parse_opacity)
        .unwrap_or(Opacity::ONE);

    Some(Stroke {
        paint,
        dasharray: conv_dasharray(style, state),
        dashoffset: units::convert_property(node, AId::StrokeDashoffset, style, state, 0.0),
        miterlimit,
        opacity: multiply(sub_opacity, opacity),
        width,
        linecap: style.parse(node, AId::StrokeLinecap).unwrap_or_default(),
        linejoin: style.parse(node, AId::StrokeLinejoin).unwrap_or_default(),
    })
}

fn multiply(a: Opacity, b: Opacity) -> Opacity {
    Opacity::new_clamped(a.get() * b.get())
}

fn convert_paint(
    node: SvgNode,
    aid: AId,
    style: &ResolvedStyle,
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
    opacity: &mut Opacity,
) -> Option<Paint> {
    let value = style.get(aid)?;
    let paint = match svgtypes::Paint::from_str(value) {
        Ok(v) => v,
        Err(_) => {
            ctx.report(
                DiagnosticCode::InvalidValue,
                format!("'{}' is not a valid {} value", value, aid),
                node,
            );
            return None;
        }
    };

    match paint {
        svgtypes::Paint::CurrentColor => Some(current_color(node, style, opacity)),
        svgtypes::Paint::Color(svg_color) => {
            let (color, alpha) = split_alpha(svg_color);
            *opacity = alpha;
            Some(Paint::Color(color))
        }
        svgtypes::Paint::FuncIRI(func_iri, fallback) => {
            let link = match ctx.symbols.try_get(func_iri) {
                Some(id) => node.document().get(id),
                None => {
                    ctx.report(
                        DiagnosticCode::DanglingReference,
                        format!("'#{}' does not reference a paint server", func_iri),
                        node,
                    );
                    return from_fallback(node, style, fallback, opacity);
                }
            };

            match link.tag_name() {
                Some(tag_name) if tag_name.is_paint_server() => {}
                _ => {
                    log::warn!("'{}' cannot be used to {} a shape.", link.local_name(), aid);
                    return None;
                }
            }

            match convert_server(link, bbox, state, ctx) {
                Some(ServerOrColor::Server(paint)) => Some(paint),
                Some(ServerOrColor::Color { color, opacity: so }) => {
                    *opacity = so;
                    Some(Paint::Color(color))
                }
                Some(ServerOrColor::ZeroBBox) => match state.opt.zero_bbox_paint {
                    ZeroBBoxPaint::Fallback => from_fallback(node, style, fallback, opacity),
                    ZeroBBoxPaint::None => None,
                    ZeroBBoxPaint::Color(color) => Some(Paint::Color(color)),
                },
                None => from_fallback(node, style, fallback, opacity),
            }
        }
        _ => None,
    }
}

fn current_color(node: SvgNode, style: &ResolvedStyle, opacity: &mut Opacity) -> Paint {
    let svg_color: svgtypes::Color = style
        .parse(node, AId::Color)
        .unwrap_or_else(svgtypes::Color::black);
    let (color, alpha) = split_alpha(svg_color);
    *opacity = alpha;
    Paint::Color(color)
}

fn from_fallback(
    node: SvgNode,
    style: &ResolvedStyle,
    fallback: Option<svgtypes::PaintFallback>,
    opacity: &mut Opacity,
) -> Option<Paint> {
    match fallback? {
        svgtypes::PaintFallback::None => None,
        svgtypes::PaintFallback::CurrentColor => Some(current_color(node, style, opacity)),
        svgtypes::PaintFallback::Color(svg_color) => {
            let (color, alpha) = split_alpha(svg_color);
            *opacity = alpha;
            Some(Paint::Color(color))
        }
    }
}

// Prepare the 'stroke-dasharray' according to:
// https://www.w3.org/TR/SVG11/painting.html#StrokeDasharrayProperty
fn conv_dasharray(style: &ResolvedStyle, state: &State) -> Option<Vec<f32>> {
    let list = units::convert_list(AId::StrokeDasharray, style, state)?;

    // `A negative value is an error`
    if list.iter().any(|n| n.is_sign_negative()) {
        return None;
    }

    // `If the sum of the values is zero, then the stroke is rendered
    // as if a value of none were specified.`
    let sum: f32 = list.iter().sum();
    if sum.approx_zero_ulps(4) {
        return None;
    }

    // `If an odd number of values is provided, then the list of values
    // is repeated to yield an even number of values.`
    if list.len() % 2 != 0 {
        let mut tmp_list = list.clone();
        tmp_list.extend_from_slice(&list);
        return Some(tmp_list);
    }

    Some(list)
}

fn convert_server(
    node: SvgNode,
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
) -> Option<ServerOrColor> {
    let chain = href_chain(node, ctx);
    match node.tag_name()? {
        EId::LinearGradient => convert_linear(node, &chain, bbox, state, ctx),
        EId::RadialGradient => convert_radial(node, &chain, bbox, state, ctx),
        EId::Pattern => convert_pattern(node, &chain, bbox, state, ctx),
        _ => None,
    }
}

/// Collects the `href` chain of a paint server, starting with the server itself.
fn href_chain<'a>(node: SvgNode<'a>, ctx: &mut Context) -> Vec<SvgNode<'a>> {
    let symbols = ctx.symbols;
    let mut iter = symbols.href_iter(node);
    let ids: Vec<NodeId> = iter.by_ref().map(|n| n.id()).collect();
    if iter.has_cycle() {
        ctx.report_cycle(
            &ids,
            format!("'{}' has a recursive 'xlink:href' chain", node.element_id()),
            node,
        );
    }

    let doc = node.document();
    ids.into_iter().map(|id| doc.get(id)).collect()
}

#[inline(never)]
fn convert_linear(
    node: SvgNode,
    chain: &[SvgNode],
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
) -> Option<ServerOrColor> {
    let stops = convert_stops(find_gradient_with_stops(chain)?, ctx);
    if stops.len() < 2 {
        return stops_to_color(&stops);
    }

    let units = convert_units(chain, AId::GradientUnits, Units::ObjectBoundingBox);
    let transform = match gradient_transform(chain, units, bbox) {
        Transformed::Ok(ts) => ts,
        Transformed::ZeroBBox => return Some(ServerOrColor::ZeroBBox),
        Transformed::Invalid => return None,
    };

    let style = ctx.resolver.resolve_in_tree(node);
    let gradient = LinearGradient {
        x1: resolve_number(chain, AId::X1, units, &style, state, Length::zero()),
        y1: resolve_number(chain, AId::Y1, units, &style, state, Length::zero()),
        x2: resolve_number(chain, AId::X2, units, &style, state, Length::new(100.0, Unit::Percent)),
        y2: resolve_number(chain, AId::Y2, units, &style, state, Length::zero()),
        base: BaseGradient {
            id: node.element_id().to_string(),
            transform,
            spread_method: convert_spread_method(chain),
            stops,
        },
    };

    Some(ServerOrColor::Server(Paint::LinearGradient(Arc::new(gradient))))
}

#[inline(never)]
fn convert_radial(
    node: SvgNode,
    chain: &[SvgNode],
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
) -> Option<ServerOrColor> {
    let stops = convert_stops(find_gradient_with_stops(chain)?, ctx);
    if stops.len() < 2 {
        return stops_to_color(&stops);
    }

    let units = convert_units(chain, AId::GradientUnits, Units::ObjectBoundingBox);
    let style = ctx.resolver.resolve_in_tree(node);
    let r = resolve_number(chain, AId::R, units, &style, state, Length::new(50.0, Unit::Percent));

    // 'A value of zero will cause the area to be painted as a single color
    // using the color and opacity of the last gradient stop.'
    //
    // https://www.w3.org/TR/SVG11/pservers.html#RadialGradientElementRAttribute
    if !r.is_valid_length() {
        let stop = stops.last()?;
        return Some(ServerOrColor::Color {
            color: stop.color,
            opacity: stop.opacity,
        });
    }

    let transform = match gradient_transform(chain, units, bbox) {
        Transformed::Ok(ts) => ts,
        Transformed::ZeroBBox => return Some(ServerOrColor::ZeroBBox),
        Transformed::Invalid => return None,
    };

    let cx = resolve_number(chain, AId::Cx, units, &style, state, Length::new(50.0, Unit::Percent));
    let cy = resolve_number(chain, AId::Cy, units, &style, state, Length::new(50.0, Unit::Percent));
    let fx = resolve_number(chain, AId::Fx, units, &style, state, Length::new_number(cx as f64));
    let fy = resolve_number(chain, AId::Fy, units, &style, state, Length::new_number(cy as f64));
    let (fx, fy) = prepare_focal(cx, cy, r, fx, fy);

    let gradient = RadialGradient {
        cx,
        cy,
        r: PositiveF32::new(r)?,
        fx,
        fy,
        base: BaseGradient {
            id: node.element_id().to_string(),
            transform,
            spread_method: convert_spread_method(chain),
            stops,
        },
    };

    Some(ServerOrColor::Server(Paint::RadialGradient(Arc::new(gradient))))
}

enum Transformed {
    Ok(Transform),
    ZeroBBox,
    Invalid,
}

/// Combines `gradientTransform` with the bounding box mapping.
fn gradient_transform(chain: &[SvgNode], units: Units, bbox: Option<Rect>) -> Transformed {
    let ts = match clip::attr_transform(resolve_attr(chain, AId::GradientTransform), AId::GradientTransform) {
        Some(v) => v,
        None => return Transformed::Invalid,
    };

    if units == Units::ObjectBoundingBox {
        // We can use a paint server with ObjectBoundingBox units
        // for painting only when the shape itself has a bbox.
        //
        // See SVG spec 7.11 for details.
        match clip::non_zero_bbox(bbox) {
            Some(bbox) => Transformed::Ok(Transform::from_bbox(bbox).pre_concat(ts)),
            None => Transformed::ZeroBBox,
        }
    } else {
        Transformed::Ok(ts)
    }
}

#[inline(never)]
fn convert_pattern(
    node: SvgNode,
    chain: &[SvgNode],
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
) -> Option<ServerOrColor> {
    let node_with_children = find_pattern_with_children(chain)?;

    let view_box = {
        let n1 = resolve_attr(chain, AId::ViewBox);
        let n2 = resolve_attr(chain, AId::PreserveAspectRatio);
        recorder::get_view_box(n1).map(|rect| ViewBox {
            rect,
            aspect: n2.attribute(AId::PreserveAspectRatio).unwrap_or_default(),
        })
    };

    let units = convert_units(chain, AId::PatternUnits, Units::ObjectBoundingBox);
    // 'Note that this attribute has no effect if attribute `viewBox` is specified.'
    let content_units = match view_box {
        Some(_) => Units::UserSpaceOnUse,
        None => convert_units(chain, AId::PatternContentUnits, Units::UserSpaceOnUse),
    };

    let bbox = if units == Units::ObjectBoundingBox || content_units == Units::ObjectBoundingBox {
        match clip::non_zero_bbox(bbox) {
            Some(v) => Some(v),
            None => return Some(ServerOrColor::ZeroBBox),
        }
    } else {
        None
    };

    let transform = clip::attr_transform(
        resolve_attr(chain, AId::PatternTransform),
        AId::PatternTransform,
    )?;

    let style = ctx.resolver.resolve_in_tree(node);
    let rect = NonZeroRect::from_xywh(
        resolve_number(chain, AId::X, units, &style, state, Length::zero()),
        resolve_number(chain, AId::Y, units, &style, state, Length::zero()),
        resolve_number(chain, AId::Width, units, &style, state, Length::zero()),
        resolve_number(chain, AId::Height, units, &style, state, Length::zero()),
    );
    let rect = rect.log_none(|| {
        log::warn!("Pattern '{}' has an invalid size. Skipped.", node.element_id())
    })?;
    let rect = match bbox {
        Some(bbox) if units == Units::ObjectBoundingBox => rect.bbox_transform(bbox),
        _ => rect,
    };

    let content_ts = if let Some(vb) = view_box {
        vb.to_transform(rect.size())
    } else if let (Units::ObjectBoundingBox, Some(bbox)) = (content_units, bbox) {
        // `x` and `y` of the bounding box are ignored,
        // since content is already positioned inside the tile.
        Transform::from_scale(bbox.width(), bbox.height())
    } else {
        Transform::default()
    };

    if !clip::guard_enter(node, node, "pattern", ctx) {
        return None;
    }

    let content_style = ctx.resolver.resolve_in_tree(node_with_children);
    let mut body = Vec::new();
    recorder::record_children(node_with_children, &content_style, state, ctx, &mut body);
    ctx.ref_chain.pop();

    if !body.iter().any(is_draw) {
        return None;
    }

    let mut commands = Vec::with_capacity(body.len() + 3);
    commands.push(Command::Save);
    if !content_ts.is_identity() {
        commands.push(Command::SetTransform(content_ts));
    }
    commands.extend(body);
    commands.push(Command::Restore);

    let size = rect.size();
    let content = Picture::new(
        commands,
        size,
        ViewBox {
            rect: size.to_non_zero_rect(0.0, 0.0),
            aspect: Default::default(),
        },
    );

    let pattern = Pattern {
        id: node.element_id().to_string(),
        transform,
        rect,
        content: Arc::new(content),
    };

    Some(ServerOrColor::Server(Paint::Pattern(Arc::new(pattern))))
}

fn convert_spread_method(chain: &[SvgNode]) -> SpreadMethod {
    let node = resolve_attr(chain, AId::SpreadMethod);
    node.attribute(AId::SpreadMethod).unwrap_or_default()
}

fn convert_units(chain: &[SvgNode], name: AId, def: Units) -> Units {
    let node = resolve_attr(chain, name);
    node.attribute(name).unwrap_or(def)
}

fn find_gradient_with_stops<'a>(chain: &[SvgNode<'a>]) -> Option<SvgNode<'a>> {
    let origin = chain.first()?;
    for link in chain {
        if !link.tag_name().map_or(false, |t| t.is_gradient()) {
            log::warn!(
                "Gradient '{}' cannot reference '{}' via 'xlink:href'.",
                origin.element_id(),
                link.local_name()
            );
            return None;
        }

        if link.children().any(|n| n.has_tag_name(EId::Stop)) {
            return Some(*link);
        }
    }

    None
}

fn find_pattern_with_children<'a>(chain: &[SvgNode<'a>]) -> Option<SvgNode<'a>> {
    let origin = chain.first()?;
    for link in chain {
        if !link.has_tag_name(EId::Pattern) {
            log::warn!(
                "Pattern '{}' cannot reference '{}' via 'xlink:href'.",
                origin.element_id(),
                link.local_name()
            );
            return None;
        }

        if link.children().any(|n| n.is_element()) {
            return Some(*link);
        }
    }

    None
}

fn convert_stops(grad: SvgNode, ctx: &Context) -> Vec<Stop> {
    let grad_style = ctx.resolver.resolve_in_tree(grad);

    let mut stops = Vec::new();
    let mut prev_offset = 0.0;
    for stop in grad.children() {
        if !stop.is_element() {
            continue;
        }

        if !stop.has_tag_name(EId::Stop) {
            log::warn!("Invalid gradient child: '{}'.", stop.local_name());
            continue;
        }

        // `number` can be either a number or a percentage.
        let offset = match stop.attribute::<Length>(AId::Offset) {
            Some(Length { number, unit: Unit::None }) => number as f32,
            Some(Length { number, unit: Unit::Percent }) => number as f32 / 100.0,
            _ => prev_offset,
        };
        let offset = bound(0.0, offset, 1.0);
        prev_offset = offset;

        let style = ctx.resolver.resolve(stop, Some(&grad_style));
        let svg_color = match style.get(AId::StopColor) {
            Some("currentColor") => style.parse(stop, AId::Color),
            Some(_) => style.parse(stop, AId::StopColor),
            None => None,
        };
        let (color, alpha) = split_alpha(svg_color.unwrap_or_else(svgtypes::Color::black));
        let opacity = style
            .get(AId::StopOpacity)
            .and_then(parse_opacity)
            .unwrap_or(Opacity::ONE);

        stops.push(Stop {
            offset: StopOffset::new_clamped(offset),
            color,
            opacity: multiply(alpha, opacity),
        });
    }

    fix_offsets(&mut stops);
    stops
}

fn fix_offsets(stops: &mut Vec<Stop>) {
    // Remove stops with equal offset.
    //
    // Example:
    // offset="0.5"
    // offset="0.7"
    // offset="0.7" <-- this one should be removed
    // offset="0.7"
    // offset="0.9"
    if stops.len() >= 3 {
        let mut i = 0;
        while i < stops.len() - 2 {
            let offset1 = stops[i].offset.get();
            let offset2 = stops[i + 1].offset.get();
            let offset3 = stops[i + 2].offset.get();

            if offset1.approx_eq_ulps(&offset2, 4) && offset2.approx_eq_ulps(&offset3, 4) {
                // Remove offset in the middle.
                stops.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    // Remove zeros.
    //
    // From:
    // offset="0.0"
    // offset="0.0"
    // offset="0.7"
    //
    // To:
    // offset="0.0"
    // offset="0.00000001"
    // offset="0.7"
    if stops.len() >= 2 {
        let mut i = 0;
        while i < stops.len() - 1 {
            let offset1 = stops[i].offset.get();
            let offset2 = stops[i + 1].offset.get();

            if offset1.approx_zero_ulps(4) && offset2.approx_zero_ulps(4) {
                stops[i + 1].offset = StopOffset::new_clamped(offset1 + f32::EPSILON);
            }

            i += 1;
        }
    }

    // Shift equal offsets.
    //
    // From:
    // offset="0.5"
    // offset="0.7"
    // offset="0.7"
    //
    // To:
    // offset="0.5"
    // offset="0.699999999"
    // offset="0.7"
    let mut i = 1;
    while i < stops.len() {
        let offset1 = stops[i - 1].offset.get();
        let offset2 = stops[i].offset.get();

        // Next offset must be smaller then previous.
        if offset1 > offset2 || offset1.approx_eq_ulps(&offset2, 4) {
            // Make previous offset a bit smaller.
            let new_offset = offset1 - f32::EPSILON;
            stops[i - 1].offset = StopOffset::new_clamped(new_offset);
            stops[i].offset = StopOffset::new_clamped(offset1);
        }

        i += 1;
    }
}

fn bound(min: f32, val: f32, max: f32) -> f32 {
    if val.is_nan() {
        return min;
    }

    val.max(min).min(max)
}

#[inline(never)]
fn resolve_number(
    chain: &[SvgNode],
    name: AId,
    units: Units,
    style: &ResolvedStyle,
    state: &State,
    def: Length,
) -> f32 {
    let node = resolve_attr(chain, name);
    units::convert_attr(node, name, units, style, state, def)
}

/// Finds an element in the `href` chain that defines an attribute.
///
/// Coordinates can be inherited only from an element of the same kind.
/// Other gradient attributes can be inherited from any gradient.
fn resolve_attr<'a>(chain: &[SvgNode<'a>], name: AId) -> SvgNode<'a> {
    let node = chain[0];
    for link in chain {
        let tag_name = match link.tag_name() {
            Some(v) => v,
            None => return node,
        };

        let allowed = match (node.tag_name(), name) {
            (Some(EId::Pattern), _) => tag_name == EId::Pattern,
            (_, AId::X1) | (_, AId::Y1) | (_, AId::X2) | (_, AId::Y2) => {
                tag_name == EId::LinearGradient
            }
            (_, AId::Cx) | (_, AId::Cy) | (_, AId::R) | (_, AId::Fx) | (_, AId::Fy) => {
                tag_name == EId::RadialGradient
            }
            (_, AId::GradientUnits) | (_, AId::SpreadMethod) | (_, AId::GradientTransform) => {
                tag_name.is_gradient()
            }
            _ => false,
        };

        if !allowed {
            break;
        }

        if link.has_attribute(name) {
            return *link;
        }
    }

    node
}

/// Prepares the radial gradient focal radius.
///
/// According to the SVG spec:
///
/// If the point defined by `fx` and `fy` lies outside the circle defined by
/// `cx`, `cy` and `r`, then the user agent shall set the focal point to the
/// intersection of the line from (`cx`, `cy`) to (`fx`, `fy`) with the circle
/// defined by `cx`, `cy` and `r`.
fn prepare_focal(cx: f32, cy: f32, r: f32, fx: f32, fy: f32) -> (f32, f32) {
    let max_r = r - r * 0.001;

    let dx = fx - cx;
    let dy = fy - cy;
    let len = (dx * dx + dy * dy).sqrt();
    if len > max_r {
        let k = max_r / len;
        (cx + dx * k, cy + dy * k)
    } else {
        (fx, fy)
    }
}

fn stops_to_color(stops: &[Stop]) -> Option<ServerOrColor> {
    let stop = stops.first()?;
    Some(ServerOrColor::Color {
        color: stop.color,
        opacity: stop.opacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Options, Recording};

    fn first_fill(text: &str, opt: &Options) -> Option<Fill> {
        let rec = Recording::from_str(text, opt).unwrap();
        rec.picture.commands().iter().find_map(|c| match c {
            Command::DrawPath(p) => p.fill.clone(),
            _ => None,
        })
    }

    #[test]
    fn derived_gradient() {
        let fill = first_fill(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <linearGradient id='base' x1='0.1'>
                    <stop offset='0' stop-color='#ff0000'/>
                    <stop offset='1' stop-color='#0000ff'/>
                </linearGradient>
                <linearGradient id='derived' xlink:href='#base' x2='0.8' y2='0.5'/>
                <rect width='10' height='10' fill='url(#derived)'/>
            </svg>",
            &Options::default(),
        )
        .unwrap();

        let lg = match fill.paint {
            Paint::LinearGradient(ref lg) => lg.clone(),
            _ => panic!("not a linear gradient"),
        };
        assert_eq!(lg.id, "derived");
        assert_eq!((lg.x1, lg.y1, lg.x2, lg.y2), (0.1, 0.0, 0.8, 0.5));
        assert_eq!(lg.stops.len(), 2);
        assert_eq!(lg.stops[0].color, Color::new_rgb(255, 0, 0));
        assert_eq!(lg.stops[1].color, Color::new_rgb(0, 0, 255));
        assert_eq!(lg.transform, Transform::from_scale(10.0, 10.0));
    }

    #[test]
    fn single_stop_is_a_color() {
        let fill = first_fill(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <radialGradient id='g'><stop stop-color='#00ff00' stop-opacity='0.5'/></radialGradient>
                <rect width='10' height='10' fill='url(#g)'/>
            </svg>",
            &Options::default(),
        )
        .unwrap();
        assert_eq!(fill.paint, Paint::Color(Color::new_rgb(0, 255, 0)));
        assert_eq!(fill.opacity.get(), 0.5);
    }

    #[test]
    fn no_stops_is_no_paint() {
        let fill = first_fill(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <linearGradient id='g'/>
                <rect width='10' height='10' fill='url(#g)' stroke='black'/>
            </svg>",
            &Options::default(),
        );
        assert!(fill.is_none());
    }

    const ZERO_BBOX: &str = "<svg xmlns='http://www.w3.org/2000/svg'>
        <linearGradient id='g'>
            <stop offset='0' stop-color='#ff0000'/>
            <stop offset='1' stop-color='#0000ff'/>
        </linearGradient>
        <path d='M 0 10 L 100 10' stroke='url(#g) #00ff00'/>
    </svg>";

    fn zero_bbox_stroke(policy: ZeroBBoxPaint) -> Option<Stroke> {
        let opt = Options {
            zero_bbox_paint: policy,
            ..Options::default()
        };
        let rec = Recording::from_str(ZERO_BBOX, &opt).unwrap();
        rec.picture.commands().iter().find_map(|c| match c {
            Command::DrawPath(p) => p.stroke.clone(),
            _ => None,
        })
    }

    #[test]
    fn zero_bbox_policy() {
        let stroke = zero_bbox_stroke(ZeroBBoxPaint::Fallback).unwrap();
        assert_eq!(stroke.paint, Paint::Color(Color::new_rgb(0, 255, 0)));

        assert!(zero_bbox_stroke(ZeroBBoxPaint::None).is_none());

        let stroke = zero_bbox_stroke(ZeroBBoxPaint::Color(Color::white())).unwrap();
        assert_eq!(stroke.paint, Paint::Color(Color::white()));
    }

    #[test]
    fn current_color() {
        let fill = first_fill(
            "<svg xmlns='http://www.w3.org/2000/svg' color='#0000ff'>
                <rect width='10' height='10' fill='currentColor' fill-opacity='50%'/>
            </svg>",
            &Options::default(),
        )
        .unwrap();
        assert_eq!(fill.paint, Paint::Color(Color::new_rgb(0, 0, 255)));
        assert_eq!(fill.opacity.get(), 0.5);
    }

    #[test]
    fn dasharray_rules() {
        let rec = Recording::from_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <rect width='10' height='10' stroke='black' stroke-dasharray='1 2 3'/>
                <rect width='10' height='10' stroke='black' stroke-dasharray='1 -2'/>
                <rect width='10' height='10' stroke='black' stroke-dasharray='0 0'/>
            </svg>",
            &Options::default(),
        )
        .unwrap();
        let dashes: Vec<_> = rec
            .picture
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::DrawPath(p) => p.stroke.as_ref().map(|s| s.dasharray.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(dashes, [Some(vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]), None, None]);
    }

    #[test]
    fn stop_offsets_are_monotonic() {
        let mut stops: Vec<Stop> = [0.0, 0.0, 0.7, 0.5]
            .iter()
            .map(|n| Stop {
                offset: StopOffset::new_clamped(*n),
                color: Color::black(),
                opacity: Opacity::ONE,
            })
            .collect();
        fix_offsets(&mut stops);
        for pair in stops.windows(2) {
            assert!(pair[0].offset.get() < pair[1].offset.get());
        }
    }

    #[test]
    fn self_referencing_pattern() {
        let rec = Recording::from_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <pattern id='p' width='10' height='10' patternUnits='userSpaceOnUse'>
                    <rect width='5' height='5' fill='url(#p)'/>
                    <rect x='5' width='5' height='5'/>
                </pattern>
                <rect width='50' height='50' fill='url(#p)'/>
            </svg>",
            &Options::default(),
        )
        .unwrap();

        let cycles = rec
            .diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::ReferenceCycle)
            .count();
        assert_eq!(cycles, 1);

        let pattern = rec
            .picture
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::DrawPath(p) => match p.fill.as_ref().map(|f| &f.paint) {
                    Some(Paint::Pattern(patt)) => Some(patt.clone()),
                    _ => None,
                },
                _ => None,
            })
            .unwrap();
        assert_eq!(pattern.rect, NonZeroRect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap());
        assert!(!pattern.content.is_empty());
    }
}
