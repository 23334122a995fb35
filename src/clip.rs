// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use svgtree::{AId, DiagnosticCode, EId, NodeId, SvgNode};
use svgtypes::Length;
use tiny_skia_path::PathSegment;

use crate::geom::{convert_transform, is_axis_aligned};
use crate::recorder::{self, Context, State};
use crate::shapes::{self, Shape};
use crate::{
    units, Command, FillRule, NonZeroRect, Path, PathBuilder, Point, Rect, ResolvedStyle,
    Transform, Units,
};

#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) enum Region {
    ClipPath,
    Mask,
}

/// A shape that contributes to a clip region.
pub(crate) struct ClipShape {
    pub shape: Shape,
    pub transform: Transform,
    pub rule: FillRule,
}

/// Resolves a `clip-path` property into clip commands.
///
/// Commands are in the element's user space. Returns `None` when the element
/// must not be rendered at all.
pub(crate) fn convert_clip_path(
    node: SvgNode,
    style: &ResolvedStyle,
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) -> Option<()> {
    let clip_node = match resolve_link(node, style, AId::ClipPath, ctx) {
        Link::None => return Some(()),
        Link::Element(v) => v,
    };

    if !guard_enter(node, clip_node, "clip path", ctx) {
        return None;
    }

    let res = convert_impl(clip_node, bbox, state, ctx, out);
    ctx.ref_chain.pop();
    res
}

fn convert_impl(
    clip_node: SvgNode,
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) -> Option<()> {
    let clip_style = ctx.resolver.resolve_in_tree(clip_node);

    let mut ts = recorder::resolve_transform(clip_node, &clip_style)?;

    let units: Units = clip_node
        .attribute(AId::ClipPathUnits)
        .unwrap_or(Units::UserSpaceOnUse);

    // 'If the value is objectBoundingBox and the bounding box
    // of the element has no area, the element is not rendered.'
    if units == Units::ObjectBoundingBox {
        let bbox = non_zero_bbox(bbox)?;
        ts = ts.pre_concat(Transform::from_bbox(bbox));
    }

    // A linked clip path is intersected with this one.
    convert_clip_path(clip_node, &clip_style, bbox, state, ctx, out)?;

    let mut shapes = Vec::new();
    for child in clip_node.children() {
        collect_shape(child, &clip_style, Transform::default(), Region::ClipPath, state, ctx, &mut shapes);
    }

    // A clip path without usable children hides the element.
    if shapes.is_empty() {
        return None;
    }

    out.push(shapes_to_clip(&shapes, ts)?);
    Some(())
}

pub(crate) enum Link<'a> {
    None,
    Element(SvgNode<'a>),
}

/// Resolves a `url(#id)` property to an element of a matching kind.
///
/// Invalid and dangling links are reported and ignored.
pub(crate) fn resolve_link<'a>(
    node: SvgNode<'a>,
    style: &ResolvedStyle,
    aid: AId,
    ctx: &mut Context,
) -> Link<'a> {
    let value = match style.get(aid) {
        Some(v) if v.trim() != "none" => v,
        _ => return Link::None,
    };

    let id = match svgtree::parse_func_iri(value) {
        Some(v) => v,
        None => {
            ctx.report(
                DiagnosticCode::InvalidValue,
                format!("'{}' is not a valid {} value", value, aid),
                node,
            );
            return Link::None;
        }
    };

    let target = match aid {
        AId::ClipPath => ctx.symbols.try_get_clip_path(id),
        _ => ctx.symbols.try_get_mask(id),
    };

    match target {
        Some(target) => Link::Element(node.document().get(target)),
        None => {
            let kind = if aid == AId::ClipPath { "clipPath" } else { "mask" };
            ctx.report(
                DiagnosticCode::DanglingReference,
                format!("'#{}' does not reference a {} element", id, kind),
                node,
            );
            Link::None
        }
    }
}

/// Pushes a referenced element onto the reference chain.
///
/// Returns `false` and reports a cycle when it is already there.
pub(crate) fn guard_enter(node: SvgNode, target: SvgNode, kind: &str, ctx: &mut Context) -> bool {
    let id = target.id();
    if let Some(idx) = ctx.ref_chain.iter().position(|n| *n == id) {
        let members: Vec<NodeId> = ctx.ref_chain[idx..].to_vec();
        ctx.report_cycle(
            &members,
            format!("{} '#{}' references itself", kind, target.element_id()),
            node,
        );
        return false;
    }

    ctx.ref_chain.push(id);
    true
}

pub(crate) fn non_zero_bbox(bbox: Option<Rect>) -> Option<NonZeroRect> {
    let bbox = bbox?;
    NonZeroRect::from_ltrb(bbox.left(), bbox.top(), bbox.right(), bbox.bottom())
}

/// Collects shape geometry of a clip path or a mask child.
///
/// `clipPath` allows only shapes and `use` elements that reference shapes.
/// Masks can also have groups.
pub(crate) fn collect_shape(
    node: SvgNode,
    parent_style: &ResolvedStyle,
    parent_ts: Transform,
    region: Region,
    state: &State,
    ctx: &mut Context,
    shapes: &mut Vec<ClipShape>,
) {
    let tag_name = match node.tag_name() {
        Some(v) => v,
        None => return,
    };

    if !tag_name.is_graphic() && tag_name != EId::G {
        return;
    }

    let style = ctx.resolver.resolve(node, Some(parent_style));
    if !recorder::is_visible_element(node, &style, state.opt) {
        return;
    }

    if style.get(AId::Visibility).map_or(false, |v| v != "visible") {
        return;
    }

    let ts = match recorder::resolve_transform(node, &style) {
        Some(v) => parent_ts.pre_concat(v),
        None => return,
    };

    match tag_name {
        EId::G if region == Region::Mask => {
            for child in node.children() {
                collect_shape(child, &style, ts, region, state, ctx, shapes);
            }
        }
        EId::Use => {
            let target = match ctx.symbols.href_target(node) {
                Some(v) => v,
                None => return,
            };

            if !matches!(
                target.tag_name(),
                Some(EId::Rect)
                    | Some(EId::Circle)
                    | Some(EId::Ellipse)
                    | Some(EId::Polyline)
                    | Some(EId::Polygon)
                    | Some(EId::Path)
            ) {
                log::warn!("'use' inside a clip region must reference a shape. Skipped.");
                return;
            }

            let x = units::convert_attr(node, AId::X, Units::UserSpaceOnUse, &style, state, Length::zero());
            let y = units::convert_attr(node, AId::Y, Units::UserSpaceOnUse, &style, state, Length::zero());
            collect_shape(target, &style, ts.pre_translate(x, y), region, state, ctx, shapes);
        }
        EId::Rect | EId::Circle | EId::Ellipse | EId::Polyline | EId::Polygon | EId::Path => {
            // A mask child without a fill does not contribute to the visible area.
            if region == Region::Mask && style.get(AId::Fill).map(str::trim) == Some("none") {
                return;
            }

            if let Some(shape) = shapes::convert(node, &style, state) {
                let rule_aid = match region {
                    Region::ClipPath => AId::ClipRule,
                    Region::Mask => AId::FillRule,
                };
                let rule: FillRule = style.parse(node, rule_aid).unwrap_or_default();
                shapes.push(ClipShape {
                    shape,
                    transform: ts,
                    rule,
                });
            }
        }
        // `line` has no fill area, `text` cannot be converted into geometry.
        _ => log::warn!("'{}' is not a valid clip region child. Skipped.", tag_name),
    }
}

/// Unites shapes into a single clip command.
///
/// A single axis-aligned rectangle becomes a `ClipRect`.
pub(crate) fn shapes_to_clip(shapes: &[ClipShape], ts: Transform) -> Option<Command> {
    if let [single] = shapes {
        let full_ts = ts.pre_concat(single.transform);
        if let Shape::Rect(rect) = single.shape {
            if is_axis_aligned(full_ts) {
                return rect.transform(full_ts).map(Command::ClipRect);
            }
        }

        let path = single.shape.to_path().as_ref().clone().transform(full_ts)?;
        return Some(Command::ClipPath {
            path: Arc::new(path),
            rule: single.rule,
        });
    }

    // Each shape is oriented clockwise before concatenation, so overlapping
    // shapes add up instead of cancelling each other under the nonzero rule.
    // Even-odd holes inside a single shape are filled.
    let mut builder = PathBuilder::new();
    for item in shapes {
        let path = match item.shape.to_path().as_ref().clone().transform(ts.pre_concat(item.transform)) {
            Some(v) => v,
            None => continue,
        };
        if signed_area(&path) < 0.0 {
            append_reversed(&mut builder, &path);
        } else {
            append_path(&mut builder, &path);
        }
    }

    Some(Command::ClipPath {
        path: Arc::new(builder.finish()?),
        rule: FillRule::NonZero,
    })
}

fn append_path(builder: &mut PathBuilder, path: &Path) {
    for seg in path.segments() {
        match seg {
            PathSegment::MoveTo(p) => builder.move_to(p.x, p.y),
            PathSegment::LineTo(p) => builder.line_to(p.x, p.y),
            PathSegment::QuadTo(p1, p) => builder.quad_to(p1.x, p1.y, p.x, p.y),
            PathSegment::CubicTo(p1, p2, p) => builder.cubic_to(p1.x, p1.y, p2.x, p2.y, p.x, p.y),
            PathSegment::Close => builder.close(),
        }
    }
}

fn signed_area(path: &Path) -> f64 {
    use kurbo::Shape as _;
    crate::hit_test::to_bez_path(path).area()
}

// Reverses the direction of every subpath, keeping their order.
fn append_reversed(builder: &mut PathBuilder, path: &Path) {
    let mut subpath: Vec<(Point, PathSegment)> = Vec::new();
    let mut start = Point::zero();
    let mut last = Point::zero();
    let mut closed = false;

    for seg in path.segments() {
        match seg {
            PathSegment::MoveTo(p) => {
                flush_reversed(builder, &mut subpath, last, closed);
                start = p;
                last = p;
                closed = false;
            }
            PathSegment::LineTo(p) | PathSegment::QuadTo(_, p) | PathSegment::CubicTo(_, _, p) => {
                subpath.push((last, seg));
                last = p;
            }
            PathSegment::Close => {
                // An implicit closing line, so the reversed subpath starts at `start`.
                if last != start {
                    subpath.push((last, PathSegment::LineTo(start)));
                    last = start;
                }
                closed = true;
            }
        }
    }

    flush_reversed(builder, &mut subpath, last, closed);
}

fn flush_reversed(
    builder: &mut PathBuilder,
    subpath: &mut Vec<(Point, PathSegment)>,
    last: Point,
    closed: bool,
) {
    if subpath.is_empty() {
        return;
    }

    builder.move_to(last.x, last.y);
    for (from, seg) in subpath.drain(..).rev() {
        match seg {
            PathSegment::LineTo(_) => builder.line_to(from.x, from.y),
            PathSegment::QuadTo(p1, _) => builder.quad_to(p1.x, p1.y, from.x, from.y),
            PathSegment::CubicTo(p1, p2, _) => builder.cubic_to(p2.x, p2.y, p1.x, p1.y, from.x, from.y),
            PathSegment::MoveTo(_) | PathSegment::Close => {}
        }
    }

    if closed {
        builder.close();
    }
}

/// Parses a `transform`-like attribute that is not a presentation property.
pub(crate) fn attr_transform(node: SvgNode, aid: AId) -> Option<Transform> {
    match node.attribute::<svgtypes::Transform>(aid) {
        Some(ts) => convert_transform(ts),
        None => Some(Transform::default()),
    }
}

#[cfg(test)]
mod tests {
    use crate::{Command, Options, Recording};

    fn clips(text: &str) -> Vec<Command> {
        let rec = Recording::from_str(text, &Options::default()).unwrap();
        rec.picture
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::ClipRect(_) | Command::ClipPath { .. }))
            .cloned()
            .collect()
    }

    #[test]
    fn single_rect_is_clip_rect() {
        let list = clips(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <clipPath id='c'><rect x='5' y='5' width='10' height='10'/></clipPath>
                <rect width='50' height='50' clip-path='url(#c)'/>
            </svg>",
        );
        assert_eq!(list.len(), 1);
        assert!(matches!(list[0], Command::ClipRect(r) if r == crate::Rect::from_xywh(5.0, 5.0, 10.0, 10.0).unwrap()));
    }

    #[test]
    fn bbox_units() {
        let list = clips(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <clipPath id='c' clipPathUnits='objectBoundingBox'>
                    <rect width='0.5' height='0.5'/>
                </clipPath>
                <rect x='10' y='10' width='40' height='40' clip-path='url(#c)'/>
            </svg>",
        );
        assert!(matches!(list[0], Command::ClipRect(r) if r == crate::Rect::from_xywh(10.0, 10.0, 20.0, 20.0).unwrap()));
    }

    #[test]
    fn empty_clip_path_hides_element() {
        let rec = Recording::from_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <clipPath id='c'/>
                <rect width='50' height='50' clip-path='url(#c)'/>
            </svg>",
            &Options::default(),
        )
        .unwrap();
        assert!(rec.picture.is_empty());
    }

    #[test]
    fn dangling_clip_path_is_ignored() {
        let rec = Recording::from_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <rect width='50' height='50' clip-path='url(#missing)'/>
            </svg>",
            &Options::default(),
        )
        .unwrap();
        assert!(!rec.picture.is_empty());
        assert!(rec
            .diagnostics
            .iter()
            .any(|d| d.code == svgtree::DiagnosticCode::DanglingReference));
    }

    #[test]
    fn multiple_children_are_united() {
        let list = clips(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <clipPath id='c'>
                    <rect width='5' height='5'/>
                    <circle cx='20' cy='20' r='5'/>
                </clipPath>
                <rect width='50' height='50' clip-path='url(#c)'/>
            </svg>",
        );
        assert_eq!(list.len(), 1);
        assert!(matches!(list[0], Command::ClipPath { rule: crate::FillRule::NonZero, .. }));
    }

    #[test]
    fn self_referencing_clip_path() {
        let rec = Recording::from_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <clipPath id='c' clip-path='url(#c)'><rect width='5' height='5'/></clipPath>
                <rect width='50' height='50' clip-path='url(#c)'/>
            </svg>",
            &Options::default(),
        )
        .unwrap();
        assert!(rec.picture.is_empty());
        let cycles = rec
            .diagnostics
            .iter()
            .filter(|d| d.code == svgtree::DiagnosticCode::ReferenceCycle)
            .count();
        assert_eq!(cycles, 1);
    }

    #[test]
    fn overlapping_children_with_opposite_winding() {
        let text = "<svg xmlns='http://www.w3.org/2000/svg' width='50' height='50'>
            <clipPath id='c'>
                <rect width='20' height='20'/>
                <path d='M5 5 L5 15 L15 15 L15 5 Z'/>
            </clipPath>
            <rect id='t' width='50' height='50' clip-path='url(#c)'/>
        </svg>";

        let rec = Recording::from_str(text, &Options::default()).unwrap();
        let hits: Vec<_> = crate::hit_test(&rec.picture, crate::Point::from_xy(10.0, 10.0))
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(hits, vec!["t"]);

        assert!(crate::hit_test(&rec.picture, crate::Point::from_xy(30.0, 30.0)).is_empty());
    }

    #[test]
    fn reversed_subpaths() {
        let mut pb = crate::PathBuilder::new();
        pb.move_to(0.0, 0.0);
        pb.line_to(0.0, 10.0);
        pb.line_to(10.0, 10.0);
        pb.close();
        pb.move_to(20.0, 0.0);
        pb.cubic_to(20.0, 5.0, 25.0, 10.0, 30.0, 10.0);
        let path = pb.finish().unwrap();

        let mut builder = crate::PathBuilder::new();
        super::append_reversed(&mut builder, &path);
        let reversed = builder.finish().unwrap();

        assert_eq!(reversed.bounds(), path.bounds());
        assert!((super::signed_area(&reversed) + super::signed_area(&path)).abs() < 1e-6);

        let points: Vec<_> = reversed.points().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(
            points,
            vec![
                (0.0, 0.0),
                (10.0, 10.0),
                (0.0, 10.0),
                (0.0, 0.0),
                (30.0, 10.0),
                (25.0, 10.0),
                (20.0, 5.0),
                (20.0, 0.0),
            ]
        );
    }
}
