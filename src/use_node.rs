// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use strict_num::ApproxEqUlps;
use svgtree::{AId, DiagnosticCode, EId, SvgNode};
use svgtypes::{Length, LengthUnit};

use crate::picture::is_draw;
use crate::recorder::{self, Context, State};
use crate::{
    units, Command, IsValidLength, NonZeroRect, Rect, ResolvedStyle, Size, Transform, Units,
    ViewBox,
};

/// Records a `use` element content.
///
/// The referenced element is recorded as if it was a child of the `use` element,
/// so it inherits the `use` style. The shared tree is never modified.
pub(crate) fn convert(
    node: SvgNode,
    style: &ResolvedStyle,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) -> Option<()> {
    let target = match ctx.symbols.href_target(node) {
        Some(v) => v,
        None => {
            if let Some(href) = node.attribute_value(AId::Href) {
                ctx.report(
                    DiagnosticCode::DanglingReference,
                    format!("'{}' does not reference an element", href),
                    node,
                );
            }

            return None;
        }
    };

    let target_id = target.id();
    if let Some(idx) = ctx.use_chain.iter().position(|id| *id == target_id) {
        let members = ctx.use_chain[idx..].to_vec();
        ctx.report_cycle(
            &members,
            format!("'use' of '#{}' creates a reference cycle", target.element_id()),
            node,
        );
        return None;
    }

    // `use` inside its own target.
    if target.is_ancestor_of(node) {
        ctx.report_cycle(
            &[target_id],
            format!("'use' of '#{}' references its own ancestor", target.element_id()),
            node,
        );
        return None;
    }

    if !ctx.take_instance(node) {
        return None;
    }

    ctx.use_chain.push(target_id);
    let res = convert_target(node, target, style, state, ctx, out);
    ctx.use_chain.pop();
    res
}

fn convert_target(
    node: SvgNode,
    target: SvgNode,
    style: &ResolvedStyle,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) -> Option<()> {
    let x = units::convert_attr(node, AId::X, Units::UserSpaceOnUse, style, state, Length::zero());
    let y = units::convert_attr(node, AId::Y, Units::UserSpaceOnUse, style, state, Length::zero());
    let mut ts = Transform::from_translate(x, y);

    let mut body = Vec::new();
    let mut clip = None;
    match target.tag_name() {
        Some(EId::Symbol) => {
            let symbol_style = ctx.resolver.resolve(target, Some(style));
            if let Some(vb_ts) = viewbox_transform(node, target, style, state) {
                ts = ts.pre_concat(vb_ts);
            }

            clip = get_clip_rect(node, &symbol_style, style, state);
            recorder::record_children(target, &symbol_style, state, ctx, &mut body);
        }
        Some(EId::Svg) => {
            // When a `use` element references a `svg` element,
            // we have to remember `use` element size and use it
            // instead of `svg` element size.
            //
            // The size is reset by each `use`, so nested `use` elements
            // do not accumulate their sizes.
            let def = Length::new(100.0, LengthUnit::Percent);
            let mut svg_state = *state;
            svg_state.use_size = (None, None);

            // Width and height can be set independently.
            if node.has_attribute(AId::Width) {
                svg_state.use_size.0 = Some(units::convert_user_length(
                    node.attribute(AId::Width).unwrap_or(def),
                    AId::Width,
                    style,
                    state,
                ));
            }
            if node.has_attribute(AId::Height) {
                svg_state.use_size.1 = Some(units::convert_user_length(
                    node.attribute(AId::Height).unwrap_or(def),
                    AId::Height,
                    style,
                    state,
                ));
            }

            recorder::record_element(target, style, &svg_state, ctx, &mut body);
        }
        _ => {
            recorder::record_element(target, style, state, ctx, &mut body);
        }
    }

    push_viewport(clip, ts, body, out);
    Some(())
}

/// Records a nested `svg` element.
///
/// Establishes a new viewport: `x`/`y` translation, `viewBox` mapping and
/// an optional viewport clip.
pub(crate) fn convert_svg(
    node: SvgNode,
    style: &ResolvedStyle,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) {
    let x = units::convert_attr(node, AId::X, Units::UserSpaceOnUse, style, state, Length::zero());
    let y = units::convert_attr(node, AId::Y, Units::UserSpaceOnUse, style, state, Length::zero());
    let mut ts = Transform::from_translate(x, y);
    if let Some(vb_ts) = viewbox_transform(node, node, style, state) {
        ts = ts.pre_concat(vb_ts);
    }

    let clip = get_clip_rect(node, style, style, state);

    // Children percentages are resolved against the new viewport.
    // Note that `State::size` is a completely different property and stays the same.
    let mut new_state = *state;
    new_state.view_box = match recorder::get_view_box(node) {
        Some(vb) => vb,
        None => {
            // No `viewBox` attribute? Then use `x`, `y`, `width` and `height` instead.
            let (w, h) = use_node_size(node, style, state);
            NonZeroRect::from_xywh(x, y, w, h).unwrap_or(state.view_box)
        }
    };
    new_state.use_size = (None, None);

    let mut body = Vec::new();
    recorder::record_children(node, style, &new_state, ctx, &mut body);
    push_viewport(clip, ts, body, out);
}

/// Wraps viewport content into its own scope.
///
/// The clip is in the outer coordinates, so it goes before the transform.
fn push_viewport(clip: Option<Rect>, ts: Transform, body: Vec<Command>, out: &mut Vec<Command>) {
    if !body.iter().any(is_draw) {
        return;
    }

    if clip.is_none() && ts.is_identity() {
        out.extend(body);
        return;
    }

    out.push(Command::Save);
    if let Some(rect) = clip {
        out.push(Command::ClipRect(rect));
    }
    if !ts.is_identity() {
        out.push(Command::SetTransform(ts));
    }
    out.extend(body);
    out.push(Command::Restore);
}

/// Returns a viewport clip of a `symbol` or a nested `svg`.
///
/// `viewport_style` belongs to the element that defines `overflow`,
/// `style` to the element that defines the viewport rectangle.
fn get_clip_rect(
    node: SvgNode,
    viewport_style: &ResolvedStyle,
    style: &ResolvedStyle,
    state: &State,
) -> Option<Rect> {
    // No need to clip elements with overflow:visible.
    if matches!(viewport_style.get(AId::Overflow), Some("visible") | Some("auto")) {
        return None;
    }

    let is_svg = node.tag_name() == Some(EId::Svg);

    // A nested `svg` with only the `viewBox` attribute and no "rectangle" (x, y, width, height)
    // should not be clipped. A nested `svg` referenced by `use` still should be clipped,
    // but by `use` bounds.
    if is_svg
        && state.use_size.0.is_none()
        && state.use_size.1.is_none()
        && !(node.has_attribute(AId::Width) && node.has_attribute(AId::Height))
    {
        return None;
    }

    let x = units::convert_attr(node, AId::X, Units::UserSpaceOnUse, style, state, Length::zero());
    let y = units::convert_attr(node, AId::Y, Units::UserSpaceOnUse, style, state, Length::zero());
    let (w, h) = use_node_size(node, style, state);

    if !w.is_valid_length() || !h.is_valid_length() {
        return None;
    }

    // Clip rect is not needed when it has the same size as a whole image.
    if w.approx_eq_ulps(&state.size.width(), 4) && h.approx_eq_ulps(&state.size.height(), 4) {
        return None;
    }

    Rect::from_xywh(x, y, w, h)
}

/// Returns the viewport size.
///
/// For a nested `svg`, `width` and `height` set on the referencing `use`
/// override the element's own ones.
fn use_node_size(node: SvgNode, style: &ResolvedStyle, state: &State) -> (f32, f32) {
    let def = Length::new(100.0, LengthUnit::Percent);
    let mut w = units::convert_attr(node, AId::Width, Units::UserSpaceOnUse, style, state, def);
    let mut h = units::convert_attr(node, AId::Height, Units::UserSpaceOnUse, style, state, def);

    if node.tag_name() == Some(EId::Svg) {
        w = state.use_size.0.unwrap_or(w);
        h = state.use_size.1.unwrap_or(h);
    }

    (w, h)
}

fn viewbox_transform(
    node: SvgNode,
    linked: SvgNode,
    style: &ResolvedStyle,
    state: &State,
) -> Option<Transform> {
    let (w, h) = use_node_size(node, style, state);
    let size = Size::from_wh(w, h)?;
    let view_box = ViewBox {
        rect: recorder::get_view_box(linked)?,
        aspect: linked.attribute(AId::PreserveAspectRatio).unwrap_or_default(),
    };

    Some(view_box.to_transform(size))
}

#[cfg(test)]
mod tests {
    use crate::{Command, Options, Rect, Recording, Transform};
    use svgtree::DiagnosticCode;

    fn record(text: &str) -> Recording {
        Recording::from_str(text, &Options::default()).unwrap()
    }

    fn cycles(rec: &Recording) -> usize {
        rec.diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::ReferenceCycle)
            .count()
    }

    #[test]
    fn translate_before_target_transform() {
        let rec = record(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <defs><rect id='r' width='5' height='5' transform='scale(2)'/></defs>
                <use xlink:href='#r' x='10' y='20'/>
            </svg>",
        );
        let transforms: Vec<_> = rec
            .picture
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::SetTransform(ts) => Some(*ts),
                _ => None,
            })
            .collect();
        assert_eq!(
            transforms,
            [Transform::from_translate(10.0, 20.0), Transform::from_scale(2.0, 2.0)]
        );
    }

    #[test]
    fn inherits_use_style() {
        let rec = record(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <defs><rect id='r' width='5' height='5'/></defs>
                <use xlink:href='#r' fill='#00ff00'/>
            </svg>",
        );
        let fill = rec
            .picture
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::DrawPath(p) => p.fill.clone(),
                _ => None,
            })
            .unwrap();
        assert_eq!(fill.paint, crate::Paint::Color(crate::Color::new_rgb(0, 255, 0)));
    }

    #[test]
    fn symbol_viewport() {
        let rec = record(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'
                  width='200' height='200'>
                <symbol id='s' viewBox='0 0 10 10'><rect width='10' height='10'/></symbol>
                <use xlink:href='#s' x='5' y='5' width='20' height='20'/>
            </svg>",
        );
        let commands = rec.picture.commands();
        let clip = commands.iter().find_map(|c| match c {
            Command::ClipRect(r) => Some(*r),
            _ => None,
        });
        assert_eq!(clip, Rect::from_xywh(5.0, 5.0, 20.0, 20.0));
        assert!(commands.iter().any(|c| matches!(
            c,
            Command::SetTransform(ts) if *ts == Transform::from_row(2.0, 0.0, 0.0, 2.0, 5.0, 5.0)
        )));
    }

    #[test]
    fn mutual_recursion() {
        let rec = record(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <g id='a'><rect width='5' height='5'/><use xlink:href='#b'/></g>
                <g id='b'><use xlink:href='#a'/></g>
            </svg>",
        );
        assert_eq!(cycles(&rec), 1);
        assert!(!rec.picture.is_empty());
    }

    #[test]
    fn self_reference() {
        let rec = record(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <g id='g'><use xlink:href='#g'/></g>
            </svg>",
        );
        assert_eq!(cycles(&rec), 1);
        assert!(rec.picture.is_empty());
    }

    #[test]
    fn dangling() {
        let rec = record(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <use xlink:href='#missing'/>
            </svg>",
        );
        assert!(rec
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::DanglingReference));
    }

    #[test]
    fn exponential_expansion_is_limited() {
        let mut text = String::from(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <rect id='l0' width='1' height='1'/>",
        );
        for i in 1..20 {
            text.push_str(&format!(
                "<g id='l{0}'><use xlink:href='#l{1}'/><use xlink:href='#l{1}'/></g>",
                i,
                i - 1
            ));
        }
        text.push_str("</svg>");

        let rec = record(&text);
        let limits = rec
            .diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::InstanceLimit)
            .count();
        assert_eq!(limits, 1);
    }
}
