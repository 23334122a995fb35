// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use strict_num::ApproxEqUlps;
use svgtree::{AId, EId, SvgNode};
use svgtypes::Length;
use tiny_skia_path::{Path, PathBuilder};

use crate::recorder::State;
use crate::{units, IsValidLength, Rect, ResolvedStyle, Units};

/// A shape geometry.
pub(crate) enum Shape {
    /// A plain rectangle, without rounded corners.
    Rect(Rect),
    Path(Arc<Path>),
}

impl Shape {
    pub fn to_path(&self) -> Arc<Path> {
        match self {
            Shape::Rect(rect) => Arc::new(PathBuilder::from_rect(*rect)),
            Shape::Path(ref path) => path.clone(),
        }
    }
}

pub(crate) fn convert(node: SvgNode, style: &ResolvedStyle, state: &State) -> Option<Shape> {
    match node.tag_name()? {
        EId::Rect => convert_rect(node, style, state),
        EId::Circle => convert_circle(node, style, state).map(Shape::Path),
        EId::Ellipse => convert_ellipse(node, style, state).map(Shape::Path),
        EId::Line => convert_line(node, style, state).map(Shape::Path),
        EId::Polyline => convert_polyline(node).map(Shape::Path),
        EId::Polygon => convert_polygon(node).map(Shape::Path),
        EId::Path => convert_path(node).map(Shape::Path),
        _ => None,
    }
}

pub(crate) fn convert_path(node: SvgNode) -> Option<Arc<Path>> {
    let value = node.attribute_value(AId::D)?;
    let mut builder = PathBuilder::new();
    for segment in svgtypes::SimplifyingPathParser::from(value.as_ref()) {
        let segment = match segment {
            Ok(v) => v,
            Err(_) => break,
        };

        match segment {
            svgtypes::SimplePathSegment::MoveTo { x, y } => {
                builder.move_to(x as f32, y as f32);
            }
            svgtypes::SimplePathSegment::LineTo { x, y } => {
                builder.line_to(x as f32, y as f32);
            }
            svgtypes::SimplePathSegment::Quadratic { x1, y1, x, y } => {
                builder.quad_to(x1 as f32, y1 as f32, x as f32, y as f32);
            }
            svgtypes::SimplePathSegment::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                builder.cubic_to(
                    x1 as f32, y1 as f32, x2 as f32, y2 as f32, x as f32, y as f32,
                );
            }
            svgtypes::SimplePathSegment::ClosePath => {
                builder.close();
            }
        }
    }

    builder.finish().map(Arc::new)
}

fn length(node: SvgNode, aid: AId, style: &ResolvedStyle, state: &State) -> f32 {
    units::convert_attr(node, aid, Units::UserSpaceOnUse, style, state, Length::zero())
}

fn convert_rect(node: SvgNode, style: &ResolvedStyle, state: &State) -> Option<Shape> {
    // 'width' and 'height' attributes must be positive and non-zero.
    let width = length(node, AId::Width, style, state);
    let height = length(node, AId::Height, style, state);
    if !width.is_valid_length() {
        log::warn!(
            "Rect '{}' has an invalid 'width' value. Skipped.",
            node.element_id()
        );
        return None;
    }
    if !height.is_valid_length() {
        log::warn!(
            "Rect '{}' has an invalid 'height' value. Skipped.",
            node.element_id()
        );
        return None;
    }

    let x = length(node, AId::X, style, state);
    let y = length(node, AId::Y, style, state);

    let (mut rx, mut ry) = resolve_rx_ry(node, style, state);

    // Clamp rx/ry to the half of the width/height.
    //
    // Should be done only after resolving.
    if rx > width / 2.0 {
        rx = width / 2.0;
    }
    if ry > height / 2.0 {
        ry = height / 2.0;
    }

    if rx.approx_eq_ulps(&0.0, 4) || ry.approx_eq_ulps(&0.0, 4) {
        return Rect::from_xywh(x, y, width, height).map(Shape::Rect);
    }

    let mut builder = PathBuilder::new();
    builder.move_to(x + rx, y);

    builder.line_to(x + width - rx, y);
    builder.arc_to(rx, ry, 0.0, false, true, x + width, y + ry);

    builder.line_to(x + width, y + height - ry);
    builder.arc_to(rx, ry, 0.0, false, true, x + width - rx, y + height);

    builder.line_to(x + rx, y + height);
    builder.arc_to(rx, ry, 0.0, false, true, x, y + height - ry);

    builder.line_to(x, y + ry);
    builder.arc_to(rx, ry, 0.0, false, true, x + rx, y);

    builder.close();

    builder.finish().map(|p| Shape::Path(Arc::new(p)))
}

// `rx` and `ry` mirror each other when only one is set.
fn resolve_rx_ry(node: SvgNode, style: &ResolvedStyle, state: &State) -> (f32, f32) {
    let mut rx_opt = node.attribute::<Length>(AId::Rx);
    let mut ry_opt = node.attribute::<Length>(AId::Ry);

    // Remove negative values first.
    if let Some(v) = rx_opt {
        if v.number.is_sign_negative() {
            rx_opt = None;
        }
    }
    if let Some(v) = ry_opt {
        if v.number.is_sign_negative() {
            ry_opt = None;
        }
    }

    match (rx_opt, ry_opt) {
        (None, None) => (0.0, 0.0),
        (Some(rx), None) => {
            let rx = units::convert_user_length(rx, AId::Rx, style, state);
            (rx, rx)
        }
        (None, Some(ry)) => {
            let ry = units::convert_user_length(ry, AId::Ry, style, state);
            (ry, ry)
        }
        (Some(rx), Some(ry)) => {
            let rx = units::convert_user_length(rx, AId::Rx, style, state);
            let ry = units::convert_user_length(ry, AId::Ry, style, state);
            (rx, ry)
        }
    }
}

fn convert_line(node: SvgNode, style: &ResolvedStyle, state: &State) -> Option<Arc<Path>> {
    let x1 = length(node, AId::X1, style, state);
    let y1 = length(node, AId::Y1, style, state);
    let x2 = length(node, AId::X2, style, state);
    let y2 = length(node, AId::Y2, style, state);

    let mut builder = PathBuilder::new();
    builder.move_to(x1, y1);
    builder.line_to(x2, y2);
    builder.finish().map(Arc::new)
}

fn convert_polyline(node: SvgNode) -> Option<Arc<Path>> {
    let builder = points_to_path(node, "Polyline")?;
    builder.finish().map(Arc::new)
}

fn convert_polygon(node: SvgNode) -> Option<Arc<Path>> {
    let mut builder = points_to_path(node, "Polygon")?;
    builder.close();
    builder.finish().map(Arc::new)
}

fn points_to_path(node: SvgNode, eid: &str) -> Option<PathBuilder> {
    use svgtypes::PointsParser;

    let mut builder = PathBuilder::new();
    match node.attribute_value(AId::Points) {
        Some(text) => {
            for (x, y) in PointsParser::from(text.as_ref()) {
                if builder.is_empty() {
                    builder.move_to(x as f32, y as f32);
                } else {
                    builder.line_to(x as f32, y as f32);
                }
            }
        }
        _ => {
            log::warn!(
                "{} '{}' has an invalid 'points' value. Skipped.",
                eid,
                node.element_id()
            );
            return None;
        }
    };

    // 'polyline' and 'polygon' elements must contain at least 2 points.
    if builder.len() < 2 {
        log::warn!(
            "{} '{}' has less than 2 points. Skipped.",
            eid,
            node.element_id()
        );
        return None;
    }

    Some(builder)
}

fn convert_circle(node: SvgNode, style: &ResolvedStyle, state: &State) -> Option<Arc<Path>> {
    let cx = length(node, AId::Cx, style, state);
    let cy = length(node, AId::Cy, style, state);
    let r = length(node, AId::R, style, state);

    if !r.is_valid_length() {
        log::warn!(
            "Circle '{}' has an invalid 'r' value. Skipped.",
            node.element_id()
        );
        return None;
    }

    ellipse_to_path(cx, cy, r, r)
}

fn convert_ellipse(node: SvgNode, style: &ResolvedStyle, state: &State) -> Option<Arc<Path>> {
    let cx = length(node, AId::Cx, style, state);
    let cy = length(node, AId::Cy, style, state);
    let (rx, ry) = resolve_rx_ry(node, style, state);

    if !rx.is_valid_length() {
        log::warn!(
            "Ellipse '{}' has an invalid 'rx' value. Skipped.",
            node.element_id()
        );
        return None;
    }

    if !ry.is_valid_length() {
        log::warn!(
            "Ellipse '{}' has an invalid 'ry' value. Skipped.",
            node.element_id()
        );
        return None;
    }

    ellipse_to_path(cx, cy, rx, ry)
}

fn ellipse_to_path(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Arc<Path>> {
    let mut builder = PathBuilder::new();
    builder.move_to(cx + rx, cy);
    builder.arc_to(rx, ry, 0.0, false, true, cx, cy + ry);
    builder.arc_to(rx, ry, 0.0, false, true, cx - rx, cy);
    builder.arc_to(rx, ry, 0.0, false, true, cx, cy - ry);
    builder.arc_to(rx, ry, 0.0, false, true, cx + rx, cy);
    builder.close();
    builder.finish().map(Arc::new)
}

trait PathBuilderExt {
    #[allow(clippy::too_many_arguments)]
    fn arc_to(
        &mut self,
        rx: f32,
        ry: f32,
        x_axis_rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    );
}

impl PathBuilderExt for PathBuilder {
    fn arc_to(
        &mut self,
        rx: f32,
        ry: f32,
        x_axis_rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    ) {
        let prev = match self.last_point() {
            Some(v) => v,
            None => return,
        };

        let svg_arc = kurbo::SvgArc {
            from: kurbo::Point::new(prev.x as f64, prev.y as f64),
            to: kurbo::Point::new(x as f64, y as f64),
            radii: kurbo::Vec2::new(rx as f64, ry as f64),
            x_rotation: (x_axis_rotation as f64).to_radians(),
            large_arc,
            sweep,
        };

        match kurbo::Arc::from_svg_arc(&svg_arc) {
            Some(arc) => {
                arc.to_cubic_beziers(0.1, |p1, p2, p| {
                    self.cubic_to(
                        p1.x as f32,
                        p1.y as f32,
                        p2.x as f32,
                        p2.y as f32,
                        p.x as f32,
                        p.y as f32,
                    );
                });
            }
            None => {
                self.line_to(x, y);
            }
        }
    }
}
