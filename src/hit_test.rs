// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use kurbo::Shape;
use tiny_skia_path::PathSegment;

use crate::geom::map_inverted;
use crate::{Command, ElementRef, FillRule, Path, PathCommand, Picture, Point, Rect, Transform};

enum ClipShape {
    Rect(Rect),
    Path(Arc<Path>, FillRule),
}

struct Clip {
    shape: ClipShape,
    ts: Transform,
}

struct Scope {
    ts: Transform,
    clips: usize,
}

/// Returns elements whose geometry contains `point`.
///
/// `point` is in the picture coordinates. Elements are returned front-to-back,
/// i.e. the topmost one goes first, and each element is listed once. Clipping is honored, fill and stroke
/// opacity are not.
pub fn hit_test(picture: &Picture, point: Point) -> Vec<&ElementRef> {
    let mut ts = Transform::default();
    let mut clips: Vec<Clip> = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut hits = Vec::new();

    for cmd in picture.commands() {
        match cmd {
            Command::Save | Command::SaveLayer { .. } => scopes.push(Scope {
                ts,
                clips: clips.len(),
            }),
            Command::Restore => {
                if let Some(scope) = scopes.pop() {
                    ts = scope.ts;
                    clips.truncate(scope.clips);
                }
            }
            Command::ClipRect(rect) => clips.push(Clip {
                shape: ClipShape::Rect(*rect),
                ts,
            }),
            Command::ClipPath { path, rule } => clips.push(Clip {
                shape: ClipShape::Path(path.clone(), *rule),
                ts,
            }),
            Command::SetTransform(t) => ts = ts.pre_concat(*t),
            _ => {
                let element = match cmd.element() {
                    Some(v) => v,
                    None => continue,
                };

                if !clips.iter().all(|c| clip_contains(c, point)) {
                    continue;
                }

                let local = match map_inverted(ts, point) {
                    Some(v) => v,
                    None => continue,
                };

                if draw_contains(cmd, local) {
                    hits.push(element);
                }
            }
        }
    }

    // An element can produce several draw commands, like with `paint-order`.
    let mut unique: Vec<&ElementRef> = Vec::with_capacity(hits.len());
    for element in hits.into_iter().rev() {
        if !unique.contains(&element) {
            unique.push(element);
        }
    }

    unique
}

fn clip_contains(clip: &Clip, point: Point) -> bool {
    let local = match map_inverted(clip.ts, point) {
        Some(v) => v,
        None => return false,
    };

    match clip.shape {
        ClipShape::Rect(rect) => rect_contains(rect, local),
        ClipShape::Path(ref path, rule) => fill_contains(path, rule, local),
    }
}

fn draw_contains(cmd: &Command, point: Point) -> bool {
    match cmd {
        Command::DrawPath(ref path) => path_contains(path, point),
        Command::DrawImage(ref image) => rect_contains(image.dst.to_rect(), point),
        Command::DrawText(ref text) => text
            .bounds()
            .map(|r| rect_contains(r, point))
            .unwrap_or(false),
        _ => false,
    }
}

fn path_contains(cmd: &PathCommand, point: Point) -> bool {
    if let Some(ref fill) = cmd.fill {
        if fill_contains(&cmd.path, fill.rule, point) {
            return true;
        }
    }

    if let Some(ref stroke) = cmd.stroke {
        if let Some(outline) = cmd.path.stroke(&stroke.to_tiny_skia(), 1.0) {
            if fill_contains(&outline, FillRule::NonZero, point) {
                return true;
            }
        }
    }

    false
}

fn rect_contains(rect: Rect, p: Point) -> bool {
    p.x >= rect.left() && p.x <= rect.right() && p.y >= rect.top() && p.y <= rect.bottom()
}

fn fill_contains(path: &Path, rule: FillRule, p: Point) -> bool {
    // A quick rejection, since winding calculation is not free.
    if !rect_contains(path.bounds(), p) {
        return false;
    }

    let winding = to_bez_path(path).winding(kurbo::Point::new(p.x as f64, p.y as f64));
    match rule {
        FillRule::NonZero => winding != 0,
        FillRule::EvenOdd => winding % 2 != 0,
    }
}

pub(crate) fn to_bez_path(path: &Path) -> kurbo::BezPath {
    let pt = |p: tiny_skia_path::Point| kurbo::Point::new(p.x as f64, p.y as f64);

    let mut bez = kurbo::BezPath::new();
    let mut is_open = false;
    for seg in path.segments() {
        match seg {
            PathSegment::MoveTo(p) => {
                if is_open {
                    bez.close_path();
                }
                bez.move_to(pt(p));
                is_open = true;
            }
            PathSegment::LineTo(p) => bez.line_to(pt(p)),
            PathSegment::QuadTo(p1, p) => bez.quad_to(pt(p1), pt(p)),
            PathSegment::CubicTo(p1, p2, p) => bez.curve_to(pt(p1), pt(p2), pt(p)),
            PathSegment::Close => {
                bez.close_path();
                is_open = false;
            }
        }
    }

    // Fills implicitly close open subpaths.
    if is_open {
        bez.close_path();
    }

    bez
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathBuilder;

    #[test]
    fn even_odd() {
        let mut pb = PathBuilder::new();
        pb.push_rect(Rect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap());
        pb.push_rect(Rect::from_xywh(2.0, 2.0, 6.0, 6.0).unwrap());
        let path = pb.finish().unwrap();

        let center = Point::from_xy(5.0, 5.0);
        let edge = Point::from_xy(1.0, 1.0);
        assert!(fill_contains(&path, FillRule::NonZero, center));
        assert!(!fill_contains(&path, FillRule::EvenOdd, center));
        assert!(fill_contains(&path, FillRule::EvenOdd, edge));
        assert!(!fill_contains(&path, FillRule::NonZero, Point::from_xy(11.0, 5.0)));
    }

    fn hits(text: &str, x: f32, y: f32) -> Vec<String> {
        let picture = Picture::from_str(text, &crate::Options::default()).unwrap();
        hit_test(&picture, Point::from_xy(x, y))
            .into_iter()
            .map(|e| e.id.clone())
            .collect()
    }

    #[test]
    fn paint_order_element_is_listed_once() {
        let text = "<svg xmlns='http://www.w3.org/2000/svg' width='100' height='100'>
            <rect id='r' x='10' y='10' width='20' height='20' stroke='black' stroke-width='4' paint-order='stroke'/>
        </svg>";

        assert_eq!(hits(text, 10.0, 20.0), vec!["r"]);
        assert_eq!(hits(text, 20.0, 20.0), vec!["r"]);
    }
}
