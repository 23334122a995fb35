// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use strict_num::ApproxEqUlps;
use svgtypes::{Align, AspectRatio};
pub use tiny_skia_path::{NonZeroRect, Path, PathBuilder, Point, Rect, Size, Transform};

/// Approximate zero equality comparisons.
pub trait ApproxZeroUlps: ApproxEqUlps {
    /// Checks if the number is approximately zero.
    fn approx_zero_ulps(&self, ulps: <Self::Flt as strict_num::Ulps>::U) -> bool;
}

impl ApproxZeroUlps for f32 {
    fn approx_zero_ulps(&self, ulps: i32) -> bool {
        self.approx_eq_ulps(&0.0, ulps)
    }
}

/// Checks that the current number is > 0.
pub trait IsValidLength {
    /// Checks that the current number is > 0.
    fn is_valid_length(&self) -> bool;
}

impl IsValidLength for f32 {
    #[inline]
    fn is_valid_length(&self) -> bool {
        *self > 0.0 && self.is_finite()
    }
}

/// View box.
#[derive(Clone, Copy, Debug)]
pub struct ViewBox {
    /// Value of the `viewBox` attribute.
    pub rect: NonZeroRect,

    /// Value of the `preserveAspectRatio` attribute.
    pub aspect: AspectRatio,
}

impl ViewBox {
    /// Converts `viewBox` into a transform that maps it onto a viewport of `size`.
    pub fn to_transform(&self, size: Size) -> Transform {
        view_box_to_transform(self.rect, self.aspect, size)
    }
}

/// A bounding box calculator.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BBox {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl From<Rect> for BBox {
    fn from(r: Rect) -> Self {
        Self {
            left: r.left(),
            top: r.top(),
            right: r.right(),
            bottom: r.bottom(),
        }
    }
}

impl From<NonZeroRect> for BBox {
    fn from(r: NonZeroRect) -> Self {
        Self {
            left: r.left(),
            top: r.top(),
            right: r.right(),
            bottom: r.bottom(),
        }
    }
}

impl Default for BBox {
    fn default() -> Self {
        Self {
            left: f32::MAX,
            top: f32::MAX,
            right: f32::MIN,
            bottom: f32::MIN,
        }
    }
}

impl BBox {
    /// Checks if the bounding box is default, i.e. invalid.
    pub fn is_default(&self) -> bool {
        self.left == f32::MAX
            && self.top == f32::MAX
            && self.right == f32::MIN
            && self.bottom == f32::MIN
    }

    /// Expand the bounding box to the specified bounds.
    #[must_use]
    pub fn expand(&self, r: impl Into<Self>) -> Self {
        self.expand_impl(r.into())
    }

    fn expand_impl(&self, r: Self) -> Self {
        Self {
            left: self.left.min(r.left),
            top: self.top.min(r.top),
            right: self.right.max(r.right),
            bottom: self.bottom.max(r.bottom),
        }
    }

    /// Transforms the bounding box.
    pub fn transform(&self, ts: Transform) -> Option<Self> {
        self.to_rect()?.transform(ts).map(Self::from)
    }

    /// Converts a bounding box into [`Rect`].
    pub fn to_rect(&self) -> Option<Rect> {
        if !self.is_default() {
            Rect::from_ltrb(self.left, self.top, self.right, self.bottom)
        } else {
            None
        }
    }

    /// Converts a bounding box into [`NonZeroRect`].
    pub fn to_non_zero_rect(&self) -> Option<NonZeroRect> {
        if !self.is_default() {
            NonZeroRect::from_ltrb(self.left, self.top, self.right, self.bottom)
        } else {
            None
        }
    }
}

/// Converts `viewBox` to `Transform`.
pub fn view_box_to_transform(view_box: NonZeroRect, aspect: AspectRatio, img_size: Size) -> Transform {
    let vr = view_box;

    let sx = img_size.width() / vr.width();
    let sy = img_size.height() / vr.height();

    let (sx, sy) = if aspect.align == Align::None {
        (sx, sy)
    } else {
        let s = if aspect.slice {
            sx.max(sy)
        } else {
            sx.min(sy)
        };

        (s, s)
    };

    let x = -vr.x() * sx;
    let y = -vr.y() * sy;
    let w = img_size.width() - vr.width() * sx;
    let h = img_size.height() - vr.height() * sy;

    let (tx, ty) = aligned_pos(aspect.align, x, y, w, h);
    Transform::from_row(sx, 0.0, 0.0, sy, tx, ty)
}

/// Returns object aligned position.
pub fn aligned_pos(align: Align, x: f32, y: f32, w: f32, h: f32) -> (f32, f32) {
    match align {
        Align::None => (x, y),
        Align::XMinYMin => (x, y),
        Align::XMidYMin => (x + w / 2.0, y),
        Align::XMaxYMin => (x + w, y),
        Align::XMinYMid => (x, y + h / 2.0),
        Align::XMidYMid => (x + w / 2.0, y + h / 2.0),
        Align::XMaxYMid => (x + w, y + h / 2.0),
        Align::XMinYMax => (x, y + h),
        Align::XMidYMax => (x + w / 2.0, y + h),
        Align::XMaxYMax => (x + w, y + h),
    }
}

/// Fits `size` into a viewport `rect` according to `aspect`.
///
/// Returns the placed rect, which can be bigger than the viewport when `slice` is set.
pub(crate) fn fit_view_box(size: Size, rect: NonZeroRect, aspect: AspectRatio) -> Option<NonZeroRect> {
    if aspect.align == Align::None {
        return Some(rect);
    }

    let new_size = size_scale(size, rect.size(), aspect.slice)?;
    let (x, y) = aligned_pos(
        aspect.align,
        rect.x(),
        rect.y(),
        rect.width() - new_size.width(),
        rect.height() - new_size.height(),
    );

    Some(new_size.to_non_zero_rect(x, y))
}

fn size_scale(s1: Size, s2: Size, expand: bool) -> Option<Size> {
    let rw = s2.height() * s1.width() / s1.height();
    let with_h = if expand {
        rw <= s2.width()
    } else {
        rw >= s2.width()
    };

    if !with_h {
        Size::from_wh(rw, s2.height())
    } else {
        let h = s2.width() * s1.height() / s1.width();
        Size::from_wh(s2.width(), h)
    }
}

/// Checks that the transform maps axis-aligned rectangles onto axis-aligned rectangles.
pub(crate) fn is_axis_aligned(ts: Transform) -> bool {
    ts.kx.approx_zero_ulps(4) && ts.ky.approx_zero_ulps(4)
}

/// Builds a rectangle path transformed by `ts`.
pub(crate) fn rect_path(rect: Rect, ts: Transform) -> Option<Arc<Path>> {
    PathBuilder::from_rect(rect).transform(ts).map(Arc::new)
}

/// Converts a parsed `transform` value.
///
/// Returns `None` for a non-invertible, zero-scaled or non-finite transform.
pub(crate) fn convert_transform(ts: svgtypes::Transform) -> Option<Transform> {
    let ts = Transform::from_row(
        ts.a as f32,
        ts.b as f32,
        ts.c as f32,
        ts.d as f32,
        ts.e as f32,
        ts.f as f32,
    );

    if ts.is_valid() && ts.invert().is_some() {
        Some(ts)
    } else {
        None
    }
}

/// Maps a point through an inverted transform.
pub(crate) fn map_inverted(ts: Transform, point: Point) -> Option<Point> {
    let inv = ts.invert()?;
    let mut point = point;
    inv.map_point(&mut point);
    Some(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn bbox_expand() {
        let a = BBox::from(Rect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap());
        let b = a.expand(Rect::from_xywh(5.0, -5.0, 10.0, 10.0).unwrap());
        assert_eq!(b.to_rect(), Rect::from_ltrb(0.0, -5.0, 15.0, 10.0));
        assert!(BBox::default().to_rect().is_none());
    }

    #[test]
    fn view_box_meet() {
        let vb = NonZeroRect::from_xywh(0.0, 0.0, 10.0, 20.0).unwrap();
        let size = Size::from_wh(100.0, 100.0).unwrap();
        let ts = view_box_to_transform(vb, AspectRatio::default(), size);
        assert_eq!(ts, Transform::from_row(5.0, 0.0, 0.0, 5.0, 25.0, 0.0));
    }

    #[test]
    fn view_box_none() {
        let vb = NonZeroRect::from_xywh(10.0, 10.0, 10.0, 20.0).unwrap();
        let size = Size::from_wh(100.0, 100.0).unwrap();
        let aspect = AspectRatio::from_str("none").unwrap();
        let ts = view_box_to_transform(vb, aspect, size);
        assert_eq!(ts, Transform::from_row(10.0, 0.0, 0.0, 5.0, -100.0, -50.0));
    }

    #[test]
    fn fit_slice() {
        let size = Size::from_wh(20.0, 10.0).unwrap();
        let rect = NonZeroRect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap();
        let aspect = AspectRatio::from_str("xMidYMid slice").unwrap();
        let r = fit_view_box(size, rect, aspect).unwrap();
        assert_eq!(r, NonZeroRect::from_xywh(-5.0, 0.0, 20.0, 10.0).unwrap());
    }

    #[test]
    fn degenerate_transform() {
        let ts = svgtypes::Transform::from_str("scale(0)").unwrap();
        assert!(convert_transform(ts).is_none());
        let ts = svgtypes::Transform::from_str("scale(1 0)").unwrap();
        assert!(convert_transform(ts).is_none());
        let ts = svgtypes::Transform::from_str("matrix(1 1 1 1 0 0)").unwrap();
        assert!(convert_transform(ts).is_none());
        let ts = svgtypes::Transform::from_str("translate(10 20)").unwrap();
        assert_eq!(convert_transform(ts), Some(Transform::from_translate(10.0, 20.0)));
    }

    #[test]
    fn axis_aligned() {
        assert!(is_axis_aligned(Transform::from_row(2.0, 0.0, 0.0, 3.0, 1.0, 1.0)));
        assert!(!is_axis_aligned(Transform::from_row(1.0, 0.5, 0.0, 1.0, 0.0, 0.0)));
    }
}
