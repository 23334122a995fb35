// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A [`tiny-skia`](tiny_skia) raster backend.

use crate::replay::{self, DrawingContext};
use crate::{
    BlendMode, FillRule, ImageCommand, ImageKind, ImageRendering, LinearGradient, NonZeroRect,
    Opacity, OptionLog, Paint, Path, PathBuilder, PathCommand, Pattern, Picture, RadialGradient,
    SpreadMethod, TextCommand, Transform,
};

/// Renders a picture onto a pixmap.
///
/// `transform` maps picture coordinates onto the pixmap.
pub fn render(picture: &Picture, transform: Transform, pixmap: &mut tiny_skia::Pixmap) {
    let mut canvas = Canvas::new(pixmap);
    replay::draw(picture, &mut canvas, transform);
}

fn convert_fill_rule(rule: FillRule) -> tiny_skia::FillRule {
    match rule {
        FillRule::NonZero => tiny_skia::FillRule::Winding,
        FillRule::EvenOdd => tiny_skia::FillRule::EvenOdd,
    }
}

struct Layer {
    pixmap: tiny_skia::Pixmap,
    opacity: Opacity,
    blend_mode: tiny_skia::BlendMode,
}

/// A pushed [`Canvas`] state.
pub enum CanvasState {
    /// A transform to restore.
    Transform(Transform),
    /// A clip mask to restore.
    Clip(Option<tiny_skia::Mask>),
    /// A layer to composite.
    Layer,
    /// Nothing was pushed.
    None,
}

impl std::fmt::Debug for CanvasState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CanvasState::Transform(ts) => write!(f, "CanvasState::Transform({:?})", ts),
            CanvasState::Clip(_) => f.write_str("CanvasState::Clip(..)"),
            CanvasState::Layer => f.write_str("CanvasState::Layer"),
            CanvasState::None => f.write_str("CanvasState::None"),
        }
    }
}

/// A drawing context over a `tiny_skia::Pixmap`.
///
/// The clip is kept as a pixmap-sized mask. Layers are pixmap-sized off-screen
/// buffers composited on pop.
pub struct Canvas<'a> {
    base: &'a mut tiny_skia::Pixmap,
    layers: Vec<Layer>,
    transform: Transform,
    clip: Option<tiny_skia::Mask>,
}

impl<'a> Canvas<'a> {
    /// Creates a new canvas.
    pub fn new(pixmap: &'a mut tiny_skia::Pixmap) -> Self {
        Canvas {
            base: pixmap,
            layers: Vec::new(),
            transform: Transform::default(),
            clip: None,
        }
    }

    /// Returns the current transform.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    fn target(&mut self) -> (&mut tiny_skia::Pixmap, Option<&tiny_skia::Mask>) {
        let pixmap = match self.layers.last_mut() {
            Some(layer) => &mut layer.pixmap,
            None => &mut *self.base,
        };

        (pixmap, self.clip.as_ref())
    }

    fn fill_path(&mut self, path: &Path, paint: &Paint, opacity: Opacity, rule: FillRule, anti_alias: bool, ts: Transform) {
        let (pixmap, mask) = self.target();
        with_paint(paint, opacity, anti_alias, ts, |paint| {
            pixmap.fill_path(path, paint, convert_fill_rule(rule), ts, mask);
        });
    }

    fn stroke_path(&mut self, path: &Path, paint: &Paint, opacity: Opacity, stroke: &tiny_skia::Stroke, anti_alias: bool, ts: Transform) {
        let (pixmap, mask) = self.target();
        with_paint(paint, opacity, anti_alias, ts, |paint| {
            pixmap.stroke_path(path, paint, stroke, ts, mask);
        });
    }

    fn draw_raster(&mut self, cmd: &ImageCommand, raster: &tiny_skia::Pixmap) {
        let quality = match cmd.rendering {
            ImageRendering::OptimizeQuality => tiny_skia::FilterQuality::Bicubic,
            ImageRendering::OptimizeSpeed => tiny_skia::FilterQuality::Nearest,
        };

        // Maps the source area onto the destination rectangle.
        let sx = cmd.dst.width() / cmd.src.width();
        let sy = cmd.dst.height() / cmd.src.height();
        let image_ts = Transform::from_row(
            sx,
            0.0,
            0.0,
            sy,
            cmd.dst.x() - cmd.src.x() * sx,
            cmd.dst.y() - cmd.src.y() * sy,
        );

        let mut paint = tiny_skia::Paint::default();
        paint.shader = tiny_skia::Pattern::new(
            raster.as_ref(),
            tiny_skia::SpreadMode::Pad,
            quality,
            1.0,
            image_ts,
        );

        let ts = self.transform;
        let (pixmap, mask) = self.target();
        pixmap.fill_rect(cmd.dst.to_rect(), &paint, ts, mask);
    }
}

impl std::fmt::Debug for Canvas<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.base.width())
            .field("height", &self.base.height())
            .field("layers", &self.layers.len())
            .field("transform", &self.transform)
            .finish()
    }
}

impl DrawingContext for Canvas<'_> {
    type State = CanvasState;

    fn push_clip_rect(&mut self, rect: crate::Rect) -> Self::State {
        let path = PathBuilder::from_rect(rect);
        self.push_clip_path(&path, FillRule::NonZero)
    }

    fn push_clip_path(&mut self, path: &Path, rule: FillRule) -> Self::State {
        let mask = match self.clip {
            Some(ref prev) => {
                let mut mask = prev.clone();
                mask.intersect_path(path, convert_fill_rule(rule), true, self.transform);
                mask
            }
            None => {
                let mut mask = match tiny_skia::Mask::new(self.base.width(), self.base.height()) {
                    Some(v) => v,
                    None => return CanvasState::None,
                };
                mask.fill_path(path, convert_fill_rule(rule), true, self.transform);
                mask
            }
        };

        CanvasState::Clip(std::mem::replace(&mut self.clip, Some(mask)))
    }

    fn push_transform(&mut self, transform: Transform) -> Self::State {
        let prev = self.transform;
        self.transform = self.transform.pre_concat(transform);
        CanvasState::Transform(prev)
    }

    fn push_layer(&mut self, opacity: Opacity, blend_mode: BlendMode) -> Self::State {
        let pixmap = tiny_skia::Pixmap::new(self.base.width(), self.base.height())
            .log_none(|| log::warn!("Failed to allocate a layer."));
        match pixmap {
            Some(pixmap) => {
                self.layers.push(Layer {
                    pixmap,
                    opacity,
                    blend_mode: convert_blend_mode(blend_mode),
                });
                CanvasState::Layer
            }
            None => CanvasState::None,
        }
    }

    fn pop_state(&mut self, state: Self::State) {
        match state {
            CanvasState::Transform(ts) => self.transform = ts,
            CanvasState::Clip(mask) => self.clip = mask,
            CanvasState::Layer => {
                let layer = match self.layers.pop() {
                    Some(v) => v,
                    None => return,
                };

                let paint = tiny_skia::PixmapPaint {
                    opacity: layer.opacity.get(),
                    blend_mode: layer.blend_mode,
                    quality: tiny_skia::FilterQuality::Nearest,
                };

                // Layer content is already clipped.
                let (pixmap, _) = self.target();
                pixmap.draw_pixmap(
                    0,
                    0,
                    layer.pixmap.as_ref(),
                    &paint,
                    Transform::identity(),
                    None,
                );
            }
            CanvasState::None => {}
        }
    }

    fn draw_path(&mut self, cmd: &PathCommand) {
        let ts = self.transform;
        if let Some(ref fill) = cmd.fill {
            self.fill_path(&cmd.path, &fill.paint, fill.opacity, fill.rule, cmd.anti_alias, ts);
        }

        if let Some(ref stroke) = cmd.stroke {
            let sk_stroke = stroke.to_tiny_skia();
            self.stroke_path(&cmd.path, &stroke.paint, stroke.opacity, &sk_stroke, cmd.anti_alias, ts);
        }
    }

    fn draw_image(&mut self, cmd: &ImageCommand) {
        match cmd.data.kind {
            ImageKind::SVG(ref picture) => {
                let size = picture.size();
                let ts = Transform::from_row(
                    cmd.dst.width() / size.width(),
                    0.0,
                    0.0,
                    cmd.dst.height() / size.height(),
                    cmd.dst.x(),
                    cmd.dst.y(),
                );

                let clip = self.push_clip_rect(cmd.dst.to_rect());
                replay::draw(picture, self, ts);
                self.pop_state(clip);
            }
            ImageKind::PNG(ref data) => {
                if let Ok(raster) = tiny_skia::Pixmap::decode_png(data) {
                    self.draw_raster(cmd, &raster);
                } else {
                    log::warn!("Failed to decode a PNG image.");
                }
            }
            ImageKind::JPEG(_) | ImageKind::GIF(_) | ImageKind::WEBP(_) => {
                log::warn!("Only PNG images can be rendered by the raster backend. Skipped.");
            }
        }
    }

    fn draw_text(&mut self, cmd: &TextCommand) {
        let outline = match cmd.text.outline {
            Some(ref v) => v.clone(),
            None => {
                log::debug!("Text run '{}' has no outline. Skipped.", cmd.text.text);
                return;
            }
        };

        let ts = self.transform.pre_translate(cmd.origin.x, cmd.origin.y);
        if let Some(ref fill) = cmd.fill {
            self.fill_path(&outline, &fill.paint, fill.opacity, FillRule::NonZero, true, ts);
        }

        if let Some(ref stroke) = cmd.stroke {
            let sk_stroke = stroke.to_tiny_skia();
            self.stroke_path(&outline, &stroke.paint, stroke.opacity, &sk_stroke, true, ts);
        }
    }
}

/// Builds a `tiny_skia::Paint` and passes it to `f`.
///
/// Patterns are rendered into a temporary tile first, which must outlive the paint.
fn with_paint<F>(paint: &Paint, opacity: Opacity, anti_alias: bool, ts: Transform, f: F) -> Option<()>
where
    F: FnOnce(&tiny_skia::Paint),
{
    let pattern_pixmap;
    let mut sk_paint = tiny_skia::Paint::default();
    match paint {
        Paint::Color(c) => {
            sk_paint.set_color_rgba8(c.red, c.green, c.blue, opacity.to_u8());
        }
        Paint::LinearGradient(ref lg) => {
            sk_paint.shader = convert_linear_gradient(lg, opacity)?;
        }
        Paint::RadialGradient(ref rg) => {
            sk_paint.shader = convert_radial_gradient(rg, opacity)?;
        }
        Paint::Pattern(ref pattern) => {
            let (patt_pix, patt_ts) = prepare_pattern_pixmap(pattern, ts)?;
            pattern_pixmap = patt_pix;
            sk_paint.shader = tiny_skia::Pattern::new(
                pattern_pixmap.as_ref(),
                tiny_skia::SpreadMode::Repeat,
                tiny_skia::FilterQuality::Bicubic,
                opacity.get(),
                patt_ts,
            );
        }
    }

    sk_paint.anti_alias = anti_alias;
    f(&sk_paint);
    Some(())
}

fn convert_linear_gradient(
    gradient: &LinearGradient,
    opacity: Opacity,
) -> Option<tiny_skia::Shader<'static>> {
    tiny_skia::LinearGradient::new(
        (gradient.x1, gradient.y1).into(),
        (gradient.x2, gradient.y2).into(),
        convert_stops(&gradient.stops, opacity),
        convert_spread_method(gradient.spread_method),
        gradient.transform,
    )
}

fn convert_radial_gradient(
    gradient: &RadialGradient,
    opacity: Opacity,
) -> Option<tiny_skia::Shader<'static>> {
    tiny_skia::RadialGradient::new(
        (gradient.fx, gradient.fy).into(),
        (gradient.cx, gradient.cy).into(),
        gradient.r.get(),
        convert_stops(&gradient.stops, opacity),
        convert_spread_method(gradient.spread_method),
        gradient.transform,
    )
}

fn convert_stops(stops: &[crate::Stop], opacity: Opacity) -> Vec<tiny_skia::GradientStop> {
    let mut points = Vec::with_capacity(stops.len());
    for stop in stops {
        let alpha = Opacity::new_clamped(stop.opacity.get() * opacity.get());
        let color = tiny_skia::Color::from_rgba8(
            stop.color.red,
            stop.color.green,
            stop.color.blue,
            alpha.to_u8(),
        );
        points.push(tiny_skia::GradientStop::new(stop.offset.get(), color))
    }

    points
}

fn convert_spread_method(method: SpreadMethod) -> tiny_skia::SpreadMode {
    match method {
        SpreadMethod::Pad => tiny_skia::SpreadMode::Pad,
        SpreadMethod::Reflect => tiny_skia::SpreadMode::Reflect,
        SpreadMethod::Repeat => tiny_skia::SpreadMode::Repeat,
    }
}

/// Renders a pattern tile at the current scale.
///
/// Returns the tile and a shader transform.
fn prepare_pattern_pixmap(pattern: &Pattern, ts: Transform) -> Option<(tiny_skia::Pixmap, Transform)> {
    let (sx, sy) = ts.pre_concat(pattern.transform).get_scale();
    let rect: NonZeroRect = pattern.rect;

    let img_size = tiny_skia::IntSize::from_wh(
        (rect.width() * sx).round() as u32,
        (rect.height() * sy).round() as u32,
    )?;
    let mut pixmap = tiny_skia::Pixmap::new(img_size.width(), img_size.height())?;

    render(&pattern.content, Transform::from_scale(sx, sy), &mut pixmap);

    let patt_ts = pattern
        .transform
        .pre_translate(rect.x(), rect.y())
        .pre_scale(1.0 / sx, 1.0 / sy);

    Some((pixmap, patt_ts))
}

fn convert_blend_mode(mode: BlendMode) -> tiny_skia::BlendMode {
    match mode {
        BlendMode::Normal => tiny_skia::BlendMode::SourceOver,
        BlendMode::Multiply => tiny_skia::BlendMode::Multiply,
        BlendMode::Screen => tiny_skia::BlendMode::Screen,
        BlendMode::Overlay => tiny_skia::BlendMode::Overlay,
        BlendMode::Darken => tiny_skia::BlendMode::Darken,
        BlendMode::Lighten => tiny_skia::BlendMode::Lighten,
        BlendMode::ColorDodge => tiny_skia::BlendMode::ColorDodge,
        BlendMode::ColorBurn => tiny_skia::BlendMode::ColorBurn,
        BlendMode::HardLight => tiny_skia::BlendMode::HardLight,
        BlendMode::SoftLight => tiny_skia::BlendMode::SoftLight,
        BlendMode::Difference => tiny_skia::BlendMode::Difference,
        BlendMode::Exclusion => tiny_skia::BlendMode::Exclusion,
        BlendMode::Hue => tiny_skia::BlendMode::Hue,
        BlendMode::Saturation => tiny_skia::BlendMode::Saturation,
        BlendMode::Color => tiny_skia::BlendMode::Color,
        BlendMode::Luminosity => tiny_skia::BlendMode::Luminosity,
    }
}
