// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use svgtree::NodeId;

use crate::geom::BBox;
use crate::replay::{self, DrawingContext};
use crate::{
    BlendMode, Fill, FillRule, ImageData, ImageRendering, NonZeroRect, Opacity, Path, Point,
    Rect, ShapedText, Size, Stroke, Transform, ViewBox,
};

/// An element a draw command was recorded from.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ElementRef {
    /// Node ID in the source document.
    pub node: NodeId,
    /// Element's `id` attribute. Can be empty.
    pub id: String,
}

/// A path drawing command.
#[derive(Clone, Debug)]
pub struct PathCommand {
    /// Path geometry in the current coordinates.
    pub path: Arc<Path>,
    /// Fill style.
    pub fill: Option<Fill>,
    /// Stroke style. Applied after the fill.
    pub stroke: Option<Stroke>,
    /// Disables anti-aliasing when set to `false`.
    ///
    /// `shape-rendering` in SVG.
    pub anti_alias: bool,
    /// Source element.
    pub element: Option<ElementRef>,
}

/// An image drawing command.
#[derive(Clone, Debug)]
pub struct ImageCommand {
    /// Encoded image data.
    pub data: Arc<ImageData>,
    /// Image area to draw, in image pixels.
    pub src: NonZeroRect,
    /// Destination rectangle in the current coordinates.
    pub dst: NonZeroRect,
    /// Filter mode.
    pub rendering: ImageRendering,
    /// Source element.
    pub element: Option<ElementRef>,
}

/// A text drawing command.
#[derive(Clone, Debug)]
pub struct TextCommand {
    /// Shaped text run.
    pub text: Arc<ShapedText>,
    /// Baseline origin in the current coordinates.
    pub origin: Point,
    /// Fill style.
    pub fill: Option<Fill>,
    /// Stroke style.
    pub stroke: Option<Stroke>,
    /// Source element.
    pub element: Option<ElementRef>,
}

impl TextCommand {
    /// Returns text bounds in the current coordinates.
    pub fn bounds(&self) -> Option<Rect> {
        let b = self.text.bounds;
        Rect::from_xywh(
            b.x() + self.origin.x,
            b.y() + self.origin.y,
            b.width(),
            b.height(),
        )
    }
}

/// A canvas command.
#[derive(Clone, Debug)]
pub enum Command {
    /// Starts a new state scope.
    Save,
    /// Starts a new state scope rendered into a separate layer.
    SaveLayer {
        /// Layer opacity.
        opacity: Opacity,
        /// Layer blending mode.
        blend_mode: BlendMode,
    },
    /// Ends the current scope.
    Restore,
    /// Intersects the clip with a rectangle.
    ClipRect(Rect),
    /// Intersects the clip with a path.
    ClipPath {
        /// Clip geometry.
        path: Arc<Path>,
        /// Clip fill rule.
        rule: FillRule,
    },
    /// Concatenates a transform to the current one.
    SetTransform(Transform),
    /// Draws a path.
    DrawPath(PathCommand),
    /// Draws an image.
    DrawImage(ImageCommand),
    /// Draws a text run.
    DrawText(TextCommand),
}

impl Command {
    /// Returns the source element of a draw command.
    pub fn element(&self) -> Option<&ElementRef> {
        match self {
            Command::DrawPath(ref cmd) => cmd.element.as_ref(),
            Command::DrawImage(ref cmd) => cmd.element.as_ref(),
            Command::DrawText(ref cmd) => cmd.element.as_ref(),
            _ => None,
        }
    }
}

/// An immutable list of canvas commands.
///
/// Commands are in the picture coordinates, i.e. the root `viewBox`
/// transform is already recorded.
#[derive(Clone, Debug)]
pub struct Picture {
    commands: Vec<Command>,
    size: Size,
    view_box: ViewBox,
    bounds: Option<Rect>,
}

impl Picture {
    pub(crate) fn new(commands: Vec<Command>, size: Size, view_box: ViewBox) -> Self {
        let bounds = commands_bounds(&commands, true);
        Picture {
            commands,
            size,
            view_box,
            bounds,
        }
    }

    /// Returns recorded commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns the picture size.
    ///
    /// `width` and `height` of the root `svg` element.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Returns the root `viewBox`.
    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    /// Returns a bounding box of all drawn content, including strokes.
    ///
    /// Clipping is ignored. `None` when nothing is drawn.
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// Checks that the picture has no draw commands.
    pub fn is_empty(&self) -> bool {
        !self.commands.iter().any(is_draw)
    }
}

pub(crate) fn is_draw(cmd: &Command) -> bool {
    matches!(
        cmd,
        Command::DrawPath(_) | Command::DrawImage(_) | Command::DrawText(_)
    )
}

/// Calculates a bounding box of draw commands.
pub(crate) fn commands_bounds(commands: &[Command], with_stroke: bool) -> Option<Rect> {
    let mut ctx = BoundsContext {
        ts: Transform::default(),
        bbox: BBox::default(),
        with_stroke,
    };
    replay::draw_commands(commands, &mut ctx, Transform::default());
    ctx.bbox.to_rect()
}

/// Calculates a path bounding box.
pub(crate) fn path_bounds(cmd: &PathCommand, with_stroke: bool) -> Option<Rect> {
    if with_stroke {
        if let Some(ref stroke) = cmd.stroke {
            if let Some(outline) = cmd.path.stroke(&stroke.to_tiny_skia(), 1.0) {
                return outline.compute_tight_bounds();
            }
        }
    }

    cmd.path.compute_tight_bounds()
}

struct BoundsContext {
    ts: Transform,
    bbox: BBox,
    with_stroke: bool,
}

impl BoundsContext {
    fn add(&mut self, rect: Option<Rect>) {
        if let Some(rect) = rect.and_then(|r| r.transform(self.ts)) {
            self.bbox = self.bbox.expand(rect);
        }
    }
}

impl DrawingContext for BoundsContext {
    // A transform to restore.
    type State = Option<Transform>;

    fn push_clip_rect(&mut self, _: Rect) -> Self::State {
        None
    }

    fn push_clip_path(&mut self, _: &Path, _: FillRule) -> Self::State {
        None
    }

    fn push_transform(&mut self, transform: Transform) -> Self::State {
        let prev = self.ts;
        self.ts = self.ts.pre_concat(transform);
        Some(prev)
    }

    fn push_layer(&mut self, _: Opacity, _: BlendMode) -> Self::State {
        None
    }

    fn pop_state(&mut self, state: Self::State) {
        if let Some(ts) = state {
            self.ts = ts;
        }
    }

    fn draw_path(&mut self, cmd: &PathCommand) {
        self.add(path_bounds(cmd, self.with_stroke));
    }

    fn draw_image(&mut self, cmd: &ImageCommand) {
        self.add(Some(cmd.dst.to_rect()));
    }

    fn draw_text(&mut self, cmd: &TextCommand) {
        self.add(cmd.bounds());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathBuilder;

    #[test]
    fn bounds_follow_transforms() {
        let rect = Rect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap();
        let path = Arc::new(PathBuilder::from_rect(rect));
        let draw = Command::DrawPath(PathCommand {
            path,
            fill: Some(Fill::from_paint(crate::Paint::Color(crate::Color::black()))),
            stroke: None,
            anti_alias: true,
            element: None,
        });

        let commands = vec![
            Command::Save,
            Command::SetTransform(Transform::from_translate(5.0, 5.0)),
            draw.clone(),
            Command::Restore,
            draw,
        ];

        assert_eq!(
            commands_bounds(&commands, false),
            Rect::from_ltrb(0.0, 0.0, 15.0, 15.0)
        );
    }
}
