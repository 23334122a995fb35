// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Picture replay.

use crate::{
    BlendMode, Command, FillRule, ImageCommand, Opacity, Path, PathCommand, Picture, Rect,
    TextCommand, Transform,
};

/// A drawing target.
///
/// Every `push_*` method returns a state token. Tokens are always handed back
/// to [`pop_state`](DrawingContext::pop_state) in the reverse order.
pub trait DrawingContext {
    /// A pushed state token.
    type State;

    /// Intersects the current clip with a rectangle in the current coordinates.
    fn push_clip_rect(&mut self, rect: Rect) -> Self::State;

    /// Intersects the current clip with a path in the current coordinates.
    fn push_clip_path(&mut self, path: &Path, rule: FillRule) -> Self::State;

    /// Concatenates a transform to the current one.
    fn push_transform(&mut self, transform: Transform) -> Self::State;

    /// Starts an off-screen layer.
    fn push_layer(&mut self, opacity: Opacity, blend_mode: BlendMode) -> Self::State;

    /// Releases a pushed state.
    fn pop_state(&mut self, state: Self::State);

    /// Draws a path.
    fn draw_path(&mut self, cmd: &PathCommand);

    /// Draws an image.
    fn draw_image(&mut self, cmd: &ImageCommand);

    /// Draws a shaped text run.
    fn draw_text(&mut self, cmd: &TextCommand);
}

struct Frame<S> {
    layer: Option<S>,
    states: Vec<S>,
}

impl<S> Frame<S> {
    fn new(layer: Option<S>) -> Self {
        Frame {
            layer,
            states: Vec::new(),
        }
    }

    fn release<C: DrawingContext<State = S>>(self, ctx: &mut C) {
        for state in self.states.into_iter().rev() {
            ctx.pop_state(state);
        }

        if let Some(layer) = self.layer {
            ctx.pop_state(layer);
        }
    }
}

/// Replays a picture onto a drawing context.
///
/// `transform` is the caller's ambient transform. It is pushed as an outer
/// scope, so the picture itself never needs to know about it.
pub fn draw<C: DrawingContext>(picture: &Picture, ctx: &mut C, transform: Transform) {
    draw_commands(picture.commands(), ctx, transform);
}

pub(crate) fn draw_commands<C: DrawingContext>(
    commands: &[Command],
    ctx: &mut C,
    transform: Transform,
) {
    let mut outer = Frame::new(None);
    outer.states.push(ctx.push_transform(transform));
    let mut frames = vec![outer];

    for cmd in commands {
        match cmd {
            Command::Save => frames.push(Frame::new(None)),
            Command::SaveLayer {
                opacity,
                blend_mode,
            } => {
                let layer = ctx.push_layer(*opacity, *blend_mode);
                frames.push(Frame::new(Some(layer)));
            }
            Command::Restore => {
                if frames.len() > 1 {
                    if let Some(frame) = frames.pop() {
                        frame.release(ctx);
                    }
                } else {
                    log::warn!("Unbalanced 'Restore' command. Skipped.");
                }
            }
            Command::ClipRect(rect) => {
                let state = ctx.push_clip_rect(*rect);
                push_state(&mut frames, state);
            }
            Command::ClipPath { path, rule } => {
                let state = ctx.push_clip_path(path, *rule);
                push_state(&mut frames, state);
            }
            Command::SetTransform(ts) => {
                let state = ctx.push_transform(*ts);
                push_state(&mut frames, state);
            }
            Command::DrawPath(ref path) => ctx.draw_path(path),
            Command::DrawImage(ref image) => ctx.draw_image(image),
            Command::DrawText(ref text) => ctx.draw_text(text),
        }
    }

    if frames.len() > 1 {
        log::warn!("{} unclosed scopes at the end of a picture.", frames.len() - 1);
    }

    while let Some(frame) = frames.pop() {
        frame.release(ctx);
    }
}

fn push_state<S>(frames: &mut [Frame<S>], state: S) {
    // There is always at least the outer frame.
    if let Some(frame) = frames.last_mut() {
        frame.states.push(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Picture, Size, ViewBox};

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
        next: usize,
    }

    impl DrawingContext for Log {
        type State = usize;

        fn push_clip_rect(&mut self, _: Rect) -> usize {
            self.next += 1;
            self.events.push(format!("clip{}", self.next));
            self.next
        }

        fn push_clip_path(&mut self, _: &Path, _: FillRule) -> usize {
            self.next += 1;
            self.events.push(format!("clip{}", self.next));
            self.next
        }

        fn push_transform(&mut self, _: Transform) -> usize {
            self.next += 1;
            self.events.push(format!("ts{}", self.next));
            self.next
        }

        fn push_layer(&mut self, _: Opacity, _: BlendMode) -> usize {
            self.next += 1;
            self.events.push(format!("layer{}", self.next));
            self.next
        }

        fn pop_state(&mut self, state: usize) {
            self.events.push(format!("pop{}", state));
        }

        fn draw_path(&mut self, _: &PathCommand) {}
        fn draw_image(&mut self, _: &ImageCommand) {}
        fn draw_text(&mut self, _: &TextCommand) {}
    }

    fn picture(commands: Vec<Command>) -> Picture {
        let size = Size::from_wh(10.0, 10.0).unwrap();
        Picture::new(commands, size, ViewBox {
            rect: size.to_non_zero_rect(0.0, 0.0),
            aspect: Default::default(),
        })
    }

    #[test]
    fn lifo_release() {
        let rect = Rect::from_xywh(0.0, 0.0, 1.0, 1.0).unwrap();
        let pic = picture(vec![
            Command::SaveLayer {
                opacity: Opacity::new_clamped(0.5),
                blend_mode: BlendMode::Normal,
            },
            Command::ClipRect(rect),
            Command::SetTransform(Transform::from_scale(2.0, 2.0)),
            Command::Restore,
        ]);

        let mut log = Log::default();
        draw(&pic, &mut log, Transform::default());
        assert_eq!(
            log.events,
            ["ts1", "layer2", "clip3", "ts4", "pop4", "pop3", "pop2", "pop1"]
        );
    }

    #[test]
    fn unbalanced() {
        let rect = Rect::from_xywh(0.0, 0.0, 1.0, 1.0).unwrap();
        let pic = picture(vec![
            Command::Restore,
            Command::Save,
            Command::ClipRect(rect),
        ]);

        let mut log = Log::default();
        draw(&pic, &mut log, Transform::default());
        assert_eq!(log.events, ["ts1", "clip2", "pop2", "pop1"]);
    }
}
