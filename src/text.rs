// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Text runs.
//!
//! Glyph shaping is delegated to a [`TextShaper`]. Here we only split `text`
//! content into runs, position them and resolve their paint.

use std::sync::Arc;

use svgtree::{normalize_text, AId, EId, SvgNode, XmlSpace};
use svgtypes::Length;

use crate::geom::BBox;
use crate::recorder::{self, Context, State};
use crate::style::Origin;
use crate::{
    paint_server, units, Command, Options, Path, Point, Rect, ResolvedStyle, TextCommand,
    Visibility,
};

/// A font style.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FontStyle {
    Normal,
    Italic,
    Oblique,
}

impl Default for FontStyle {
    fn default() -> Self {
        FontStyle::Normal
    }
}

/// A font stretch.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FontStretch {
    UltraCondensed,
    ExtraCondensed,
    Condensed,
    SemiCondensed,
    Normal,
    SemiExpanded,
    Expanded,
    ExtraExpanded,
    UltraExpanded,
}

impl Default for FontStretch {
    fn default() -> Self {
        FontStretch::Normal
    }
}

/// A resolved font description.
#[derive(Clone, PartialEq, Debug)]
pub struct Font {
    /// A list of family names, in the preference order.
    ///
    /// Never empty.
    pub families: Vec<String>,
    /// Font style.
    pub style: FontStyle,
    /// Font weight, in a 100..=900 range.
    pub weight: u16,
    /// Font stretch.
    pub stretch: FontStretch,
    /// Absolute font size.
    pub size: f32,
}

/// A shaped text run.
#[derive(Clone, Debug)]
pub struct ShapedText {
    /// Run text.
    pub text: String,
    /// A font the run was shaped with.
    pub font: Font,
    /// Horizontal advance of the whole run.
    pub advance: f32,
    /// Ink bounds relative to the baseline origin.
    pub bounds: Rect,
    /// Glyph outlines relative to the baseline origin.
    ///
    /// Used by drawing contexts that cannot render text themselves.
    pub outline: Option<Arc<Path>>,
}

/// A text shaping service.
pub trait TextShaper: Send + Sync {
    /// Shapes a single-line text run.
    ///
    /// Returns `None` when the run cannot be shaped, e.g. when no font is matched.
    fn shape(&self, text: &str, font: &Font) -> Option<ShapedText>;
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum TextAnchor {
    Start,
    Middle,
    End,
}

/// Position attributes not yet applied to a character.
#[derive(Clone, Copy, Default)]
struct Position {
    x: Option<f32>,
    y: Option<f32>,
    dx: f32,
    dy: f32,
}

struct Run<'a> {
    /// `text` or `tspan` the run belongs to.
    node: SvgNode<'a>,
    style: ResolvedStyle,
    font: Font,
    text: String,
    preserve: bool,
    pos: Position,
}

struct Collector<'a, 'b> {
    runs: Vec<Run<'a>>,
    pending: Position,
    prev_ends_with_space: bool,
    ctx: &'b Context<'b>,
    state: &'b State<'b>,
}

pub(crate) fn convert(
    node: SvgNode,
    style: &ResolvedStyle,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) {
    let shaper = match state.opt.text_shaper {
        Some(ref v) => v,
        None => {
            ctx.report_unsupported(
                "text",
                "text requires a text shaper, 'text' elements are skipped",
                node,
            );
            return;
        }
    };

    let runs = collect_runs(node, style, state, ctx);
    if runs.is_empty() {
        return;
    }

    // Layout.
    let mut shaped: Vec<(&Run, ShapedText, Point)> = Vec::with_capacity(runs.len());
    let mut chunks: Vec<(usize, TextAnchor, f32)> = Vec::new();
    let mut pen = Point::zero();
    for (i, run) in runs.iter().enumerate() {
        let is_new_chunk = i == 0 || run.pos.x.is_some() || run.pos.y.is_some();
        if let Some(x) = run.pos.x {
            pen.x = x;
        }
        if let Some(y) = run.pos.y {
            pen.y = y;
        }
        pen.x += run.pos.dx;
        pen.y += run.pos.dy;

        if is_new_chunk {
            chunks.push((shaped.len(), convert_anchor(&run.style), pen.x));
        }

        let text = match shaper.shape(&run.text, &run.font) {
            Some(v) => v,
            None => {
                log::warn!("Failed to shape '{}'. Skipped.", run.text);
                continue;
            }
        };

        let origin = pen;
        pen.x += text.advance;
        shaped.push((run, text, origin));
    }

    // Anchoring is applied per chunk, i.e. a group of runs without absolute positioning.
    for (i, &(start, anchor, start_x)) in chunks.iter().enumerate() {
        let end = chunks.get(i + 1).map_or(shaped.len(), |c| c.0);
        let last = match shaped[start..end].last() {
            Some(v) => v,
            None => continue,
        };

        let width = last.2.x + last.1.advance - start_x;
        let shift = match anchor {
            TextAnchor::Start => continue,
            TextAnchor::Middle => -width / 2.0,
            TextAnchor::End => -width,
        };

        for item in &mut shaped[start..end] {
            item.2.x += shift;
        }
    }

    // All runs share the text element bounding box.
    let mut bbox = BBox::default();
    for (_, text, origin) in &shaped {
        if let Some(r) = Rect::from_xywh(
            text.bounds.x() + origin.x,
            text.bounds.y() + origin.y,
            text.bounds.width(),
            text.bounds.height(),
        ) {
            bbox = bbox.expand(r);
        }
    }
    let bbox = bbox.to_rect();

    for (run, text, origin) in shaped {
        let visibility: Visibility = run.style.parse(run.node, AId::Visibility).unwrap_or_default();
        if visibility != Visibility::Visible {
            continue;
        }

        let fill = paint_server::resolve_fill(run.node, &run.style, bbox, state, ctx);
        let stroke = paint_server::resolve_stroke(run.node, &run.style, bbox, state, ctx);
        if fill.is_none() && stroke.is_none() {
            continue;
        }

        out.push(Command::DrawText(TextCommand {
            text: Arc::new(text),
            origin,
            fill,
            stroke,
            element: Some(recorder::element_ref(run.node)),
        }));
    }
}

fn collect_runs<'a>(
    node: SvgNode<'a>,
    style: &ResolvedStyle,
    state: &State,
    ctx: &Context,
) -> Vec<Run<'a>> {
    let mut collector = Collector {
        runs: Vec::new(),
        pending: Position::default(),
        prev_ends_with_space: true,
        ctx,
        state,
    };

    let font = convert_font(style, None, state.opt);
    collector.read_position(node, style);
    collector.collect(node, style, &font);

    // Trailing spaces of a text element are removed.
    while let Some(run) = collector.runs.last_mut() {
        if run.preserve {
            break;
        }

        let len = run.text.trim_end_matches(' ').len();
        run.text.truncate(len);
        if !run.text.is_empty() {
            break;
        }

        collector.runs.pop();
    }

    collector.runs
}

impl<'a> Collector<'a, '_> {
    fn collect(&mut self, parent: SvgNode<'a>, parent_style: &ResolvedStyle, parent_font: &Font) {
        for child in parent.children() {
            if child.is_text() {
                self.push_text(child, parent, parent_style, parent_font);
                continue;
            }

            if !child.is_element() {
                continue;
            }

            if !child.has_tag_name(EId::TSpan) {
                log::warn!("'{}' inside 'text' is not supported. Skipped.", child.local_name());
                continue;
            }

            let style = self.ctx.resolver.resolve(child, Some(parent_style));
            if !recorder::is_visible_element(child, &style, self.state.opt) {
                continue;
            }

            let font = convert_font(&style, Some(parent_font), self.state.opt);
            self.read_position(child, &style);
            self.collect(child, &style, &font);
        }
    }

    fn push_text(
        &mut self,
        text_node: SvgNode,
        parent: SvgNode<'a>,
        style: &ResolvedStyle,
        font: &Font,
    ) {
        let mode = parent.xml_space();
        let mut text = normalize_text(text_node.text(), mode);
        let preserve = mode == XmlSpace::Preserve;

        if !preserve && self.prev_ends_with_space && text.starts_with(' ') {
            text.remove(0);
        }

        if text.is_empty() {
            return;
        }

        self.prev_ends_with_space = !preserve && text.ends_with(' ');
        let pos = std::mem::take(&mut self.pending);
        self.runs.push(Run {
            node: parent,
            style: style.clone(),
            font: font.clone(),
            text,
            preserve,
            pos,
        });
    }

    /// Reads the first `x`, `y`, `dx` and `dy` values.
    ///
    /// They are applied to the next character.
    fn read_position(&mut self, node: SvgNode, style: &ResolvedStyle) {
        let first = |aid: AId| -> Option<f32> {
            let list = node.attribute::<Vec<Length>>(aid)?;
            let length = *list.first()?;
            Some(units::convert_user_length(length, aid, style, self.state))
        };

        if let Some(x) = first(AId::X) {
            self.pending.x = Some(x);
        }
        if let Some(y) = first(AId::Y) {
            self.pending.y = Some(y);
        }
        self.pending.dx += first(AId::Dx).unwrap_or(0.0);
        self.pending.dy += first(AId::Dy).unwrap_or(0.0);
    }
}

fn convert_anchor(style: &ResolvedStyle) -> TextAnchor {
    match style.get(AId::TextAnchor) {
        Some("middle") => TextAnchor::Middle,
        Some("end") => TextAnchor::End,
        _ => TextAnchor::Start,
    }
}

fn convert_font(style: &ResolvedStyle, parent: Option<&Font>, opt: &Options) -> Font {
    let mut families = Vec::new();
    for family in style.get(AId::FontFamily).unwrap_or("").split(',') {
        let family = family.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        if !family.is_empty() {
            families.push(family.to_string());
        }
    }

    if families.is_empty() {
        families.push(opt.font_family.clone());
    }

    let font_style = match style.get(AId::FontStyle) {
        Some("italic") => FontStyle::Italic,
        Some("oblique") => FontStyle::Oblique,
        _ => FontStyle::Normal,
    };

    // Relative weights are resolved against the parent font only once,
    // on the element that sets them.
    let parent_weight = parent.map_or(400, |f| f.weight);
    let weight = match style.origin(AId::FontWeight) {
        None | Some(Origin::Inherited) => parent_weight,
        Some(_) => convert_weight(style.get(AId::FontWeight).unwrap_or(""), parent_weight),
    };

    Font {
        families,
        style: font_style,
        weight,
        stretch: convert_stretch(style.get(AId::FontStretch).unwrap_or("")),
        size: style.font_size(),
    }
}

fn convert_weight(value: &str, parent: u16) -> u16 {
    match value {
        "normal" => 400,
        "bold" => 700,
        // Chrome and Inkscape go from 400 straight to 700.
        "bolder" => {
            let step = if parent == 400 { 300 } else { 100 };
            (parent + step).min(900)
        }
        "lighter" => {
            let step = if parent == 400 { 200 } else { 100 };
            parent.saturating_sub(step).max(100)
        }
        _ => match value.parse::<u16>() {
            Ok(n) if (1..=1000).contains(&n) => n,
            _ => parent,
        },
    }
}

// TODO: resolve narrower/wider relative to the parent stretch.
fn convert_stretch(value: &str) -> FontStretch {
    match value {
        "narrower" | "condensed" => FontStretch::Condensed,
        "ultra-condensed" => FontStretch::UltraCondensed,
        "extra-condensed" => FontStretch::ExtraCondensed,
        "semi-condensed" => FontStretch::SemiCondensed,
        "semi-expanded" => FontStretch::SemiExpanded,
        "wider" | "expanded" => FontStretch::Expanded,
        "extra-expanded" => FontStretch::ExtraExpanded,
        "ultra-expanded" => FontStretch::UltraExpanded,
        _ => FontStretch::Normal,
    }
}
