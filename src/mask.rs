// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Masks as geometric clip regions.
//!
//! A mask is reduced to its region rectangle intersected with the union of
//! its filled children. Luminance and alpha are not preserved.

use svgtree::{AId, SvgNode};
use svgtypes::{Length, LengthUnit as Unit};

use crate::clip::{self, ClipShape, Link, Region};
use crate::recorder::{self, Context, State};
use crate::{units, Command, NonZeroRect, OptionLog, Rect, ResolvedStyle, Transform, Units};

/// Resolves a `mask` property into clip commands.
///
/// Commands are in the element's user space. Returns `None` when the element
/// must not be rendered at all.
pub(crate) fn convert(
    node: SvgNode,
    style: &ResolvedStyle,
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) -> Option<()> {
    let mask_node = match clip::resolve_link(node, style, AId::Mask, ctx) {
        Link::None => return Some(()),
        Link::Element(v) => v,
    };

    if !clip::guard_enter(node, mask_node, "mask", ctx) {
        return None;
    }

    let res = convert_impl(mask_node, bbox, state, ctx, out);
    ctx.ref_chain.pop();
    res
}

fn convert_impl(
    mask_node: SvgNode,
    bbox: Option<Rect>,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) -> Option<()> {
    let mask_style = ctx.resolver.resolve_in_tree(mask_node);

    let rect = resolve_region(mask_node, &mask_style, bbox, state).log_none(|| {
        log::warn!(
            "Mask '{}' has an invalid size. Skipped.",
            mask_node.element_id()
        )
    })?;
    out.push(Command::ClipRect(rect.to_rect()));

    // A linked mask is intersected with this one.
    convert(mask_node, &mask_style, bbox, state, ctx, out)?;

    let content_units: Units = mask_node
        .attribute(AId::MaskContentUnits)
        .unwrap_or(Units::UserSpaceOnUse);
    let ts = if content_units == Units::ObjectBoundingBox {
        Transform::from_bbox(clip::non_zero_bbox(bbox)?)
    } else {
        Transform::default()
    };

    let has_children = mask_node
        .children()
        .any(|n| n.tag_name().map_or(false, |t| t.is_graphic() || t == svgtree::EId::G));
    if !has_children {
        // Only the region is known.
        return Some(());
    }

    let mut shapes: Vec<ClipShape> = Vec::new();
    for child in mask_node.children() {
        clip::collect_shape(child, &mask_style, Transform::default(), Region::Mask, state, ctx, &mut shapes);
    }

    // Nothing is visible through the mask.
    if shapes.is_empty() {
        return None;
    }

    out.push(clip::shapes_to_clip(&shapes, ts)?);
    Some(())
}

/// Resolves the mask region.
///
/// Without `maskUnits`, plain numbers are in user space, while percentages
/// and the default `-10%, -10%, 120%, 120%` region refer to the object bounding box.
/// An explicit `maskUnits` applies to all four values.
fn resolve_region(
    node: SvgNode,
    style: &ResolvedStyle,
    bbox: Option<Rect>,
    state: &State,
) -> Option<NonZeroRect> {
    let defaults = [
        Length::new(-10.0, Unit::Percent),
        Length::new(-10.0, Unit::Percent),
        Length::new(120.0, Unit::Percent),
        Length::new(120.0, Unit::Percent),
    ];

    match node.attribute::<Units>(AId::MaskUnits) {
        Some(Units::UserSpaceOnUse) => {
            recorder::convert_rect(node, Units::UserSpaceOnUse, defaults, style, state)
        }
        Some(Units::ObjectBoundingBox) => {
            let bbox = clip::non_zero_bbox(bbox)?;
            let rect = recorder::convert_rect(node, Units::ObjectBoundingBox, defaults, style, state)?;
            Some(rect.bbox_transform(bbox))
        }
        None => {
            let aids = [AId::X, AId::Y, AId::Width, AId::Height];
            let mut values = [0.0; 4];
            for (i, aid) in aids.iter().enumerate() {
                let length = node.attribute::<Length>(*aid).unwrap_or(defaults[i]);
                values[i] = if length.unit == Unit::Percent {
                    let bbox = clip::non_zero_bbox(bbox)?;
                    let n = length.number as f32;
                    match aid {
                        AId::X => bbox.x() + n * bbox.width() / 100.0,
                        AId::Y => bbox.y() + n * bbox.height() / 100.0,
                        AId::Width => n * bbox.width() / 100.0,
                        _ => n * bbox.height() / 100.0,
                    }
                } else {
                    units::convert_user_length(length, *aid, style, state)
                };
            }

            NonZeroRect::from_xywh(values[0], values[1], values[2], values[3])
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Command, Options, Rect, Recording};

    fn record(text: &str) -> Recording {
        Recording::from_str(text, &Options::default()).unwrap()
    }

    #[test]
    fn region_only() {
        let rec = record(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <mask id='m' x='10' y='10' width='20' height='20'/>
                <rect width='50' height='50' mask='url(#m)'/>
            </svg>",
        );
        let commands = rec.picture.commands();
        let clip = commands.iter().position(|c| matches!(c, Command::ClipRect(_))).unwrap();
        let draw = commands.iter().position(|c| matches!(c, Command::DrawPath(_))).unwrap();
        assert!(clip < draw);
        assert!(matches!(commands[clip], Command::ClipRect(r) if r == Rect::from_xywh(10.0, 10.0, 20.0, 20.0).unwrap()));
    }

    #[test]
    fn default_region() {
        let rec = record(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <mask id='m'/>
                <rect x='10' y='10' width='100' height='50' mask='url(#m)'/>
            </svg>",
        );
        let clip = rec
            .picture
            .commands()
            .iter()
            .find_map(|c| match c {
                Command::ClipRect(r) => Some(*r),
                _ => None,
            })
            .unwrap();
        assert_eq!(clip, Rect::from_xywh(0.0, 5.0, 120.0, 60.0).unwrap());
    }

    #[test]
    fn children_are_intersected_with_region() {
        let rec = record(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <mask id='m' maskUnits='userSpaceOnUse' x='0' y='0' width='100' height='100'>
                    <circle cx='25' cy='25' r='10' fill='white'/>
                    <rect width='5' height='5' fill='none'/>
                </mask>
                <rect width='50' height='50' mask='url(#m)'/>
            </svg>",
        );
        let clips: Vec<_> = rec
            .picture
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::ClipRect(_) | Command::ClipPath { .. }))
            .collect();
        assert_eq!(clips.len(), 2);
        assert!(matches!(clips[1], Command::ClipPath { .. }));
    }

    #[test]
    fn invisible_children_hide_element() {
        let rec = record(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <mask id='m'><rect width='5' height='5' fill='none'/></mask>
                <rect width='50' height='50' mask='url(#m)'/>
            </svg>",
        );
        assert!(rec.picture.is_empty());
    }
}
