// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use svgtree::{AId, SvgNode};
use svgtypes::{Length, LengthUnit as Unit};

use crate::recorder::State;
use crate::{ResolvedStyle, Units};

#[inline(never)]
pub(crate) fn convert_length(
    length: Length,
    aid: AId,
    object_units: Units,
    font_size: f32,
    state: &State,
) -> f32 {
    let dpi = state.opt.dpi;
    let n = length.number as f32;
    match length.unit {
        Unit::None | Unit::Px => n,
        Unit::Em => n * font_size,
        Unit::Ex => n * font_size / 2.0,
        Unit::In => n * dpi,
        Unit::Cm => n * dpi / 2.54,
        Unit::Mm => n * dpi / 25.4,
        Unit::Pt => n * dpi / 72.0,
        Unit::Pc => n * dpi / 6.0,
        Unit::Percent => {
            if object_units == Units::ObjectBoundingBox {
                n / 100.0
            } else {
                let view_box = state.view_box;

                match aid {
                    AId::Cx | AId::Dx | AId::Fx | AId::RefX | AId::Rx | AId::Width | AId::X
                    | AId::X1 | AId::X2 => convert_percent(length, view_box.width()),
                    AId::Cy | AId::Dy | AId::Fy | AId::Height | AId::RefY | AId::Ry | AId::Y
                    | AId::Y1 | AId::Y2 => convert_percent(length, view_box.height()),
                    _ => {
                        let mut vb_len = view_box.width().powi(2) + view_box.height().powi(2);
                        vb_len = (vb_len / 2.0).sqrt();
                        convert_percent(length, vb_len)
                    }
                }
            }
        }
    }
}

pub(crate) fn convert_user_length(
    length: Length,
    aid: AId,
    style: &ResolvedStyle,
    state: &State,
) -> f32 {
    convert_length(length, aid, Units::UserSpaceOnUse, style.font_size(), state)
}

/// Converts a geometry attribute, like `x` or `width`.
pub(crate) fn convert_attr(
    node: SvgNode,
    aid: AId,
    object_units: Units,
    style: &ResolvedStyle,
    state: &State,
    def: Length,
) -> f32 {
    let length = node.attribute::<Length>(aid).unwrap_or(def);
    convert_length(length, aid, object_units, style.font_size(), state)
}

/// Converts a length property, like `stroke-width`.
pub(crate) fn convert_property(
    node: SvgNode,
    aid: AId,
    style: &ResolvedStyle,
    state: &State,
    def: f32,
) -> f32 {
    match style.parse::<Length>(node, aid) {
        Some(length) => convert_user_length(length, aid, style, state),
        None => def,
    }
}

#[inline(never)]
pub(crate) fn convert_list(
    aid: AId,
    style: &ResolvedStyle,
    state: &State,
) -> Option<Vec<f32>> {
    let text = style.get(aid)?;
    let mut num_list = Vec::new();
    for length in svgtypes::LengthListParser::from(text).flatten() {
        num_list.push(convert_user_length(length, aid, style, state));
    }

    Some(num_list)
}

fn convert_percent(length: Length, base: f32) -> f32 {
    base * (length.number as f32) / 100.0
}

/// Computes an absolute `font-size`.
///
/// Relative values are resolved against `parent`.
pub(crate) fn convert_font_size(value: &str, parent: f32, dpi: f32) -> Option<f32> {
    let value = value.trim();
    if let Ok(length) = Length::from_str(value) {
        let n = length.number as f32;
        let size = match length.unit {
            Unit::None | Unit::Px => n,
            Unit::Em => n * parent,
            Unit::Ex => n * parent / 2.0,
            Unit::In => n * dpi,
            Unit::Cm => n * dpi / 2.54,
            Unit::Mm => n * dpi / 25.4,
            Unit::Pt => n * dpi / 72.0,
            Unit::Pc => n * dpi / 6.0,
            // A percentage is relative to the parent `font-size`.
            Unit::Percent => n * parent * 0.01,
        };

        return if size.is_finite() && size >= 0.0 {
            Some(size)
        } else {
            None
        };
    }

    convert_named_font_size(value, parent)
}

fn convert_named_font_size(name: &str, parent_font_size: f32) -> Option<f32> {
    let factor = match name {
        "xx-small" => -3,
        "x-small" => -2,
        "small" => -1,
        "medium" => 0,
        "large" => 1,
        "x-large" => 2,
        "xx-large" => 3,
        "smaller" => -1,
        "larger" => 1,
        _ => return None,
    };

    // 'On a computer screen a scaling factor of 1.2 is suggested between adjacent indexes.'
    Some(parent_font_size * 1.2f32.powi(factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_sizes() {
        assert_eq!(convert_font_size("20", 12.0, 96.0), Some(20.0));
        assert_eq!(convert_font_size("2em", 12.0, 96.0), Some(24.0));
        assert_eq!(convert_font_size("50%", 12.0, 96.0), Some(6.0));
        assert_eq!(convert_font_size("1in", 12.0, 96.0), Some(96.0));
        assert_eq!(convert_font_size("medium", 12.0, 96.0), Some(12.0));
        assert_eq!(convert_font_size("larger", 10.0, 96.0), Some(12.0));
        assert_eq!(convert_font_size("huge", 12.0, 96.0), None);
        assert_eq!(convert_font_size("-5", 12.0, 96.0), None);
    }
}
