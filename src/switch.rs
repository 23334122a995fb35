// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use svgtree::{AId, SvgNode};

use crate::recorder::{self, Context, State};
use crate::{Command, Options, ResolvedStyle};

// Full list can be found here: https://www.w3.org/TR/SVG11/feature.html
static FEATURES: &[&str] = &[
    "http://www.w3.org/TR/SVG11/feature#SVGDOM-static",
    "http://www.w3.org/TR/SVG11/feature#SVG-static",
    "http://www.w3.org/TR/SVG11/feature#CoreAttribute", // no xml:base and xml:lang
    "http://www.w3.org/TR/SVG11/feature#Structure",
    "http://www.w3.org/TR/SVG11/feature#BasicStructure",
    "http://www.w3.org/TR/SVG11/feature#ConditionalProcessing",
    "http://www.w3.org/TR/SVG11/feature#Image",
    "http://www.w3.org/TR/SVG11/feature#Style",
    "http://www.w3.org/TR/SVG11/feature#ViewportAttribute", // `overflow` only
    "http://www.w3.org/TR/SVG11/feature#Shape",
    "http://www.w3.org/TR/SVG11/feature#Text",
    "http://www.w3.org/TR/SVG11/feature#BasicText",
    "http://www.w3.org/TR/SVG11/feature#PaintAttribute", // no color-interpolation and color-rendering
    "http://www.w3.org/TR/SVG11/feature#BasicPaintAttribute", // no color-interpolation
    "http://www.w3.org/TR/SVG11/feature#OpacityAttribute",
    "http://www.w3.org/TR/SVG11/feature#BasicGraphicsAttribute",
    "http://www.w3.org/TR/SVG11/feature#Gradient",
    "http://www.w3.org/TR/SVG11/feature#Pattern",
    "http://www.w3.org/TR/SVG11/feature#Clip",
    "http://www.w3.org/TR/SVG11/feature#BasicClip",
    "http://www.w3.org/TR/SVG11/feature#Mask",
    "http://www.w3.org/TR/SVG11/feature#XlinkAttribute", // only xlink:href
];

/// Records the first `switch` child that passes conditional processing.
pub(crate) fn convert(
    node: SvgNode,
    style: &ResolvedStyle,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) -> Option<()> {
    let child = node
        .children()
        .find(|n| is_condition_passed(*n, state.opt))?;
    recorder::record_element(child, style, state, ctx, out);
    Some(())
}

pub(crate) fn is_condition_passed(node: SvgNode, opt: &Options) -> bool {
    if !node.is_element() {
        return false;
    }

    if node.has_attribute(AId::RequiredExtensions) {
        return false;
    }

    // 'The value is a list of feature strings, with the individual values separated by white space.
    // Determines whether all of the named features are supported by the user agent.
    // Only feature strings defined in the Feature String appendix are allowed.
    // If all of the given features are supported, then the attribute evaluates to true;
    // otherwise, the current element and its children are skipped and thus will not be rendered.'
    if let Some(features) = node.attribute_value(AId::RequiredFeatures) {
        for feature in features.split_whitespace() {
            if !FEATURES.contains(&feature) {
                return false;
            }
        }
    }

    is_valid_sys_lang(node, opt)
}

/// SVG spec 5.8.5
fn is_valid_sys_lang(node: SvgNode, opt: &Options) -> bool {
    // 'The attribute value is a comma-separated list of language names
    // as defined in BCP 47.'
    //
    // But we support only simple cases like `en` or `en-US`.
    let langs = match node.attribute_value(AId::SystemLanguage) {
        Some(v) => v,
        None => return true,
    };

    for lang in langs.split(',') {
        let lang = lang.trim();

        // 'Evaluates to `true` if one of the languages indicated by user preferences exactly
        // equals one of the languages given in the value of this parameter.'
        if opt.languages.iter().any(|v| v == lang) {
            return true;
        }

        // 'If one of the languages indicated by user preferences exactly equals a prefix
        // of one of the languages given in the value of this parameter such that
        // the first tag character following the prefix is `-`.'
        if let Some(idx) = lang.bytes().position(|c| c == b'-') {
            let prefix = &lang[..idx];
            if opt.languages.iter().any(|v| v == prefix) {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgtree::Document;

    fn passed(text: &str, languages: &[&str]) -> bool {
        let doc = Document::parse_str(text);
        let opt = Options {
            languages: languages.iter().map(|s| s.to_string()).collect(),
            ..Options::default()
        };
        is_condition_passed(doc.root_element().unwrap(), &opt)
    }

    #[test]
    fn system_language() {
        assert!(passed("<g systemLanguage='en'/>", &["en"]));
        assert!(passed("<g systemLanguage='ru, en-US'/>", &["en"]));
        assert!(!passed("<g systemLanguage='ru'/>", &["en"]));
        assert!(passed("<g/>", &[]));
    }

    #[test]
    fn required_extensions() {
        assert!(!passed("<g requiredExtensions='http://example.org/ext'/>", &["en"]));
        assert!(passed(
            "<g requiredFeatures='http://www.w3.org/TR/SVG11/feature#Shape'/>",
            &["en"]
        ));
        assert!(!passed(
            "<g requiredFeatures='http://www.w3.org/TR/SVG11/feature#Font'/>",
            &["en"]
        ));
    }
}
