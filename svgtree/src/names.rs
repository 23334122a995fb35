// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

macro_rules! names {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        #[allow(missing_docs)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            /// Parses a name.
            #[allow(clippy::should_implement_trait)]
            pub fn from_str(text: &str) -> Option<Self> {
                match text {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Returns the name as it appears in markup.
            pub fn to_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.to_str())
            }
        }
    };
}

names! {
    /// An SVG element name.
    EId {
        A => "a",
        Circle => "circle",
        ClipPath => "clipPath",
        Defs => "defs",
        Desc => "desc",
        Ellipse => "ellipse",
        FeBlend => "feBlend",
        FeColorMatrix => "feColorMatrix",
        FeComposite => "feComposite",
        FeFlood => "feFlood",
        FeGaussianBlur => "feGaussianBlur",
        FeImage => "feImage",
        FeMerge => "feMerge",
        FeMergeNode => "feMergeNode",
        FeOffset => "feOffset",
        Filter => "filter",
        ForeignObject => "foreignObject",
        G => "g",
        Image => "image",
        Line => "line",
        LinearGradient => "linearGradient",
        Marker => "marker",
        Mask => "mask",
        Metadata => "metadata",
        Path => "path",
        Pattern => "pattern",
        Polygon => "polygon",
        Polyline => "polyline",
        RadialGradient => "radialGradient",
        Rect => "rect",
        Script => "script",
        Stop => "stop",
        Style => "style",
        Svg => "svg",
        Switch => "switch",
        Symbol => "symbol",
        Text => "text",
        TextPath => "textPath",
        Title => "title",
        TSpan => "tspan",
        Use => "use",
        View => "view",
    }
}

names! {
    /// An SVG attribute name.
    ///
    /// Also used as a property name during style resolution.
    AId {
        AlignmentBaseline => "alignment-baseline",
        BaselineShift => "baseline-shift",
        BaseProfile => "baseProfile",
        Class => "class",
        ClipPath => "clip-path",
        ClipPathUnits => "clipPathUnits",
        ClipRule => "clip-rule",
        Color => "color",
        ColorInterpolation => "color-interpolation",
        ColorInterpolationFilters => "color-interpolation-filters",
        ColorRendering => "color-rendering",
        Crossorigin => "crossorigin",
        Cx => "cx",
        Cy => "cy",
        D => "d",
        Direction => "direction",
        Display => "display",
        DominantBaseline => "dominant-baseline",
        Dx => "dx",
        Dy => "dy",
        Fill => "fill",
        FillOpacity => "fill-opacity",
        FillRule => "fill-rule",
        Filter => "filter",
        FloodColor => "flood-color",
        FloodOpacity => "flood-opacity",
        FontFamily => "font-family",
        FontKerning => "font-kerning",
        FontSize => "font-size",
        FontSizeAdjust => "font-size-adjust",
        FontStretch => "font-stretch",
        FontStyle => "font-style",
        FontVariant => "font-variant",
        FontWeight => "font-weight",
        Fr => "fr",
        Fx => "fx",
        Fy => "fy",
        GradientTransform => "gradientTransform",
        GradientUnits => "gradientUnits",
        Height => "height",
        Href => "href",
        Id => "id",
        ImageRendering => "image-rendering",
        Isolation => "isolation",
        Lang => "lang",
        LengthAdjust => "lengthAdjust",
        LetterSpacing => "letter-spacing",
        LightingColor => "lighting-color",
        MarkerEnd => "marker-end",
        MarkerMid => "marker-mid",
        MarkerStart => "marker-start",
        Mask => "mask",
        MaskContentUnits => "maskContentUnits",
        MaskType => "mask-type",
        MaskUnits => "maskUnits",
        Media => "media",
        Method => "method",
        MixBlendMode => "mix-blend-mode",
        Offset => "offset",
        Opacity => "opacity",
        Overflow => "overflow",
        PaintOrder => "paint-order",
        Path => "path",
        PathLength => "pathLength",
        PatternContentUnits => "patternContentUnits",
        PatternTransform => "patternTransform",
        PatternUnits => "patternUnits",
        PointerEvents => "pointer-events",
        Points => "points",
        PreserveAspectRatio => "preserveAspectRatio",
        R => "r",
        RefX => "refX",
        RefY => "refY",
        RequiredExtensions => "requiredExtensions",
        RequiredFeatures => "requiredFeatures",
        Rotate => "rotate",
        Rx => "rx",
        Ry => "ry",
        ShapeRendering => "shape-rendering",
        Side => "side",
        Spacing => "spacing",
        SpreadMethod => "spreadMethod",
        StartOffset => "startOffset",
        StopColor => "stop-color",
        StopOpacity => "stop-opacity",
        Stroke => "stroke",
        StrokeDasharray => "stroke-dasharray",
        StrokeDashoffset => "stroke-dashoffset",
        StrokeLinecap => "stroke-linecap",
        StrokeLinejoin => "stroke-linejoin",
        StrokeMiterlimit => "stroke-miterlimit",
        StrokeOpacity => "stroke-opacity",
        StrokeWidth => "stroke-width",
        Style => "style",
        SystemLanguage => "systemLanguage",
        Tabindex => "tabindex",
        Target => "target",
        TextAnchor => "text-anchor",
        TextDecoration => "text-decoration",
        TextLength => "textLength",
        TextRendering => "text-rendering",
        Title => "title",
        Transform => "transform",
        Type => "type",
        UnicodeBidi => "unicode-bidi",
        Version => "version",
        VectorEffect => "vector-effect",
        ViewBox => "viewBox",
        Visibility => "visibility",
        WhiteSpace => "white-space",
        Width => "width",
        WordSpacing => "word-spacing",
        WritingMode => "writing-mode",
        X => "x",
        X1 => "x1",
        X2 => "x2",
        XmlSpace => "xml:space",
        Y => "y",
        Y1 => "y1",
        Y2 => "y2",
        ZoomAndPan => "zoomAndPan",
    }
}

impl EId {
    /// Checks if this is a
    /// [graphics element](https://www.w3.org/TR/SVG11/intro.html#TermGraphicsElement).
    pub fn is_graphic(&self) -> bool {
        matches!(
            self,
            EId::Circle
                | EId::Ellipse
                | EId::Image
                | EId::Line
                | EId::Path
                | EId::Polygon
                | EId::Polyline
                | EId::Rect
                | EId::Text
                | EId::Use
        )
    }

    /// Checks if this is a
    /// [gradient element](https://www.w3.org/TR/SVG11/intro.html#TermGradientElement).
    pub fn is_gradient(&self) -> bool {
        matches!(self, EId::LinearGradient | EId::RadialGradient)
    }

    /// Checks if this is a
    /// [paint server element](https://www.w3.org/TR/SVG11/intro.html#TermPaint).
    pub fn is_paint_server(&self) -> bool {
        matches!(
            self,
            EId::LinearGradient | EId::RadialGradient | EId::Pattern
        )
    }

    /// Checks that the attribute is allowed on this element.
    ///
    /// Core and conditional attributes are allowed everywhere. Presentation
    /// attributes are allowed on everything except descriptive elements.
    /// Elements without a detailed model accept any known attribute.
    pub fn allows(&self, aid: AId) -> bool {
        if is_core_attribute(aid) {
            return true;
        }

        if matches!(
            self,
            EId::Desc | EId::Title | EId::Metadata | EId::Script | EId::Style
        ) {
            return match self {
                EId::Style => matches!(aid, AId::Type | AId::Media | AId::Title),
                EId::Script => matches!(aid, AId::Type | AId::Href | AId::Crossorigin),
                _ => false,
            };
        }

        if aid.is_presentation() {
            return true;
        }

        use AId::*;
        match self {
            EId::Svg => matches!(
                aid,
                X | Y | Width | Height | ViewBox | PreserveAspectRatio | Version
                    | BaseProfile | ZoomAndPan
            ),
            EId::G | EId::Defs | EId::Switch => false,
            EId::A => matches!(aid, Href | Target),
            EId::Symbol => matches!(
                aid,
                X | Y | Width | Height | ViewBox | PreserveAspectRatio | RefX | RefY
            ),
            EId::Use => matches!(aid, X | Y | Width | Height | Href),
            EId::Rect => matches!(aid, X | Y | Width | Height | Rx | Ry | PathLength),
            EId::Circle => matches!(aid, Cx | Cy | R | PathLength),
            EId::Ellipse => matches!(aid, Cx | Cy | Rx | Ry | PathLength),
            EId::Line => matches!(aid, X1 | Y1 | X2 | Y2 | PathLength),
            EId::Polyline | EId::Polygon => matches!(aid, Points | PathLength),
            EId::Path => matches!(aid, D | PathLength),
            EId::Text | EId::TSpan => {
                matches!(aid, X | Y | Dx | Dy | Rotate | TextLength | LengthAdjust)
            }
            EId::TextPath => matches!(
                aid,
                Href | StartOffset | Method | Spacing | Side | Path | TextLength | LengthAdjust
            ),
            EId::Image => matches!(
                aid,
                X | Y | Width | Height | Href | PreserveAspectRatio | Crossorigin
            ),
            EId::LinearGradient => matches!(
                aid,
                X1 | Y1 | X2 | Y2 | GradientUnits | GradientTransform | SpreadMethod | Href
            ),
            EId::RadialGradient => matches!(
                aid,
                Cx | Cy | R | Fx | Fy | Fr | GradientUnits | GradientTransform | SpreadMethod
                    | Href
            ),
            EId::Stop => matches!(aid, Offset),
            EId::Pattern => matches!(
                aid,
                X | Y
                    | Width
                    | Height
                    | PatternUnits
                    | PatternContentUnits
                    | PatternTransform
                    | ViewBox
                    | PreserveAspectRatio
                    | Href
            ),
            EId::ClipPath => matches!(aid, ClipPathUnits),
            EId::Mask => matches!(
                aid,
                X | Y | Width | Height | MaskUnits | MaskContentUnits
            ),
            _ => true,
        }
    }
}

fn is_core_attribute(aid: AId) -> bool {
    matches!(
        aid,
        AId::Id
            | AId::Class
            | AId::Style
            | AId::Lang
            | AId::Tabindex
            | AId::XmlSpace
            | AId::SystemLanguage
            | AId::RequiredExtensions
            | AId::RequiredFeatures
    )
}

impl AId {
    /// Checks that the attribute is a presentation attribute, i.e. a CSS property.
    pub fn is_presentation(&self) -> bool {
        matches!(
            self,
            AId::AlignmentBaseline
                | AId::BaselineShift
                | AId::ClipPath
                | AId::ClipRule
                | AId::Color
                | AId::ColorInterpolation
                | AId::ColorInterpolationFilters
                | AId::ColorRendering
                | AId::Direction
                | AId::Display
                | AId::DominantBaseline
                | AId::Fill
                | AId::FillOpacity
                | AId::FillRule
                | AId::Filter
                | AId::FloodColor
                | AId::FloodOpacity
                | AId::FontFamily
                | AId::FontKerning // technically not presentation
                | AId::FontSize
                | AId::FontSizeAdjust
                | AId::FontStretch
                | AId::FontStyle
                | AId::FontVariant
                | AId::FontWeight
                | AId::ImageRendering
                | AId::Isolation // technically not presentation
                | AId::LetterSpacing
                | AId::LightingColor
                | AId::MarkerEnd
                | AId::MarkerMid
                | AId::MarkerStart
                | AId::Mask
                | AId::MaskType
                | AId::MixBlendMode // technically not presentation
                | AId::Opacity
                | AId::Overflow
                | AId::PaintOrder
                | AId::PointerEvents
                | AId::ShapeRendering
                | AId::StopColor
                | AId::StopOpacity
                | AId::Stroke
                | AId::StrokeDasharray
                | AId::StrokeDashoffset
                | AId::StrokeLinecap
                | AId::StrokeLinejoin
                | AId::StrokeMiterlimit
                | AId::StrokeOpacity
                | AId::StrokeWidth
                | AId::TextAnchor
                | AId::TextDecoration
                | AId::TextRendering
                | AId::Transform
                | AId::UnicodeBidi
                | AId::VectorEffect
                | AId::Visibility
                | AId::WhiteSpace
                | AId::WordSpacing
                | AId::WritingMode
        )
    }

    /// Checks that the property is inherited by default.
    pub fn is_inheritable(&self) -> bool {
        self.is_presentation() && !is_non_inheritable(*self)
    }
}

fn is_non_inheritable(id: AId) -> bool {
    matches!(
        id,
        AId::AlignmentBaseline
            | AId::BaselineShift
            | AId::ClipPath
            | AId::Display
            | AId::DominantBaseline
            | AId::Filter
            | AId::FloodColor
            | AId::FloodOpacity
            | AId::Isolation
            | AId::LightingColor
            | AId::Mask
            | AId::MaskType
            | AId::MixBlendMode
            | AId::Opacity
            | AId::Overflow
            | AId::StopColor
            | AId::StopOpacity
            | AId::TextDecoration
            | AId::Transform
            | AId::UnicodeBidi
            | AId::VectorEffect
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        assert_eq!(EId::from_str("linearGradient"), Some(EId::LinearGradient));
        assert_eq!(EId::from_str("lineargradient"), None);
        assert_eq!(AId::from_str("stroke-width"), Some(AId::StrokeWidth));
        assert_eq!(AId::StrokeWidth.to_str(), "stroke-width");
    }

    #[test]
    fn allowed_attributes() {
        assert!(EId::Rect.allows(AId::Rx));
        assert!(EId::Rect.allows(AId::Fill));
        assert!(EId::Rect.allows(AId::Id));
        assert!(!EId::Rect.allows(AId::Cx));
        assert!(!EId::Circle.allows(AId::Width));
        assert!(!EId::Title.allows(AId::Fill));
        assert!(EId::Filter.allows(AId::Width));
    }

    #[test]
    fn inheritance() {
        assert!(AId::Fill.is_inheritable());
        assert!(AId::FontSize.is_inheritable());
        assert!(!AId::Opacity.is_inheritable());
        assert!(!AId::Transform.is_inheritable());
        assert!(!AId::X.is_inheritable());
    }
}
