// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::{Color, FsResourceLoader, ResourceLoader, Size, TextShaper};

/// A paint fallback for `objectBoundingBox` paint servers applied to zero-sized shapes.
///
/// Gradients and patterns with `objectBoundingBox` units cannot be mapped onto
/// a shape without a width or a height, like a horizontal line.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ZeroBBoxPaint {
    /// Use the fallback color from `url(#id) <color>`, when present. Otherwise, no paint.
    Fallback,
    /// Never paint.
    None,
    /// Always use the specified color.
    Color(Color),
}

impl Default for ZeroBBoxPaint {
    fn default() -> Self {
        ZeroBBoxPaint::Fallback
    }
}

/// Processing options.
pub struct Options {
    /// Directory that will be used during relative paths resolving.
    ///
    /// Expected to be the same as the directory that contains the SVG file,
    /// but can be set to any.
    ///
    /// Default: `None`
    pub resources_dir: Option<std::path::PathBuf>,

    /// Target DPI.
    ///
    /// Impacts units conversion.
    ///
    /// Default: 96.0
    pub dpi: f32,

    /// A default font family.
    ///
    /// Will be used when no `font-family` property is set in the SVG.
    ///
    /// Default: Times New Roman
    pub font_family: String,

    /// A default font size.
    ///
    /// Will be used when no `font-size` property is set in the SVG.
    ///
    /// Default: 12
    pub font_size: f32,

    /// A list of languages.
    ///
    /// Will be used to resolve a `systemLanguage` conditional attribute.
    ///
    /// Format: en, en-US.
    ///
    /// Default: `[en]`
    pub languages: Vec<String>,

    /// Default viewport size to assume if there is no `viewBox` attribute and
    /// the `width` or `height` attributes are relative.
    ///
    /// Default: `(100, 100)`
    pub default_size: Size,

    /// A CSS style sheet that should be injected into the SVG.
    ///
    /// Applied after all the style sheets from the document,
    /// so it can be used to override them.
    ///
    /// Default: `None`
    pub style_sheet: Option<String>,

    /// Turns resources that cannot be loaded into a hard error.
    ///
    /// When not set, a missing image or style sheet is reported as
    /// a `resource-not-found` diagnostic and skipped.
    ///
    /// Default: false
    pub strict_resources: bool,

    /// Paint used by `objectBoundingBox` paint servers on zero-sized shapes.
    ///
    /// Default: `ZeroBBoxPaint::Fallback`
    pub zero_bbox_paint: ZeroBBoxPaint,

    /// Loads external images and style sheets.
    ///
    /// Default: [`FsResourceLoader`]
    pub resource_loader: Box<dyn ResourceLoader>,

    /// Shapes text runs.
    ///
    /// When not set, `text` elements are skipped.
    ///
    /// Default: `None`
    pub text_shaper: Option<Box<dyn TextShaper>>,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            resources_dir: None,
            dpi: 96.0,
            // Default font is user-agent dependent so we can use whichever we like.
            font_family: "Times New Roman".to_owned(),
            font_size: 12.0,
            languages: vec!["en".to_string()],
            default_size: Size::from_wh(100.0, 100.0).unwrap(),
            style_sheet: None,
            strict_resources: false,
            zero_bbox_paint: ZeroBBoxPaint::default(),
            resource_loader: Box::new(FsResourceLoader),
            text_shaper: None,
        }
    }
}

impl Options {
    /// Converts a relative path into absolute relative to the SVG file itself.
    ///
    /// If `Options::resources_dir` is not set, returns itself.
    pub fn get_abs_path(&self, rel_path: &std::path::Path) -> std::path::PathBuf {
        match self.resources_dir {
            Some(ref dir) => dir.join(rel_path),
            None => rel_path.into(),
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("resources_dir", &self.resources_dir)
            .field("dpi", &self.dpi)
            .field("font_family", &self.font_family)
            .field("font_size", &self.font_size)
            .field("languages", &self.languages)
            .field("default_size", &self.default_size)
            .field("style_sheet", &self.style_sheet)
            .field("strict_resources", &self.strict_resources)
            .field("zero_bbox_paint", &self.zero_bbox_paint)
            .finish_non_exhaustive()
    }
}
