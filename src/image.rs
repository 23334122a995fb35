// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use svgtree::{AId, DiagnosticCode, SvgNode};
use svgtypes::Length;

use crate::geom::fit_view_box;
use crate::recorder::{element_ref, Context, State};
use crate::{
    units, Command, Error, ImageCommand, ImageRendering, NoResourceLoader, NonZeroRect, OptionLog,
    Options, Picture, ResolvedStyle, Size, Units, Visibility,
};

/// An image data.
#[derive(Clone)]
pub enum ImageKind {
    /// A reference to raw JPEG data. Should be decoded by the caller.
    JPEG(Arc<Vec<u8>>),
    /// A reference to raw PNG data. Should be decoded by the caller.
    PNG(Arc<Vec<u8>>),
    /// A reference to raw GIF data. Should be decoded by the caller.
    GIF(Arc<Vec<u8>>),
    /// A reference to raw WebP data. Should be decoded by the caller.
    WEBP(Arc<Vec<u8>>),
    /// A recorded SVG image.
    SVG(Arc<Picture>),
}

impl std::fmt::Debug for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ImageKind::JPEG(_) => f.write_str("ImageKind::JPEG(..)"),
            ImageKind::PNG(_) => f.write_str("ImageKind::PNG(..)"),
            ImageKind::GIF(_) => f.write_str("ImageKind::GIF(..)"),
            ImageKind::WEBP(_) => f.write_str("ImageKind::WEBP(..)"),
            ImageKind::SVG(_) => f.write_str("ImageKind::SVG(..)"),
        }
    }
}

/// A not yet decoded image with a known size.
#[derive(Clone, Debug)]
pub struct ImageData {
    /// Image data.
    pub kind: ImageKind,
    /// Image size in pixels, or the picture size for SVG images.
    pub size: Size,
}

pub(crate) fn convert(
    node: SvgNode,
    style: &ResolvedStyle,
    state: &State,
    ctx: &mut Context,
    out: &mut Vec<Command>,
) -> Option<()> {
    let href = node
        .attribute_value(AId::Href)
        .log_none(|| log::warn!("Image lacks the 'xlink:href' attribute. Skipped."))?;

    let kind = get_href_data(&href, node, state.opt, ctx)?;

    let visibility: Visibility = style.parse(node, AId::Visibility).unwrap_or_default();
    if visibility != Visibility::Visible {
        return None;
    }

    let rendering: ImageRendering = style.parse(node, AId::ImageRendering).unwrap_or_default();

    let actual_size = match kind {
        ImageKind::JPEG(ref data)
        | ImageKind::PNG(ref data)
        | ImageKind::GIF(ref data)
        | ImageKind::WEBP(ref data) => imagesize::blob_size(data)
            .ok()
            .and_then(|size| Size::from_wh(size.width as f32, size.height as f32))
            .log_none(|| log::warn!("Image has an invalid size. Skipped."))?,
        ImageKind::SVG(ref picture) => picture.size(),
    };

    let x = units::convert_attr(node, AId::X, Units::UserSpaceOnUse, style, state, Length::zero());
    let y = units::convert_attr(node, AId::Y, Units::UserSpaceOnUse, style, state, Length::zero());
    let mut width = units::convert_attr(
        node,
        AId::Width,
        Units::UserSpaceOnUse,
        style,
        state,
        Length::new_number(actual_size.width() as f64),
    );
    let mut height = units::convert_attr(
        node,
        AId::Height,
        Units::UserSpaceOnUse,
        style,
        state,
        Length::new_number(actual_size.height() as f64),
    );

    match (node.has_attribute(AId::Width), node.has_attribute(AId::Height)) {
        (true, false) => {
            // Only width was defined, so we need to scale height accordingly.
            height = actual_size.height() * (width / actual_size.width());
        }
        (false, true) => {
            // Only height was defined, so we need to scale width accordingly.
            width = actual_size.width() * (height / actual_size.height());
        }
        _ => {}
    };

    let rect = NonZeroRect::from_xywh(x, y, width, height)
        .log_none(|| log::warn!("Image has an invalid size. Skipped."))?;

    let aspect: svgtypes::AspectRatio = node
        .attribute(AId::PreserveAspectRatio)
        .unwrap_or_default();
    let dst = fit_view_box(actual_size, rect, aspect)?;

    let cmd = Command::DrawImage(ImageCommand {
        data: Arc::new(ImageData {
            kind,
            size: actual_size,
        }),
        src: actual_size.to_non_zero_rect(0.0, 0.0),
        dst,
        rendering,
        element: Some(element_ref(node)),
    });

    if aspect.slice {
        out.push(Command::Save);
        out.push(Command::ClipRect(rect.to_rect()));
        out.push(cmd);
        out.push(Command::Restore);
    } else {
        out.push(cmd);
    }

    Some(())
}

fn get_href_data(href: &str, node: SvgNode, opt: &Options, ctx: &mut Context) -> Option<ImageKind> {
    if let Ok(url) = data_url::DataUrl::process(href) {
        let (data, _) = url.decode_to_vec().ok()?;

        let mime = format!(
            "{}/{}",
            url.mime_type().type_.as_str(),
            url.mime_type().subtype.as_str()
        );

        let kind = match mime.as_str() {
            "image/jpg" | "image/jpeg" => Some(ImageKind::JPEG(Arc::new(data))),
            "image/png" => Some(ImageKind::PNG(Arc::new(data))),
            "image/gif" => Some(ImageKind::GIF(Arc::new(data))),
            "image/webp" => Some(ImageKind::WEBP(Arc::new(data))),
            "image/svg+xml" => load_sub_svg(&data, opt),
            _ => match get_image_data_format(&data) {
                Some(kind) => Some(kind(Arc::new(data))),
                None => load_sub_svg(&data, opt),
            },
        };

        if kind.is_none() {
            decoding_failed("data URL", node, ctx);
        }

        kind
    } else {
        let path = opt.get_abs_path(std::path::Path::new(href));
        let data = match opt.resource_loader.load(&path) {
            Some(data) => data,
            None => {
                ctx.resource_failed(
                    DiagnosticCode::ResourceNotFound,
                    format!("Failed to load '{}'. Skipped.", href),
                    Error::ResourceNotFound(href.to_string()),
                    node,
                );
                return None;
            }
        };

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let kind = match ext.as_deref() {
            Some("svg") | Some("svgz") => load_sub_svg(&data, opt),
            _ => get_image_data_format(&data).map(|kind| kind(Arc::new(data))),
        };

        if kind.is_none() {
            decoding_failed(href, node, ctx);
        }

        kind
    }
}

fn decoding_failed(name: &str, node: SvgNode, ctx: &mut Context) {
    ctx.resource_failed(
        DiagnosticCode::Unsupported,
        format!("'{}' is not a PNG, JPEG, GIF, WebP or SVG(Z) image.", name),
        Error::ResourceDecodingFailed(name.to_string()),
        node,
    );
}

/// Checks that data has a PNG, a GIF, a JPEG or a WebP magic bytes.
fn get_image_data_format(data: &[u8]) -> Option<fn(Arc<Vec<u8>>) -> ImageKind> {
    match imagesize::image_type(data).ok()? {
        imagesize::ImageType::Gif => Some(ImageKind::GIF),
        imagesize::ImageType::Jpeg => Some(ImageKind::JPEG),
        imagesize::ImageType::Png => Some(ImageKind::PNG),
        imagesize::ImageType::Webp => Some(ImageKind::WEBP),
        _ => None,
    }
}

/// Records an SVG image.
///
/// A referenced SVG image cannot load any external resources by itself.
fn load_sub_svg(data: &[u8], opt: &Options) -> Option<ImageKind> {
    let sub_opt = Options {
        resources_dir: None,
        dpi: opt.dpi,
        font_family: opt.font_family.clone(),
        font_size: opt.font_size,
        languages: opt.languages.clone(),
        default_size: opt.default_size,
        style_sheet: None,
        strict_resources: false,
        zero_bbox_paint: opt.zero_bbox_paint,
        resource_loader: Box::new(NoResourceLoader),
        text_shaper: None,
    };

    match Picture::from_data(data, &sub_opt) {
        Ok(picture) => Some(ImageKind::SVG(Arc::new(picture))),
        Err(_) => {
            log::warn!("Failed to load subsvg image.");
            None
        }
    }
}
