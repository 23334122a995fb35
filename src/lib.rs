// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`svgrec` records an [SVG] document into a list of canvas commands.

The pipeline is:

1. [`svgtree`] parses a document into a read-only tree and builds a symbol table.
1. [`StyleResolver`] computes an effective style of each element.
1. The recorder resolves references, expands `use` elements and emits a [`Picture`].
1. [`replay::draw`] plays a picture back into any [`DrawingContext`].

Data problems never fail the pipeline. They are reported as diagnostics
alongside the best-effort picture.

```no_run
let opt = svgrec::Options::default();
let data = std::fs::read("image.svg").unwrap();
let rec = svgrec::Recording::from_data(&data, &opt).unwrap();
for diag in &rec.diagnostics {
    println!("{}", diag.code.as_str());
}
```

[SVG]: https://en.wikipedia.org/wiki/Scalable_Vector_Graphics
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::upper_case_acronyms)]

mod clip;
mod geom;
mod hit_test;
mod image;
mod mask;
mod options;
mod paint;
mod paint_server;
mod picture;
mod recorder;
pub mod replay;
mod resource;
mod shapes;
mod shared;
#[cfg(feature = "raster")]
pub mod skia;
mod style;
mod switch;
mod text;
mod units;
mod use_node;

pub use svgtree;
pub use svgtypes;
pub use tiny_skia_path;

pub use crate::geom::*;
pub use crate::hit_test::hit_test;
pub use crate::image::{ImageData, ImageKind};
pub use crate::options::{Options, ZeroBBoxPaint};
pub use crate::paint::*;
pub use crate::picture::{Command, ElementRef, ImageCommand, PathCommand, Picture, TextCommand};
pub use crate::recorder::{record, Recording, MAX_INSTANCES};
pub use crate::replay::DrawingContext;
pub use crate::resource::{FsResourceLoader, NoResourceLoader, ResourceLoader};
pub use crate::shared::{DisposeOutcome, RenderGuard, SharedPicture};
#[cfg(feature = "raster")]
pub use crate::skia::render;
pub use crate::style::{
    parse_declarations, Declaration, Origin, Property, ResolvedStyle, StyleResolver, StyleSheet,
};
pub use crate::text::{Font, FontStretch, FontStyle, ShapedText, TextShaper};

/// List of all errors.
#[derive(Debug)]
pub enum Error {
    /// Only UTF-8 content are supported.
    NotAnUtf8Str,

    /// Compressed SVG must use the GZip algorithm.
    MalformedGZip,

    /// An external resource cannot be loaded.
    ///
    /// Returned only when [`Options::strict_resources`] is set.
    ResourceNotFound(String),

    /// An external resource cannot be decoded.
    ///
    /// Returned only when [`Options::strict_resources`] is set.
    ResourceDecodingFailed(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::NotAnUtf8Str => {
                write!(f, "provided data has not an UTF-8 encoding")
            }
            Error::MalformedGZip => {
                write!(f, "provided data has a malformed GZip content")
            }
            Error::ResourceNotFound(ref path) => {
                write!(f, "resource '{}' cannot be loaded", path)
            }
            Error::ResourceDecodingFailed(ref path) => {
                write!(f, "resource '{}' cannot be decoded", path)
            }
        }
    }
}

impl std::error::Error for Error {}

trait OptionLog {
    fn log_none<F: FnOnce()>(self, f: F) -> Self;
}

impl<T> OptionLog for Option<T> {
    #[inline]
    fn log_none<F: FnOnce()>(self, f: F) -> Self {
        self.or_else(|| {
            f();
            None
        })
    }
}

impl Picture {
    /// Parses and records an SVG string.
    ///
    /// Diagnostics are logged and dropped. Use [`Recording`] to keep them.
    pub fn from_str(text: &str, opt: &Options) -> Result<Self, Error> {
        Recording::from_str(text, opt).map(|rec| rec.picture)
    }

    /// Parses and records SVG data.
    ///
    /// Can contain an SVG string or a gzip compressed data.
    pub fn from_data(data: &[u8], opt: &Options) -> Result<Self, Error> {
        Recording::from_data(data, opt).map(|rec| rec.picture)
    }
}

/// Decompresses an SVGZ file.
pub fn decompress_svgz(data: &[u8]) -> Result<Vec<u8>, Error> {
    use std::io::Read;

    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decoded = Vec::with_capacity(data.len() * 2);
    decoder
        .read_to_end(&mut decoded)
        .map_err(|_| Error::MalformedGZip)?;
    Ok(decoded)
}
