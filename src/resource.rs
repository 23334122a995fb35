// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

/// Loads external resources referenced by a document.
///
/// Used for `image` elements and `<?xml-stylesheet?>` instructions.
/// `data:` URLs are decoded internally and never reach the loader.
///
/// Paths are already resolved against [`Options::resources_dir`](crate::Options::resources_dir).
pub trait ResourceLoader: Send + Sync {
    /// Returns the resource content or `None` when it cannot be loaded.
    fn load(&self, path: &Path) -> Option<Vec<u8>>;
}

/// A resource loader that reads local files.
///
/// URLs and other non-path strings are simply not found.
#[derive(Clone, Copy, Default, Debug)]
pub struct FsResourceLoader;

impl ResourceLoader for FsResourceLoader {
    fn load(&self, path: &Path) -> Option<Vec<u8>> {
        if !path.is_file() {
            return None;
        }

        match std::fs::read(path) {
            Ok(data) => Some(data),
            Err(e) => {
                log::warn!("Failed to load '{}' cause {}.", path.display(), e);
                None
            }
        }
    }
}

/// A resource loader that never finds anything.
///
/// Useful for sandboxed processing.
#[derive(Clone, Copy, Default, Debug)]
pub struct NoResourceLoader;

impl ResourceLoader for NoResourceLoader {
    fn load(&self, _: &Path) -> Option<Vec<u8>> {
        None
    }
}

impl<F> ResourceLoader for F
where
    F: Fn(&Path) -> Option<Vec<u8>> + Send + Sync,
{
    fn load(&self, path: &Path) -> Option<Vec<u8>> {
        self(path)
    }
}
