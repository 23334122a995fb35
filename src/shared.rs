// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::ThreadId;

use crate::replay::{self, DrawingContext};
use crate::{Picture, Transform};

/// A result of [`SharedPicture::dispose`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DisposeOutcome {
    /// Resources were released.
    Disposed,
    /// The current thread is rendering this picture. Resources will be
    /// released when the last render ends.
    Deferred,
    /// Already disposed or a dispose is already pending.
    AlreadyDisposed,
}

struct Inner {
    picture: Option<Arc<Picture>>,
    dispose_requested: bool,
    // One entry per active render.
    render_threads: Vec<ThreadId>,
}

/// A picture that can be rendered and disposed from different threads.
///
/// Disposing never frees a picture in the middle of a render:
///
/// - a dispose from another thread blocks until active renders end;
/// - a dispose from inside a render on the same thread is deferred
///   to the end of that render instead of deadlocking;
/// - renders after a dispose are no-ops.
pub struct SharedPicture {
    inner: Mutex<Inner>,
    idle: Condvar,
}

impl SharedPicture {
    /// Creates a new shared picture.
    pub fn new(picture: Picture) -> Self {
        SharedPicture {
            inner: Mutex::new(Inner {
                picture: Some(Arc::new(picture)),
                dispose_requested: false,
                render_threads: Vec::new(),
            }),
            idle: Condvar::new(),
        }
    }

    // A panic during a render must not make the picture unusable.
    fn lock(&self) -> MutexGuard<Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts a render.
    ///
    /// Returns `None` when the picture is disposed or a dispose is pending.
    pub fn begin_render(&self) -> Option<RenderGuard> {
        let mut inner = self.lock();
        if inner.dispose_requested {
            return None;
        }

        let picture = inner.picture.clone()?;
        let thread = std::thread::current().id();
        inner.render_threads.push(thread);
        Some(RenderGuard {
            owner: self,
            picture,
            thread,
        })
    }

    // `thread` is the one that started the render. A guard can be dropped elsewhere.
    fn end_render(&self, thread: ThreadId) {
        let mut inner = self.lock();
        if let Some(idx) = inner.render_threads.iter().rposition(|t| *t == thread) {
            inner.render_threads.remove(idx);
        }

        if inner.render_threads.is_empty() && inner.dispose_requested {
            inner.picture = None;
            log::debug!("A deferred picture dispose is done.");
        }

        self.idle.notify_all();
    }

    /// Releases the picture.
    ///
    /// Blocks while other threads are rendering. Deferred when called
    /// from a thread that has an active render.
    pub fn dispose(&self) -> DisposeOutcome {
        self.dispose_from(std::thread::current().id())
    }

    fn dispose_from(&self, thread: ThreadId) -> DisposeOutcome {
        let mut inner = self.lock();
        if inner.picture.is_none() || inner.dispose_requested {
            return DisposeOutcome::AlreadyDisposed;
        }

        inner.dispose_requested = true;

        if inner.render_threads.contains(&thread) {
            return DisposeOutcome::Deferred;
        }

        while !inner.render_threads.is_empty() {
            inner = self.idle.wait(inner).unwrap_or_else(|e| e.into_inner());
        }

        // A render could have released it while we were waiting.
        inner.picture = None;
        DisposeOutcome::Disposed
    }

    /// Checks that the picture is disposed or a dispose is pending.
    pub fn is_disposed(&self) -> bool {
        let inner = self.lock();
        inner.picture.is_none() || inner.dispose_requested
    }

    /// Replays the picture onto a drawing context.
    ///
    /// Returns `false` when the picture is disposed.
    pub fn render<C: DrawingContext>(&self, ctx: &mut C, transform: Transform) -> bool {
        match self.begin_render() {
            Some(guard) => {
                replay::draw(&guard, ctx, transform);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for SharedPicture {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SharedPicture")
            .field("disposed", &inner.picture.is_none())
            .field("dispose_requested", &inner.dispose_requested)
            .field("active_renders", &inner.render_threads.len())
            .finish()
    }
}

/// An active render.
///
/// Ends the render on drop.
pub struct RenderGuard<'a> {
    owner: &'a SharedPicture,
    picture: Arc<Picture>,
    thread: ThreadId,
}

impl RenderGuard<'_> {
    /// Requests a dispose of the picture being rendered.
    ///
    /// Never blocks. Same as calling [`SharedPicture::dispose`] from the thread
    /// that started this render.
    pub fn dispose(&self) -> DisposeOutcome {
        self.owner.dispose_from(self.thread)
    }
}

impl std::ops::Deref for RenderGuard<'_> {
    type Target = Picture;

    fn deref(&self) -> &Self::Target {
        &self.picture
    }
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.owner.end_render(self.thread);
    }
}

impl std::fmt::Debug for RenderGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RenderGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Size, ViewBox};

    fn picture() -> Picture {
        let size = Size::from_wh(1.0, 1.0).unwrap();
        Picture::new(
            Vec::new(),
            size,
            ViewBox {
                rect: size.to_non_zero_rect(0.0, 0.0),
                aspect: Default::default(),
            },
        )
    }

    #[test]
    fn dispose_inside_render_is_deferred() {
        let shared = SharedPicture::new(picture());
        let guard = shared.begin_render().unwrap();
        assert_eq!(guard.dispose(), DisposeOutcome::Deferred);
        assert!(shared.is_disposed());
        assert!(shared.begin_render().is_none());
        drop(guard);
        assert!(shared.lock().picture.is_none());
        assert_eq!(shared.dispose(), DisposeOutcome::AlreadyDisposed);
    }

    #[test]
    fn nested_renders() {
        let shared = SharedPicture::new(picture());
        let g1 = shared.begin_render().unwrap();
        let g2 = shared.begin_render().unwrap();
        assert_eq!(shared.dispose(), DisposeOutcome::Deferred);
        drop(g2);
        assert!(shared.lock().picture.is_some());
        drop(g1);
        assert!(shared.lock().picture.is_none());
    }

    #[test]
    fn guard_moved_to_another_thread() {
        let shared = SharedPicture::new(picture());
        let guard = shared.begin_render().unwrap();
        std::thread::scope(|s| {
            s.spawn(move || {
                assert_eq!(guard.dispose(), DisposeOutcome::Deferred);
                drop(guard);
            });
        });

        assert!(shared.lock().render_threads.is_empty());
        assert!(shared.lock().picture.is_none());
    }
}
