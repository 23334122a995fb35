use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use svgrec::{DisposeOutcome, Options, Picture, SharedPicture};

fn shared() -> Arc<SharedPicture> {
    let text = "<svg xmlns='http://www.w3.org/2000/svg'><rect width='10' height='10'/></svg>";
    let picture = Picture::from_str(text, &Options::default()).unwrap();
    Arc::new(SharedPicture::new(picture))
}

#[test]
fn dispose_waits_for_other_threads() {
    let shared = shared();
    let guard = shared.begin_render().unwrap();
    let rendered = Arc::new(AtomicBool::new(false));

    let handle = {
        let shared = shared.clone();
        let rendered = rendered.clone();
        std::thread::spawn(move || {
            let outcome = shared.dispose();
            // The render has to be finished by now.
            assert!(rendered.load(Ordering::SeqCst));
            outcome
        })
    };

    std::thread::sleep(Duration::from_millis(50));
    assert!(!guard.commands().is_empty());
    rendered.store(true, Ordering::SeqCst);
    drop(guard);

    assert_eq!(handle.join().unwrap(), DisposeOutcome::Disposed);
    assert!(shared.is_disposed());
    assert!(shared.begin_render().is_none());
}

#[test]
fn guard_dropped_on_another_thread() {
    let shared = shared();
    let guard = shared.begin_render().unwrap();
    std::thread::scope(|s| {
        s.spawn(move || drop(guard));
    });

    let outcome = std::thread::scope(|s| s.spawn(|| shared.dispose()).join().unwrap());
    assert_eq!(outcome, DisposeOutcome::Disposed);
    assert!(shared.begin_render().is_none());
}

#[test]
fn dispose_twice() {
    let shared = shared();
    assert_eq!(shared.dispose(), DisposeOutcome::Disposed);
    assert_eq!(shared.dispose(), DisposeOutcome::AlreadyDisposed);
}

#[test]
fn render_after_dispose_is_a_noop() {
    struct Count(usize);

    impl svgrec::DrawingContext for Count {
        type State = ();

        fn push_clip_rect(&mut self, _: svgrec::Rect) {}
        fn push_clip_path(&mut self, _: &svgrec::Path, _: svgrec::FillRule) {}
        fn push_transform(&mut self, _: svgrec::Transform) {}
        fn push_layer(&mut self, _: svgrec::Opacity, _: svgrec::BlendMode) {}
        fn pop_state(&mut self, _: ()) {}

        fn draw_path(&mut self, _: &svgrec::PathCommand) {
            self.0 += 1;
        }

        fn draw_image(&mut self, _: &svgrec::ImageCommand) {}
        fn draw_text(&mut self, _: &svgrec::TextCommand) {}
    }

    let shared = shared();
    let mut ctx = Count(0);
    assert!(shared.render(&mut ctx, svgrec::Transform::default()));
    assert_eq!(ctx.0, 1);

    shared.dispose();
    assert!(!shared.render(&mut ctx, svgrec::Transform::default()));
    assert_eq!(ctx.0, 1);
}

#[test]
fn concurrent_renders() {
    let shared = shared();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    if let Some(guard) = shared.begin_render() {
                        assert!(!guard.commands().is_empty());
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(shared.dispose(), DisposeOutcome::Disposed);
}
