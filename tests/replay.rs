use svgrec::{
    hit_test, replay, BlendMode, DrawingContext, FillRule, ImageCommand, Opacity, Options, Path,
    PathCommand, Picture, Point, Rect, TextCommand, Transform,
};

// Logs calls and checks that states are released in the reverse order.
#[derive(Default)]
struct Log {
    next: usize,
    stack: Vec<usize>,
    max_depth: usize,
    draws: Vec<String>,
}

impl Log {
    fn push(&mut self) -> usize {
        self.next += 1;
        self.stack.push(self.next);
        self.max_depth = self.max_depth.max(self.stack.len());
        self.next
    }
}

impl DrawingContext for Log {
    type State = usize;

    fn push_clip_rect(&mut self, _: Rect) -> usize {
        self.push()
    }

    fn push_clip_path(&mut self, _: &Path, _: FillRule) -> usize {
        self.push()
    }

    fn push_transform(&mut self, _: Transform) -> usize {
        self.push()
    }

    fn push_layer(&mut self, _: Opacity, _: BlendMode) -> usize {
        self.push()
    }

    fn pop_state(&mut self, state: usize) {
        assert_eq!(self.stack.pop(), Some(state));
    }

    fn draw_path(&mut self, cmd: &PathCommand) {
        let id = cmd.element.as_ref().map(|e| e.id.clone()).unwrap_or_default();
        self.draws.push(id);
    }

    fn draw_image(&mut self, _: &ImageCommand) {}

    fn draw_text(&mut self, _: &TextCommand) {}
}

fn picture(text: &str) -> Picture {
    Picture::from_str(text, &Options::default()).unwrap()
}

#[test]
fn replay_releases_every_state() {
    let pic = picture(
        "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 50 50' width='100' height='100'>
            <clipPath id='c'><circle cx='10' cy='10' r='10'/></clipPath>
            <g opacity='0.5' transform='translate(5 5)'>
                <g clip-path='url(#c)'>
                    <rect id='a' width='20' height='20'/>
                </g>
                <rect id='b' x='30' width='10' height='10' mix-blend-mode='multiply'/>
            </g>
            <svg x='10' y='10' width='10' height='10' viewBox='0 0 1 1'>
                <rect id='d' width='1' height='1'/>
            </svg>
        </svg>",
    );

    let mut log = Log::default();
    replay::draw(&pic, &mut log, Transform::from_scale(2.0, 2.0));
    assert!(log.stack.is_empty());
    assert!(log.max_depth > 2);
    assert_eq!(log.draws, vec!["a", "b", "d"]);
}

#[test]
fn hit_inner_shape() {
    let pic = picture(
        "<svg xmlns='http://www.w3.org/2000/svg' width='100' height='100'>
            <rect id='left' width='40' height='100' fill='green'/>
            <g transform='translate(50 0)'>
                <rect id='outer' width='50' height='50' fill='none' stroke='black'/>
                <g transform='translate(10 10)'>
                    <circle id='inner' cx='10' cy='10' r='5'/>
                </g>
            </g>
            <rect id='right' x='50' y='60' width='50' height='40'/>
        </svg>",
    );

    let hits: Vec<_> = hit_test(&pic, Point::from_xy(70.0, 20.0))
        .into_iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(hits, vec!["inner"]);

    let hits: Vec<_> = hit_test(&pic, Point::from_xy(50.0, 25.0))
        .into_iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(hits, vec!["outer"]);

    assert!(hit_test(&pic, Point::from_xy(45.0, 25.0)).is_empty());
}

#[test]
fn hit_honors_clip() {
    let pic = picture(
        "<svg xmlns='http://www.w3.org/2000/svg' width='100' height='100'>
            <clipPath id='c'><rect width='10' height='10'/></clipPath>
            <rect id='bottom' width='100' height='100'/>
            <rect id='top' width='100' height='100' clip-path='url(#c)'/>
        </svg>",
    );

    let hits: Vec<_> = hit_test(&pic, Point::from_xy(5.0, 5.0))
        .into_iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(hits, vec!["top", "bottom"]);

    let hits: Vec<_> = hit_test(&pic, Point::from_xy(50.0, 50.0))
        .into_iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(hits, vec!["bottom"]);
}

#[cfg(feature = "raster")]
#[test]
fn raster_render() {
    let pic = picture(
        "<svg xmlns='http://www.w3.org/2000/svg' width='20' height='20' viewBox='0 0 10 10'>
            <rect width='5' height='10' fill='#0000ff'/>
        </svg>",
    );

    let size = pic.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).unwrap();
    svgrec::render(&pic, Transform::default(), &mut pixmap);

    let left = pixmap.pixel(4, 10).unwrap();
    assert_eq!((left.red(), left.green(), left.blue(), left.alpha()), (0, 0, 255, 255));
    let right = pixmap.pixel(15, 10).unwrap();
    assert_eq!(right.alpha(), 0);
}
