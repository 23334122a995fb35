use svgrec::svgtree::DiagnosticCode;
use svgrec::{Command, Options, Paint, Picture, Rect, Recording, Transform};

fn record(text: &str) -> Recording {
    Recording::from_str(text, &Options::default()).unwrap()
}

// A tiny deterministic generator, so failures are reproducible.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (self.0 >> 16) & 0x7fff
    }

    fn pick(&mut self, n: u32) -> u32 {
        self.next() % n
    }
}

fn gen_element(rng: &mut Lcg, depth: u32, out: &mut String) {
    let x = rng.pick(80);
    let y = rng.pick(80);
    let w = rng.pick(30) + 1;
    let h = rng.pick(30) + 1;
    match rng.pick(if depth > 2 { 3 } else { 7 }) {
        0 => out.push_str(&format!("<rect x='{x}' y='{y}' width='{w}' height='{h}'/>")),
        1 => out.push_str(&format!("<circle cx='{x}' cy='{y}' r='{w}'/>")),
        2 => out.push_str(&format!(
            "<path d='M {x} {y} L {} {} L {x} {} Z'/>",
            x + w,
            y,
            y + h
        )),
        3 => {
            out.push_str(&format!("<g transform='translate({x} {y}) scale(0.5)'>"));
            for _ in 0..rng.pick(3) + 1 {
                gen_element(rng, depth + 1, out);
            }
            out.push_str("</g>");
        }
        4 => {
            out.push_str("<g opacity='0.5'>");
            gen_element(rng, depth + 1, out);
            out.push_str("</g>");
        }
        5 => {
            out.push_str("<g clip-path='url(#clip)'>");
            gen_element(rng, depth + 1, out);
            out.push_str("</g>");
        }
        _ => out.push_str(&format!("<use xlink:href='#shared' x='{x}' y='{y}'/>")),
    }
}

fn gen_document(seed: u32) -> String {
    let mut rng = Lcg(seed);
    let mut body = String::new();
    for _ in 0..rng.pick(6) + 1 {
        gen_element(&mut rng, 0, &mut body);
    }

    format!(
        "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'
              width='200' height='200' viewBox='0 0 100 100'>
            <defs>
                <clipPath id='clip'><rect x='5' y='5' width='50' height='50'/></clipPath>
                <rect id='shared' width='7' height='3' transform='rotate(30)'/>
            </defs>
            {}
        </svg>",
        body
    )
}

// Checks that every `Save`/`SaveLayer` has a matching `Restore`
// and that scopes never close below zero.
fn assert_balanced(picture: &Picture) {
    let mut depth = 0i32;
    for cmd in picture.commands() {
        match cmd {
            Command::Save | Command::SaveLayer { .. } => depth += 1,
            Command::Restore => {
                depth -= 1;
                assert!(depth >= 0);
            }
            _ => {}
        }
    }
    assert_eq!(depth, 0);
}

// Transformed bounds of each drawn path.
fn element_bounds(picture: &Picture) -> Vec<Rect> {
    let mut ts = Transform::default();
    let mut stack = Vec::new();
    let mut list = Vec::new();
    for cmd in picture.commands() {
        match cmd {
            Command::Save | Command::SaveLayer { .. } => stack.push(ts),
            Command::Restore => ts = stack.pop().unwrap(),
            Command::SetTransform(t) => ts = ts.pre_concat(*t),
            Command::DrawPath(ref path) => {
                let path = path.path.as_ref().clone().transform(ts);
                if let Some(r) = path.and_then(|p| p.compute_tight_bounds()) {
                    list.push(r);
                }
            }
            _ => {}
        }
    }
    list
}

fn contains(outer: Rect, inner: Rect) -> bool {
    let e = 0.01;
    inner.left() >= outer.left() - e
        && inner.top() >= outer.top() - e
        && inner.right() <= outer.right() + e
        && inner.bottom() <= outer.bottom() + e
}

#[test]
fn generated_pictures_are_balanced() {
    for seed in 0..200 {
        let rec = record(&gen_document(seed));
        assert_balanced(&rec.picture);
    }
}

#[test]
fn picture_bounds_contain_every_element() {
    for seed in 0..200 {
        let rec = record(&gen_document(seed));
        let elements = element_bounds(&rec.picture);
        if elements.is_empty() {
            assert!(rec.picture.bounds().is_none());
            continue;
        }

        let total = rec.picture.bounds().unwrap();
        for r in elements {
            assert!(contains(total, r), "seed {}: {:?} is outside of {:?}", seed, r, total);
        }
    }
}

#[test]
fn recording_is_deterministic() {
    let text = gen_document(42);
    let a = record(&text);
    let b = record(&text);
    assert_eq!(a.picture.commands().len(), b.picture.commands().len());
    assert_eq!(a.diagnostics, b.diagnostics);
}

#[test]
fn use_cycle_is_reported_once() {
    let rec = record(
        "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
            <g id='a'><use xlink:href='#b'/></g>
            <g id='b'><use xlink:href='#a'/></g>
            <rect width='10' height='10'/>
        </svg>",
    );

    let cycles = rec
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::ReferenceCycle)
        .count();
    assert_eq!(cycles, 1);
    assert_balanced(&rec.picture);

    let draws = rec
        .picture
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::DrawPath(_)))
        .count();
    assert_eq!(draws, 1);
}

#[test]
fn derived_gradient_takes_base_stops() {
    let rec = record(
        "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
            <linearGradient id='base' x1='0' y1='0' x2='1' y2='0'>
                <stop offset='0' stop-color='red'/>
                <stop offset='1' stop-color='blue'/>
            </linearGradient>
            <linearGradient id='derived' xlink:href='#base' x1='0.2' y1='0.3' x2='0.8' y2='0.9'/>
            <rect width='10' height='10' fill='url(#derived)'/>
        </svg>",
    );

    let fill = rec
        .picture
        .commands()
        .iter()
        .find_map(|c| match c {
            Command::DrawPath(ref p) => p.fill.clone(),
            _ => None,
        })
        .unwrap();

    match fill.paint {
        Paint::LinearGradient(ref lg) => {
            assert_eq!(lg.id, "derived");
            assert_eq!((lg.x1, lg.y1, lg.x2, lg.y2), (0.2, 0.3, 0.8, 0.9));
            assert_eq!(lg.stops.len(), 2);
            assert_eq!(lg.stops[0].color, svgrec::Color::new_rgb(255, 0, 0));
            assert_eq!(lg.stops[1].color, svgrec::Color::new_rgb(0, 0, 255));
        }
        _ => panic!("expected a linear gradient"),
    }
}

#[test]
fn mask_region_is_a_clip_rect() {
    let rec = record(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <mask id='m' x='10' y='10' width='20' height='20'/>
            <rect width='100' height='100' mask='url(#m)'/>
        </svg>",
    );

    let commands = rec.picture.commands();
    let clip = commands
        .iter()
        .position(|c| matches!(c, Command::ClipRect(_)))
        .unwrap();
    let draw = commands
        .iter()
        .position(|c| matches!(c, Command::DrawPath(_)))
        .unwrap();
    assert!(clip < draw);
    assert!(matches!(
        commands[clip],
        Command::ClipRect(r) if r == Rect::from_xywh(10.0, 10.0, 20.0, 20.0).unwrap()
    ));
}

#[test]
fn duplicate_id_resolves_to_first() {
    let rec = record(
        "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
            <defs>
                <rect id='r' width='5' height='5' fill='green'/>
                <rect id='r' width='5' height='5' fill='red'/>
            </defs>
            <use xlink:href='#r'/>
        </svg>",
    );

    assert!(rec
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::DuplicateId));

    let fills: Vec<_> = rec
        .picture
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::DrawPath(ref p) => p.fill.as_ref().map(|f| f.paint.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(fills, vec![Paint::Color(svgrec::Color::new_rgb(0, 128, 0))]);
}

#[test]
fn data_problems_never_fail() {
    let rec = record(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect width='-5' height='10'/>
            <rect fill='url(#missing)' width='10' height='10'/>
            <g transform='scale(0)'><rect width='10' height='10'/></g>
            <circle r='oops'/>
        </svg>",
    );

    assert!(rec.picture.is_empty());
    assert!(rec
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::DanglingReference));
}

#[test]
fn invalid_root_size_uses_default() {
    let rec = record(
        "<svg xmlns='http://www.w3.org/2000/svg' width='-10' height='0'>
            <rect width='10' height='10'/>
        </svg>",
    );

    assert_eq!(rec.picture.size(), Options::default().default_size);
    assert!(!rec.picture.is_empty());
    assert!(rec
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::InvalidValue));
}

#[test]
fn svgz() {
    use std::io::Write;

    let text = "<svg xmlns='http://www.w3.org/2000/svg'><rect width='10' height='10'/></svg>";
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    let data = encoder.finish().unwrap();

    let picture = Picture::from_data(&data, &Options::default()).unwrap();
    assert!(!picture.is_empty());

    assert!(matches!(
        Picture::from_data(&[0x1f, 0x8b, 0, 0], &Options::default()),
        Err(svgrec::Error::MalformedGZip)
    ));
}
