// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#![allow(clippy::uninlined_format_args)]

use std::path;

fn main() {
    if let Err(e) = process() {
        eprintln!("Error: {}.", e);
        std::process::exit(1);
    }
}

fn timed<F, T>(perf: bool, name: &str, mut f: F) -> T
where
    F: FnMut() -> T,
{
    let now = std::time::Instant::now();
    let result = f();
    if perf {
        let elapsed = now.elapsed().as_micros() as f64 / 1000.0;
        println!("{}: {:.2}ms", name, elapsed);
    }

    result
}

fn process() -> Result<(), String> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            println!("{}", HELP);
            return Err(e);
        }
    };

    if !args.quiet {
        if let Ok(()) = log::set_logger(&LOGGER) {
            log::set_max_level(log::LevelFilter::Warn);
        }
    }

    let mut svg_data = timed(args.perf, "Reading", || -> Result<Vec<u8>, &str> {
        if let InputFrom::File(ref file) = args.in_svg {
            std::fs::read(file).map_err(|_| "failed to open the provided file")
        } else {
            use std::io::Read;
            let mut buf = Vec::new();
            let stdin = std::io::stdin();
            let mut handle = stdin.lock();
            handle
                .read_to_end(&mut buf)
                .map_err(|_| "failed to read stdin")?;
            Ok(buf)
        }
    })?;

    if svg_data.starts_with(&[0x1f, 0x8b]) {
        svg_data = timed(args.perf, "SVGZ Decoding", || {
            svgrec::decompress_svgz(&svg_data).map_err(|e| e.to_string())
        })?;
    };

    let svg_string = std::str::from_utf8(&svg_data)
        .map_err(|_| "provided data has not an UTF-8 encoding".to_string())?;

    let rec = timed(args.perf, "Recording", || {
        svgrec::Recording::from_str(svg_string, &args.opt).map_err(|e| e.to_string())
    })?;

    if args.diagnostics {
        let source = svgrec::svgtree::SourceBuffer::new(svg_string);
        for diag in &rec.diagnostics {
            println!("{}", diag.display_with(&source));
        }
    }

    if args.dump_commands {
        dump_commands(&rec.picture, 0);
    }

    if let Some(point) = args.hit {
        let hits = svgrec::hit_test(&rec.picture, point);
        if hits.is_empty() {
            println!("nothing at {},{}", point.x, point.y);
        }

        for element in hits {
            if element.id.is_empty() {
                println!("{:?}", element.node);
            } else {
                println!("{}", element.id);
            }
        }
    }

    let out_png = match args.out_png {
        Some(ref path) => path,
        None => return Ok(()),
    };

    let img = render_svg(&args, &rec.picture)?;

    timed(args.perf, "Saving", || {
        img.save_png(out_png).map_err(|e| e.to_string())
    })?;

    Ok(())
}

const HELP: &str = "\
svgrec records an SVG into canvas commands and renders them.

USAGE:
  svgrec [OPTIONS] <in-svg> [out-png]  # from file to file
  svgrec [OPTIONS] - [out-png]         # from stdin to file

  svgrec in.svg out.png
  svgrec -z 4 in.svg out.png
  svgrec --dump-commands --diagnostics in.svg

OPTIONS:
      --help                    Prints this help
  -V, --version                 Prints version

  -w, --width LENGTH            Sets the width in pixels
  -z, --zoom FACTOR             Zooms the image by a factor
      --dpi DPI                 Sets the resolution
                                [default: 96] [possible values: 10..4000 (inclusive)]
  --background COLOR            Sets the background color
                                Examples: red, #fff, #fff000

  --languages LANG              Sets a comma-separated list of languages that
                                will be used during the 'systemLanguage'
                                attribute resolving
                                Examples: 'en-US', 'en-US, ru-RU', 'en, ru'
                                [default: en]
  --resources-dir DIR           Sets a directory that will be used during
                                relative paths resolving.
                                [default: input file directory]
  --font-family FAMILY          Sets the default font family that will be
                                used when no 'font-family' is present
                                [default: Times New Roman]
  --font-size SIZE              Sets the default font size that will be
                                used when no 'font-size' is present
                                [default: 12] [possible values: 1..192 (inclusive)]
  --style-sheet PATH            Injects a CSS file after the document style sheets
  --strict                      Fails on resources that cannot be loaded

  --dump-commands               Prints recorded commands
  --diagnostics                 Prints diagnostics with source positions
  --hit X,Y                     Prints elements under a point, topmost first

  --perf                        Prints performance stats
  --quiet                       Disables warnings

ARGS:
  <in-svg>                      Input file
  [out-png]                     Output file
";

#[derive(Debug)]
struct CliArgs {
    width: Option<u32>,
    zoom: Option<f32>,
    dpi: u32,
    background: Option<svgtypes::Color>,

    languages: Vec<String>,
    resources_dir: Option<path::PathBuf>,
    font_family: Option<String>,
    font_size: u32,
    style_sheet: Option<path::PathBuf>,
    strict: bool,

    dump_commands: bool,
    diagnostics: bool,
    hit: Option<svgrec::Point>,

    perf: bool,
    quiet: bool,

    input: String,
    output: Option<String>,
}

fn collect_args() -> Result<CliArgs, pico_args::Error> {
    let mut input = pico_args::Arguments::from_env();

    if input.contains("--help") {
        print!("{}", HELP);
        std::process::exit(0);
    }

    if input.contains(["-V", "--version"]) {
        println!("{}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    Ok(CliArgs {
        width: input.opt_value_from_fn(["-w", "--width"], parse_length)?,
        zoom: input.opt_value_from_fn(["-z", "--zoom"], parse_zoom)?,
        dpi: input.opt_value_from_fn("--dpi", parse_dpi)?.unwrap_or(96),
        background: input.opt_value_from_str("--background")?,

        languages: input
            .opt_value_from_fn("--languages", parse_languages)?
            .unwrap_or_else(|| vec!["en".to_string()]),
        resources_dir: input.opt_value_from_str("--resources-dir")?,
        font_family: input.opt_value_from_str("--font-family")?,
        font_size: input
            .opt_value_from_fn("--font-size", parse_font_size)?
            .unwrap_or(12),
        style_sheet: input.opt_value_from_str("--style-sheet")?,
        strict: input.contains("--strict"),

        dump_commands: input.contains("--dump-commands"),
        diagnostics: input.contains("--diagnostics"),
        hit: input.opt_value_from_fn("--hit", parse_point)?,

        perf: input.contains("--perf"),
        quiet: input.contains("--quiet"),

        input: input.free_from_str()?,
        output: input.opt_free_from_str()?,
    })
}

fn parse_dpi(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "invalid number")?;

    if (10..=4000).contains(&n) {
        Ok(n)
    } else {
        Err("DPI out of bounds".to_string())
    }
}

fn parse_length(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "invalid length")?;

    if n > 0 {
        Ok(n)
    } else {
        Err("LENGTH cannot be zero".to_string())
    }
}

fn parse_zoom(s: &str) -> Result<f32, String> {
    let n: f32 = s.parse().map_err(|_| "invalid zoom factor")?;

    if n > 0.0 {
        Ok(n)
    } else {
        Err("ZOOM should be positive".to_string())
    }
}

fn parse_font_size(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "invalid number")?;

    if n > 0 && n <= 192 {
        Ok(n)
    } else {
        Err("font size out of bounds".to_string())
    }
}

fn parse_languages(s: &str) -> Result<Vec<String>, String> {
    let langs: Vec<String> = s
        .split(',')
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
        .collect();

    if langs.is_empty() {
        return Err("languages list cannot be empty".to_string());
    }

    Ok(langs)
}

fn parse_point(s: &str) -> Result<svgrec::Point, String> {
    let (x, y) = s.split_once(',').ok_or("expected X,Y")?;
    let x: f32 = x.trim().parse().map_err(|_| "invalid X")?;
    let y: f32 = y.trim().parse().map_err(|_| "invalid Y")?;
    Ok(svgrec::Point::from_xy(x, y))
}

#[derive(Clone, PartialEq, Debug)]
enum InputFrom {
    Stdin,
    File(path::PathBuf),
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum FitTo {
    /// Keep original size.
    Original,
    /// Scale to width.
    Width(u32),
    /// Zoom by factor.
    Zoom(f32),
}

impl FitTo {
    fn fit_to_size(&self, size: tiny_skia::IntSize) -> Option<tiny_skia::IntSize> {
        match *self {
            FitTo::Original => Some(size),
            FitTo::Width(w) => size.scale_to_width(w),
            FitTo::Zoom(z) => size.scale_by(z),
        }
    }

    fn fit_to_transform(&self, size: tiny_skia::IntSize) -> tiny_skia::Transform {
        let size1 = size.to_size();
        let size2 = match self.fit_to_size(size) {
            Some(v) => v.to_size(),
            None => return tiny_skia::Transform::default(),
        };
        tiny_skia::Transform::from_scale(
            size2.width() / size1.width(),
            size2.height() / size1.height(),
        )
    }
}

struct Args {
    in_svg: InputFrom,
    out_png: Option<path::PathBuf>,
    dump_commands: bool,
    diagnostics: bool,
    hit: Option<svgrec::Point>,
    perf: bool,
    quiet: bool,
    opt: svgrec::Options,
    fit_to: FitTo,
    background: Option<svgtypes::Color>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = collect_args().map_err(|e| e.to_string())?;

    let in_svg = if args.input == "-" {
        InputFrom::Stdin
    } else {
        InputFrom::File(args.input.as_str().into())
    };

    let out_png = args.output.as_ref().map(path::PathBuf::from);

    if out_png.is_none() && !args.dump_commands && !args.diagnostics && args.hit.is_none() {
        return Err("<out-png> must be set".to_string());
    }

    if args.input == "-" && args.resources_dir.is_none() {
        println!("Warning: Make sure to set --resources-dir when reading SVG from stdin.");
    }

    let mut fit_to = FitTo::Original;
    let mut default_size = svgrec::Size::from_wh(100.0, 100.0).ok_or("invalid default size")?;
    if let Some(w) = args.width {
        default_size = svgrec::Size::from_wh(w as f32, 100.0).ok_or("invalid width")?;
        fit_to = FitTo::Width(w);
    } else if let Some(z) = args.zoom {
        fit_to = FitTo::Zoom(z);
    }

    let resources_dir = match args.resources_dir {
        Some(v) => Some(v),
        None if args.input != "-" => {
            // Get input file absolute directory.
            std::fs::canonicalize(&args.input)
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        }
        None => None,
    };

    let style_sheet = match args.style_sheet {
        Some(ref path) => Some(
            std::fs::read_to_string(path)
                .map_err(|_| format!("failed to read '{}'", path.display()))?,
        ),
        None => None,
    };

    let opt = svgrec::Options {
        resources_dir,
        dpi: args.dpi as f32,
        font_family: args
            .font_family
            .take()
            .unwrap_or_else(|| "Times New Roman".to_string()),
        font_size: args.font_size as f32,
        languages: args.languages,
        default_size,
        style_sheet,
        strict_resources: args.strict,
        ..svgrec::Options::default()
    };

    Ok(Args {
        in_svg,
        out_png,
        dump_commands: args.dump_commands,
        diagnostics: args.diagnostics,
        hit: args.hit,
        perf: args.perf,
        quiet: args.quiet,
        opt,
        fit_to,
        background: args.background,
    })
}

fn dump_commands(picture: &svgrec::Picture, depth: usize) {
    use svgrec::Command;

    let mut depth = depth;
    for cmd in picture.commands() {
        if let Command::Restore = cmd {
            depth = depth.saturating_sub(1);
        }

        let indent = "  ".repeat(depth);
        match cmd {
            Command::Save => println!("{}save", indent),
            Command::SaveLayer {
                opacity,
                blend_mode,
            } => println!("{}save-layer {} {:?}", indent, opacity.get(), blend_mode),
            Command::Restore => println!("{}restore", indent),
            Command::ClipRect(r) => println!(
                "{}clip-rect {} {} {} {}",
                indent,
                r.x(),
                r.y(),
                r.width(),
                r.height()
            ),
            Command::ClipPath { path, rule } => {
                println!("{}clip-path {:?} {:?}", indent, rule, path.bounds())
            }
            Command::SetTransform(ts) => println!(
                "{}transform {} {} {} {} {} {}",
                indent, ts.sx, ts.ky, ts.kx, ts.sy, ts.tx, ts.ty
            ),
            Command::DrawPath(ref path) => println!(
                "{}draw-path {} fill={} stroke={} {:?}",
                indent,
                element_name(path.element.as_ref()),
                path.fill.is_some(),
                path.stroke.is_some(),
                path.path.bounds()
            ),
            Command::DrawImage(ref image) => {
                println!(
                    "{}draw-image {} {:?}",
                    indent,
                    element_name(image.element.as_ref()),
                    image.dst
                );
                if let svgrec::ImageKind::SVG(ref nested) = image.data.kind {
                    dump_commands(nested, depth + 1);
                }
            }
            Command::DrawText(ref text) => println!(
                "{}draw-text {} {:?}",
                indent,
                element_name(text.element.as_ref()),
                text.text.text
            ),
        }

        if let Command::Save | Command::SaveLayer { .. } = cmd {
            depth += 1;
        }
    }
}

fn element_name(element: Option<&svgrec::ElementRef>) -> String {
    match element {
        Some(e) if !e.id.is_empty() => format!("#{}", e.id),
        _ => "-".to_string(),
    }
}

fn render_svg(args: &Args, picture: &svgrec::Picture) -> Result<tiny_skia::Pixmap, String> {
    let now = std::time::Instant::now();

    let size = args
        .fit_to
        .fit_to_size(picture.size().to_int_size())
        .ok_or_else(|| "target size is zero".to_string())?;

    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| "failed to allocate an image".to_string())?;

    if let Some(background) = args.background {
        pixmap.fill(svg_to_skia_color(background));
    }

    let ts = args.fit_to.fit_to_transform(picture.size().to_int_size());
    svgrec::render(picture, ts, &mut pixmap);

    if args.perf {
        let elapsed = now.elapsed().as_micros() as f64 / 1000.0;
        println!("Rendering: {:.2}ms", elapsed);
    }

    Ok(pixmap)
}

fn svg_to_skia_color(color: svgtypes::Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.red, color.green, color.blue, color.alpha)
}

/// A simple stderr logger.
static LOGGER: SimpleLogger = SimpleLogger;
struct SimpleLogger;
impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::LevelFilter::Warn
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let target = if !record.target().is_empty() {
                record.target()
            } else {
                record.module_path().unwrap_or_default()
            };

            let line = record.line().unwrap_or(0);
            let args = record.args();

            match record.level() {
                log::Level::Error => eprintln!("Error (in {}:{}): {}", target, line, args),
                log::Level::Warn => eprintln!("Warning (in {}:{}): {}", target, line, args),
                log::Level::Info => eprintln!("Info (in {}:{}): {}", target, line, args),
                log::Level::Debug => eprintln!("Debug (in {}:{}): {}", target, line, args),
                log::Level::Trace => eprintln!("Trace (in {}:{}): {}", target, line, args),
            }
        }
    }

    fn flush(&self) {}
}
