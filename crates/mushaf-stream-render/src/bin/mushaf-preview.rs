use std::env;
use std::path::Path;
use std::process::ExitCode;

use mushaf_stream::{
    clamp_page, resolve_by_reference, sura_name, Corpus, DirPageSource, DisplayMode, PageIndex, PageSource,
    ReferenceLookup, TOTAL_PAGES,
};
use mushaf_stream_render::{
    NeverCancel, RenderBox, RenderDiagnostic, RenderEngine, RenderEngineError, RenderEngineOptions,
    RenderedPage, RenderedSpread,
};

const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 900;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
    Html,
}

#[derive(Clone, Debug)]
struct Args {
    text_path: Option<String>,
    meta_path: Option<String>,
    pages_dir: Option<String>,
    page: Option<i64>,
    sura: Option<i64>,
    aya: Option<i64>,
    spread: bool,
    width: u32,
    height: u32,
    format: Format,
    out_path: Option<String>,
}

enum Source {
    Corpus(Corpus),
    Dir(DirPageSource),
}

impl Source {
    fn pages(&self) -> &dyn PageSource {
        match self {
            Self::Corpus(corpus) => corpus,
            Self::Dir(dir) => dir,
        }
    }

    fn lookup(&self) -> Option<&dyn ReferenceLookup> {
        match self {
            Self::Corpus(corpus) => Some(corpus),
            Self::Dir(_) => None,
        }
    }

    fn total_pages(&self) -> u16 {
        match self {
            Self::Corpus(corpus) => corpus.page_count(),
            Self::Dir(_) => TOTAL_PAGES,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", help_text());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let cli = parse_args(args)?;
    let source = open_source(&cli)?;
    let total = source.total_pages();

    let mode = if cli.spread {
        DisplayMode::Spread
    } else {
        DisplayMode::Single
    };
    let index = PageIndex::new(total, mode);
    let start = match (cli.sura, cli.aya) {
        (Some(sura), Some(aya)) => {
            let lookup = source
                .lookup()
                .ok_or_else(|| "--sura/--aya needs a corpus (--text and --meta)".to_string())?;
            resolve_by_reference(lookup, sura, aya, total)
                .map_err(|e| e.to_string())?
        }
        (None, None) => clamp_page(cli.page.unwrap_or(1), total),
        _ => return Err("--sura and --aya must be given together".to_string()),
    };

    let mut engine = RenderEngine::new(RenderEngineOptions::for_viewport(cli.width));
    engine.set_diagnostic_sink(|diagnostic| match diagnostic {
        RenderDiagnostic::Truncated {
            page,
            dropped_words,
        } => log::warn!("page {}: dropped {} words", page, dropped_words),
        RenderDiagnostic::LayoutOverflow { page, overflow } => log::warn!(
            "page {}: line {} overflows at minimum size",
            page,
            overflow.line_index
        ),
        other => log::debug!("{:?}", other),
    });

    let columns = if cli.spread { 2.0 } else { 1.0 };
    let bx = RenderBox::new(cli.width as f32 / columns, cli.height as f32);
    let spread = index.spread(start);
    let rendered = engine
        .fetch_and_render(source.pages(), spread, bx, &NeverCancel)
        .map_err(|e| match e {
            RenderEngineError::Source(err) => err.user_message(),
            other => other.to_string(),
        })?;

    let output = match cli.format {
        Format::Text => render_text(&rendered),
        Format::Json => serde_json::to_string_pretty(&rendered).map_err(|e| e.to_string())?,
        Format::Html => render_html(&rendered, cli.width, cli.height),
    };

    match &cli.out_path {
        Some(path) => {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
                }
            }
            std::fs::write(path, output).map_err(|e| e.to_string())?;
            println!(
                "wrote {} to {} (pages={}, font={}px)",
                format_name(cli.format),
                path,
                spread
                    .pages()
                    .map(|n| n.to_string())
                    .collect::<Vec<_>>()
                    .join("-"),
                rendered.font_size_px
            );
        }
        None => print!("{}", output),
    }
    Ok(())
}

fn open_source(cli: &Args) -> Result<Source, String> {
    match (&cli.text_path, &cli.meta_path, &cli.pages_dir) {
        (Some(text), Some(meta), None) => Corpus::open(text, meta)
            .map(Source::Corpus)
            .map_err(|e| e.to_string()),
        (None, None, Some(dir)) => Ok(Source::Dir(DirPageSource::new(dir))),
        (None, None, None) => Err("no source: pass --text and --meta, or --pages".to_string()),
        _ => Err("use either --text with --meta, or --pages".to_string()),
    }
}

fn format_name(format: Format) -> &'static str {
    match format {
        Format::Text => "text",
        Format::Json => "json",
        Format::Html => "html",
    }
}

fn render_text(spread: &RenderedSpread) -> String {
    let mut out = String::new();
    for page in spread.pages() {
        write_page_text(&mut out, page, spread.font_size_px);
    }
    out
}

fn write_page_text(out: &mut String, page: &RenderedPage, font_size_px: u32) {
    let number = page.layout.page_number.unwrap_or_default();
    let names: Vec<&str> = page
        .layout
        .suras
        .iter()
        .filter_map(|sura| sura_name(*sura))
        .collect();
    out.push_str(&format!("-- page {} ({}px)", number, font_size_px));
    if !names.is_empty() {
        out.push(' ');
        out.push_str(&names.join(" / "));
    }
    out.push_str(" --\n");
    for (idx, line) in page.layout.lines.iter().enumerate() {
        out.push_str(&format!("{:>2} | {}\n", idx + 1, line.display_text()));
    }
    if page.layout.is_truncated() {
        out.push_str(&format!(
            "   ! {} words did not fit\n",
            page.layout.dropped_words
        ));
    }
}

fn render_html(spread: &RenderedSpread, width: u32, height: u32) -> String {
    let mut pages = String::new();
    for page in spread.pages() {
        let number = page.layout.page_number.unwrap_or_default();
        pages.push_str(&format!(
            "<section class=\"page\" data-page=\"{}\">\n",
            number
        ));
        for line in &page.layout.lines {
            pages.push_str("<div class=\"line\">");
            for (pos, word) in line.words.iter().enumerate() {
                if pos > 0 {
                    pages.push(' ');
                }
                pages.push_str(&escape_html(word));
                if let Some(verse) = line.marker_at(pos) {
                    pages.push_str(&format!(
                        " <span class=\"marker\">\u{FD3F}{}\u{FD3E}</span>",
                        verse
                    ));
                }
            }
            pages.push_str("</div>\n");
        }
        pages.push_str(&format!("<footer>{}</footer>\n</section>\n", number));
    }

    format!(
        r#"<!doctype html>
<html lang="ar" dir="rtl">
<head>
<meta charset="utf-8">
<title>mushaf preview</title>
<style>
body {{ margin: 0; background: #f5efe0; }}
.spread {{ display: flex; flex-direction: row; gap: 16px; width: {width}px; height: {height}px; margin: 0 auto; }}
.page {{ flex: 1; display: grid; grid-template-rows: repeat(15, 1fr) auto; font-size: {size}px; font-family: "Amiri Quran", "Scheherazade New", serif; }}
.line {{ text-align: justify; text-align-last: justify; white-space: nowrap; }}
.marker {{ color: #8a5a00; }}
footer {{ text-align: center; font-size: 12px; }}
</style>
</head>
<body>
<main class="spread">
{pages}</main>
</body>
</html>
"#,
        width = width,
        height = height,
        size = spread.font_size_px,
        pages = pages
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h") {
        return Err("help requested".to_string());
    }

    let mut cfg = Args {
        text_path: None,
        meta_path: None,
        pages_dir: None,
        page: None,
        sura: None,
        aya: None,
        spread: false,
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
        format: Format::Text,
        out_path: None,
    };
    let mut spread_set = false;

    let mut i = 1usize;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--spread" => {
                cfg.spread = true;
                spread_set = true;
                i += 1;
                continue;
            }
            "--single" => {
                cfg.spread = false;
                spread_set = true;
                i += 1;
                continue;
            }
            _ => {}
        }
        let value = args
            .get(i + 1)
            .ok_or_else(|| format!("{} requires a value", flag))?;
        match flag {
            "--text" => cfg.text_path = Some(value.clone()),
            "--meta" => cfg.meta_path = Some(value.clone()),
            "--pages" => cfg.pages_dir = Some(value.clone()),
            "--out" => cfg.out_path = Some(value.clone()),
            "--page" => cfg.page = Some(parse_number(flag, value)?),
            "--sura" => cfg.sura = Some(parse_number(flag, value)?),
            "--aya" => cfg.aya = Some(parse_number(flag, value)?),
            "--width" => cfg.width = parse_px(flag, value)?,
            "--height" => cfg.height = parse_px(flag, value)?,
            "--format" => {
                cfg.format = match value.as_str() {
                    "text" => Format::Text,
                    "json" => Format::Json,
                    "html" => Format::Html,
                    other => return Err(format!("unknown --format '{}'", other)),
                }
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
        i += 2;
    }

    if !spread_set {
        cfg.spread = DisplayMode::for_viewport(cfg.width) == DisplayMode::Spread;
    }
    Ok(cfg)
}

fn parse_number(flag: &str, value: &str) -> Result<i64, String> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("{} expects an integer, got '{}'", flag, value))
}

fn parse_px(flag: &str, value: &str) -> Result<u32, String> {
    match value.trim().parse::<u32>() {
        Ok(px) if px > 0 => Ok(px),
        _ => Err(format!("{} expects a positive pixel count, got '{}'", flag, value)),
    }
}

fn help_text() -> &'static str {
    r#"mushaf-preview - lay out mushaf pages from a corpus or page directory

USAGE:
  cargo run -p mushaf-stream-render --features cli --bin mushaf-preview -- [options]

SOURCES (pick one):
  --text <file> --meta <file>   Tanzil quran text XML and metadata XML
  --pages <dir>                 directory of page-NNN.json files

OPTIONS:
  --page <n>                    first page to show (clamped, default: 1)
  --sura <n> --aya <n>          open the page holding this verse (needs --text/--meta)
  --spread / --single           two-page or single-page view (default: by --width)
  --width <px>                  viewport width (default: 1280)
  --height <px>                 viewport height (default: 900)
  --format <text|json|html>     output format (default: text)
  --out <file>                  write output to a file instead of stdout

Logging follows RUST_LOG (default: warn)."#
}
