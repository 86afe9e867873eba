//! multimark - Fast MultiMarkdown-style document converter

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use multimark::util::decode_text;
use multimark::{Engine, Format, Language, Options};

#[derive(Parser)]
#[command(name = "multimark")]
#[command(version, about = "Fast MultiMarkdown-style document converter", long_about = None)]
#[command(after_help = "EXAMPLES:
    multimark doc.md doc.html           Convert to HTML
    multimark -t latex doc.md           Convert to LaTeX on stdout
    multimark -m doc.md                 Show document metadata as JSON")]
struct Cli {
    /// Input file (markdown, or OPML/ITMZ with --opml/--itmz)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file; format inferred from its extension
    #[arg(value_name = "OUTPUT")]
    output: Option<String>,

    /// Output format
    #[arg(short = 't', long = "to", value_name = "FORMAT")]
    to: Option<String>,

    /// Show document metadata as JSON without converting
    #[arg(short, long)]
    metadata: bool,

    /// Force a complete document envelope
    #[arg(long)]
    complete: bool,

    /// Force fragment-only output
    #[arg(long)]
    snippet: bool,

    /// Disable smart typography
    #[arg(long)]
    no_smart: bool,

    /// Disable footnotes and citations
    #[arg(long)]
    no_notes: bool,

    /// Plain-Markdown compatibility mode
    #[arg(long)]
    compatibility: bool,

    /// Enable CriticMarkup spans
    #[arg(long)]
    critic: bool,

    /// Accept all proposed critic changes
    #[arg(long)]
    accept: bool,

    /// Reject all proposed critic changes
    #[arg(long)]
    reject: bool,

    /// Obfuscate email addresses in HTML output
    #[arg(long)]
    obfuscate: bool,

    /// Don't attach id labels to headings
    #[arg(long)]
    no_labels: bool,

    /// Skip metadata parsing
    #[arg(long)]
    no_metadata: bool,

    /// Process markdown inside raw HTML blocks
    #[arg(long)]
    process_html: bool,

    /// Use pseudo-random footnote anchors
    #[arg(long)]
    random_footnotes: bool,

    /// Use pseudo-random heading labels
    #[arg(long)]
    random_labels: bool,

    /// Expand {{file}} transclusions relative to the input directory
    #[arg(long)]
    transclude: bool,

    /// Treat the input as an OPML outline
    #[arg(long)]
    opml: bool,

    /// Treat the input as an iThoughts map
    #[arg(long)]
    itmz: bool,

    /// Smart-typography language (en, nl, fr, de, es, sv)
    #[arg(short = 'l', long, value_name = "LANG")]
    language: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let source = read_input(&cli.input, cli.itmz)?;
    let options = build_options(cli, &source)?;

    let engine = Engine::new(&source, options).map_err(|e| e.to_string())?;

    if cli.metadata {
        let mut map = serde_json::Map::new();
        for (key, value) in engine.metadata().iter() {
            map.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        }
        println!("{}", serde_json::Value::Object(map));
        return Ok(());
    }

    let format = resolve_format(cli)?;
    let bytes = engine.convert_bytes(format).map_err(|e| e.to_string())?;

    match &cli.output {
        Some(path) => std::fs::write(path, &bytes).map_err(|e| e.to_string())?,
        None => {
            if format.is_binary() {
                return Err(format!(
                    "{} output is binary; provide an output file",
                    format.name()
                ));
            }
            print!("{}", String::from_utf8_lossy(&bytes));
        }
    }
    Ok(())
}

fn read_input(path: &str, itmz: bool) -> Result<String, String> {
    let bytes = if path == "-" {
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .map_err(|e| e.to_string())?;
        buffer
    } else {
        std::fs::read(path).map_err(|e| format!("{path}: {e}"))?
    };

    // A real .itmz is a zip archive; pull the map XML out of it.
    if itmz && bytes.starts_with(b"PK") {
        let mut archive =
            zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| e.to_string())?;
        let mut file = archive.by_name("mapdata.xml").map_err(|e| e.to_string())?;
        let mut xml = Vec::new();
        file.read_to_end(&mut xml).map_err(|e| e.to_string())?;
        return Ok(decode_text(&xml, None).into_owned());
    }

    Ok(decode_text(&bytes, None).into_owned())
}

fn build_options(cli: &Cli, source: &str) -> Result<Options, String> {
    let mut options = Options::standard();
    options.complete = cli.complete;
    options.snippet = cli.snippet;
    options.smart = !cli.no_smart;
    options.notes = !cli.no_notes;
    options.compatibility = cli.compatibility;
    options.critic = cli.critic;
    options.critic_accept = cli.accept;
    options.critic_reject = cli.reject;
    options.obfuscate = cli.obfuscate;
    options.no_labels = cli.no_labels;
    options.no_metadata = cli.no_metadata;
    options.process_html = cli.process_html;
    options.random_footnotes = cli.random_footnotes;
    options.random_labels = cli.random_labels;
    options.transclude = cli.transclude;
    options.parse_opml = cli.opml;
    options.parse_itmz = cli.itmz;

    if let Some(lang) = &cli.language {
        options.language =
            Language::from_name(lang).ok_or_else(|| format!("unknown language: {lang}"))?;
    }

    if cli.transclude {
        let base = Path::new(&cli.input)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        options.transclusion = load_transclusions(source, &base);
    }

    Ok(options)
}

/// Load every `{{name}}` reference reachable from the source, so the
/// engine's in-memory expansion finds them all.
fn load_transclusions(source: &str, base: &Path) -> HashMap<String, String> {
    let mut sources = HashMap::new();
    let mut pending: Vec<String> = referenced_names(source);

    while let Some(name) = pending.pop() {
        if sources.contains_key(&name) {
            continue;
        }
        let Ok(bytes) = std::fs::read(base.join(&name)) else {
            continue;
        };
        let content = decode_text(&bytes, None).into_owned();
        pending.extend(referenced_names(&content));
        sources.insert(name, content);
    }
    sources
}

fn referenced_names(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            line.trim()
                .strip_prefix("{{")
                .and_then(|s| s.strip_suffix("}}"))
                .map(|s| s.trim().to_string())
        })
        .collect()
}

fn resolve_format(cli: &Cli) -> Result<Format, String> {
    if let Some(name) = &cli.to {
        return Format::from_name(name).ok_or_else(|| format!("unknown format: {name}"));
    }
    if let Some(output) = &cli.output
        && let Some(ext) = Path::new(output).extension().and_then(|e| e.to_str())
        && let Some(format) = Format::from_extension(ext)
    {
        return Ok(format);
    }
    Ok(Format::Html)
}
