//! forge-invoice – generate a demo invoice PDF from random data.
//!
//! Usage:
//!   forge-invoice [--output invoice.pdf] [--items 8] [--seed 42]
//!                 [--font Roboto=fonts/Roboto-Regular.ttf] [--config settings.json]
//!                 [--layout-json layout.json] [--landscape] [--title "Invoice"]
//!
//! Without a `--font Roboto=...` argument the invoice font is aliased to the
//! built-in Helvetica face.

use std::{fs, path::PathBuf, process};

use clap::Parser;
use thiserror::Error;

use invoice_forge::datasource::{InvoiceSource, RandomInvoiceSource, DEFAULT_ITEM_COUNT};
use invoice_forge::emit::{DocumentEmitter, JsonEmitter};
use invoice_forge::error::{ComposeError, EmitError, ForgeError};
use invoice_forge::fonts::{BuiltinFace, FontTable};
use invoice_forge::invoice::{InvoiceDocument, INVOICE_FONT};
use invoice_forge::pipeline::{write_pdf_file, DocumentSettings, PageOrientation};

#[derive(Debug, Parser)]
#[command(name = "forge-invoice", version, about = "Generate a demo invoice PDF")]
struct Cli {
    /// Output PDF path
    #[arg(short, long, default_value = "invoice.pdf")]
    output: PathBuf,

    /// Number of order items
    #[arg(long, default_value_t = DEFAULT_ITEM_COUNT)]
    items: usize,

    /// Seed for reproducible data (default: OS entropy)
    #[arg(long)]
    seed: Option<u64>,

    /// Register a TTF/OTF font as NAME=PATH (repeatable)
    #[arg(long = "font", value_name = "NAME=PATH", value_parser = parse_font_arg)]
    fonts: Vec<(String, PathBuf)>,

    /// JSON settings file (page size, margin, overflow policy, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the paginated layout as JSON
    #[arg(long, value_name = "PATH")]
    layout_json: Option<PathBuf>,

    /// Use landscape page orientation
    #[arg(short, long)]
    landscape: bool,

    /// Document title in PDF metadata
    #[arg(short, long)]
    title: Option<String>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read settings '{path}'")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in '{path}'")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Forge(#[from] ForgeError),
}

fn parse_font_arg(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got {arg:?}")),
    }
}

fn load_fonts(args: &[(String, PathBuf)]) -> Result<FontTable, ComposeError> {
    let mut fonts = FontTable::with_builtin_faces();
    for (name, path) in args {
        let file = fs::File::open(path).map_err(|source| ComposeError::FontLoad {
            name: name.clone(),
            source,
        })?;
        fonts.register_from_reader(name, file)?;
        log::info!("registered font '{name}' from {}", path.display());
    }
    if !fonts.contains(INVOICE_FONT) {
        log::warn!("font '{INVOICE_FONT}' not supplied; using built-in Helvetica");
        fonts.register_builtin(INVOICE_FONT, BuiltinFace::Helvetica);
    }
    Ok(fonts)
}

fn load_settings(cli: &Cli) -> Result<DocumentSettings, CliError> {
    let mut settings = match &cli.config {
        Some(path) => {
            let json = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
                path: path.clone(),
                source,
            })?;
            DocumentSettings::from_json(&json).map_err(|source| CliError::ConfigParse {
                path: path.clone(),
                source,
            })?
        }
        None => DocumentSettings::default(),
    };
    if cli.landscape {
        settings.orientation = PageOrientation::Landscape;
    }
    if cli.title.is_some() {
        settings.title = cli.title.clone();
    }
    Ok(settings)
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let settings = load_settings(cli)?;
    let fonts = load_fonts(&cli.fonts).map_err(ForgeError::from)?;

    let mut source = match cli.seed {
        Some(seed) => RandomInvoiceSource::with_seed(seed),
        None => RandomInvoiceSource::from_entropy(),
    }
    .item_count(cli.items);
    let document = InvoiceDocument::new(source.next_invoice())?;

    let (layout, summary) = write_pdf_file(&document, &fonts, &settings, &cli.output)?;

    if let Some(path) = &cli.layout_json {
        let mut file = fs::File::create(path)
            .map_err(EmitError::SinkWrite)
            .map_err(ForgeError::from)?;
        JsonEmitter
            .emit(&layout, &mut file)
            .map_err(ForgeError::from)?;
        eprintln!("Wrote layout '{}'", path.display());
    }

    for d in &layout.diagnostics {
        eprintln!(
            "warning: page {} {:?} overflows by {:.1}pt",
            d.page,
            d.region,
            d.required - d.available
        );
    }
    eprintln!(
        "Wrote '{}' ({} bytes, {} page{})",
        cli.output.display(),
        summary.bytes,
        summary.pages,
        if summary.pages == 1 { "" } else { "s" }
    );
    println!("{}", cli.output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        process::exit(1);
    }
}
