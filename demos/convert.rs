/// Convert a document between the supported formats.
///
/// This example demonstrates:
/// - Loading any supported file through `Codecs`
/// - Re-laying out tables with custom layout options
/// - Saving by the extension of the output path
///
/// ```text
/// cargo run --example convert -- notes.rtf notes.docx
/// cargo run --example convert -- report.docx --print
/// ```
use std::path::PathBuf;

use clap::Parser;
use folio::layout::AverageWidthMeasurer;
use folio::{Block, Codecs, LayoutOptions, TableLayout};

#[derive(Parser, Debug)]
#[command(about = "Convert between .txt, .rtf, .docx and .odt")]
struct Args {
    /// File to read
    input: PathBuf,

    /// File to write; the extension selects the format
    output: Option<PathBuf>,

    /// Print the plain-text projection
    #[arg(long)]
    print: bool,

    /// Minimum table column width in pixels
    #[arg(long, default_value_t = 40.0)]
    min_column_width: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let options = LayoutOptions::new().with_min_column_width(args.min_column_width);
    let codecs = Codecs::new(TableLayout::new(options, AverageWidthMeasurer::default()));

    let document = codecs.load(&args.input)?;
    let tables = document.blocks().filter_map(Block::as_table).count();
    println!(
        "Loaded {}: {} paragraphs, {} tables",
        args.input.display(),
        document.paragraphs().count(),
        tables
    );

    if args.print {
        println!("{}", "-".repeat(60));
        println!("{}", document.plain_text());
        println!("{}", "-".repeat(60));
    }

    if let Some(output) = &args.output {
        codecs.save(&document, output)?;
        println!("Wrote {}", output.display());
    }

    Ok(())
}
