use anyhow::{Context, Result};
use clap::Parser;
use ext_icon_gen::{
    icon_gen::{Capability, GeneratorConfig, IconGenerator, DEFAULT_OUTPUT_DIR, DEFAULT_SIZES},
    render::{parse_color, FontChain, Palette},
    stub::HeaderEncoding,
};
use std::path::PathBuf;
use tracing::Level;

#[derive(Debug, Parser)]
#[clap(
    name = "ext-icon-gen",
    about = "Generate placeholder icons for a browser extension"
)]
struct Args {
    /// Output directory.
    #[clap(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Icon sizes to generate.
    #[clap(
        short,
        long,
        value_delimiter = ',',
        value_name = "SIZES",
        default_values_t = DEFAULT_SIZES
    )]
    sizes: Vec<u32>,

    /// Write placeholder files even when rendering is available
    #[clap(long)]
    stub: bool,

    /// Write correct 4-byte dimensions into placeholder headers
    #[clap(long)]
    fixed_header: bool,

    /// Text drawn in the middle of the icon
    #[clap(long, default_value = "抖")]
    glyph: String,

    /// Font file tried before the system fonts
    #[clap(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Background color (CSS color format)
    #[clap(long, default_value = "#667eea")]
    background: String,

    /// Panel color (CSS color format)
    #[clap(long, default_value = "#764ba2")]
    panel: String,

    /// Glyph and circle color (CSS color format)
    #[clap(long, default_value = "#ffffff")]
    foreground: String,

    /// Also write icons.json for the extension manifest
    #[clap(long)]
    manifest: bool,

    /// Print a JSON report of the run to stdout
    #[clap(long)]
    report: bool,

    /// Enable debug logging
    #[clap(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> GeneratorConfig {
        let defaults = Palette::default();
        let palette = Palette {
            background: parse_color(&self.background, defaults.background),
            panel: parse_color(&self.panel, defaults.panel),
            foreground: parse_color(&self.foreground, defaults.foreground),
        };

        let fonts = match self.font {
            Some(font) => FontChain::default().with_preferred(font),
            None => FontChain::default(),
        };

        let capability = if self.stub {
            Capability::Unavailable
        } else {
            Capability::detect()
        };

        let header_encoding = if self.fixed_header {
            HeaderEncoding::BigEndian
        } else {
            HeaderEncoding::Legacy
        };

        GeneratorConfig {
            output_dir: self.output,
            sizes: self.sizes,
            capability,
            header_encoding,
            palette,
            glyph: self.glyph,
            fonts,
            write_manifest: self.manifest,
        }
    }
}

fn setup_logger(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logger(args.verbose);

    let print_report = args.report;
    let generator = IconGenerator::new(args.into_config());
    let report = generator.run().context("Failed to generate icons")?;

    if print_report {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    }

    Ok(())
}
