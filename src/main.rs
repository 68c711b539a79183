use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "ocr-geotag-rust",
    version,
    about = "Find printed GPS coordinates in images and geotag them"
)]
struct Cli {
    /// Images to scan. Without images, stdin lines are treated as OCR text.
    images: Vec<PathBuf>,

    /// Tesseract language code(s), e.g. eng or eng+jpn
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Request an accelerated OCR model
    #[arg(long = "gpu")]
    gpu: bool,

    /// Only run the full-image low-sensitivity pass
    #[arg(long = "no-multi-pass")]
    no_multi_pass: bool,

    /// Skip the corner and edge region crops
    #[arg(long = "no-roi")]
    no_roi: bool,

    /// Images processed concurrently (0 = number of CPUs)
    #[arg(short = 'w', long = "workers")]
    workers: Option<usize>,

    /// Write <image>.geo.json GPS metadata next to each located image
    #[arg(short = 'e', long = "embed")]
    embed: bool,

    /// Write the JSON report to this file instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ocr_geotag_rust::logging::init(cli.verbose)?;

    let input = if cli.images.is_empty() && !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .with_context(|| "stdin must be UTF-8 text")?;
        Some(buffer)
    } else {
        None
    };

    let output = ocr_geotag_rust::run(
        ocr_geotag_rust::Config {
            images: cli.images,
            lang: cli.lang,
            gpu: cli.gpu,
            no_multi_pass: cli.no_multi_pass,
            no_roi: cli.no_roi,
            workers: cli.workers,
            embed: cli.embed,
            settings_path: cli.read_settings,
            verbose: cli.verbose,
        },
        input,
    )
    .await?;

    match cli.output {
        Some(path) => std::fs::write(&path, format!("{}\n", output))
            .with_context(|| format!("failed to write report: {}", path.display()))?,
        None => println!("{}", output),
    }
    Ok(())
}
