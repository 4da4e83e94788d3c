//! Headless annotation tool: inspect, fill, denoise and convert label images.
//!
//! Usage examples:
//!   segment-annotator labels mask.png
//!   segment-annotator fill mask.png out.png --label 3 --target 0
//!   segment-annotator denoise mask.png out.png --radius 2
//!   segment-annotator convert gray.png packed.png --grayscale

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use segment_annotator::{
    Annotator, AnnotatorConfig, GridSegmentation, ImportEncoding, Label, ModeFilter, Result,
};

/// Superpixel annotation label tool.
#[derive(Parser, Debug)]
#[command(
    name = "segment-annotator",
    about = "Inspect and edit label-encoded annotation images"
)]
struct Cli {
    /// Configuration JSON file (defaults to the user config path if present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the distinct labels of an annotation image
    Labels(InputArgs),
    /// Replace one label (or every pixel) with another
    Fill {
        #[command(flatten)]
        input: InputArgs,
        /// Output PNG path
        output: PathBuf,
        /// Label to paint
        #[arg(short, long)]
        label: Label,
        /// Only repaint pixels currently carrying this label
        #[arg(short, long)]
        target: Option<Label>,
    },
    /// Smooth labels with a majority filter
    Denoise {
        #[command(flatten)]
        input: InputArgs,
        /// Output PNG path
        output: PathBuf,
        /// Filter window radius in pixels
        #[arg(short, long, default_value_t = 1)]
        radius: usize,
    },
    /// Re-encode an annotation as a packed RGB label PNG
    Convert {
        #[command(flatten)]
        input: InputArgs,
        /// Output PNG path
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Annotation image
    input: PathBuf,
    /// Read labels from a single-channel image instead of packed RGB
    #[arg(long)]
    grayscale: bool,
}

impl InputArgs {
    fn encoding(&self) -> ImportEncoding {
        if self.grayscale {
            ImportEncoding::Grayscale
        } else {
            ImportEncoding::Rgb
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AnnotatorConfig> {
    match path {
        Some(path) => Ok(AnnotatorConfig::load(path)?),
        None => Ok(AnnotatorConfig::load_from_default_path().unwrap_or_default()),
    }
}

/// Load an annotation into a fresh annotator sized to match it.
fn open(input: &InputArgs, config: AnnotatorConfig) -> Result<Annotator> {
    let raster = segment_annotator::io::open_annotation(&input.input, input.encoding())?;
    let (width, height) = raster.dimensions();
    let mut annotator = Annotator::new(
        width,
        height,
        config,
        GridSegmentation::new(width, height, 16),
    )?;
    annotator.import_raster(raster)?;
    Ok(annotator)
}

fn run(command: Command, config: AnnotatorConfig) -> Result<()> {
    match command {
        Command::Labels(input) => {
            let annotator = open(&input, config)?;
            for label in annotator.unique_labels() {
                println!("{}", label);
            }
        }
        Command::Fill {
            input,
            output,
            label,
            target,
        } => {
            let mut annotator = open(&input, config)?;
            annotator.set_current_label(label)?;
            let changed = annotator.fill(target)?;
            log::info!("Filled {} pixel(s) with label {}", changed, label);
            annotator.save_png(&output)?;
        }
        Command::Denoise {
            input,
            output,
            radius,
        } => {
            let mut annotator = open(&input, config)?;
            let changed = annotator.denoise(&ModeFilter::new(radius))?;
            log::info!("Denoise changed {} pixel(s)", changed);
            annotator.save_png(&output)?;
        }
        Command::Convert { input, output } => {
            open(&input, config)?.save_png(&output)?;
        }
    }
    Ok(())
}
