//! Panpoint: keypoint coordinate-format conversion.
//!
//! Panpoint converts keypoint annotations between absolute-pixel and
//! image-relative coordinates. Every conversion routes through one canonical
//! format (absolute pixel `xy`), so adding a format only takes a pair of
//! functions into and out of it.
//!
//! Keypoints may be unbatched or batched, dense or ragged, and may carry any
//! number of metadata channels after the (x, y) pair. All of that survives a
//! conversion untouched.
//!
//! # Modules
//!
//! - [`keypoints`]: Keypoint containers, image references, and JSON I/O
//! - [`format`]: Coordinate formats and the registry that names them
//! - [`engine`]: Shape validation and format conversion
//! - [`report`]: Conversion reports
//! - [`error`]: Error types for panpoint operations
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use panpoint::{convert_format, Images, Keypoints};
//!
//! let keypoints = Keypoints::from(array![[10.0, 20.0], [110.0, 120.0]]);
//! let images = Images::from_shape(&[500, 1000, 3]);
//!
//! let relative = convert_format(&keypoints, "xy", "rel_xy", Some(&images)).unwrap();
//! let dense = relative.as_dense().unwrap();
//! assert!((dense[[0, 0]] - 0.01).abs() < 1e-12);
//! assert!((dense[[0, 1]] - 0.04).abs() < 1e-12);
//! ```

pub mod engine;
pub mod error;
pub mod format;
pub mod keypoints;
pub mod report;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use keypoints::io_json;

pub use engine::{convert_format, ConversionEngine};
pub use error::PanpointError;
pub use format::{FormatRegistry, KeypointFormat};
pub use keypoints::{ImageSize, Images, Keypoints, RaggedKeypoints};

/// The panpoint CLI application.
#[derive(Parser)]
#[command(name = "panpoint")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert keypoints between coordinate formats.
    Convert(ConvertArgs),
    /// List the supported keypoint formats.
    Formats,
    /// Describe the layout of a keypoint file.
    Inspect(InspectArgs),
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Input keypoint JSON file (nested arrays).
    input: PathBuf,

    /// Source format (e.g. 'xy', 'rel_xy').
    #[arg(long)]
    from: String,

    /// Target format (e.g. 'xy', 'rel_xy').
    #[arg(long)]
    to: String,

    /// Image size as HEIGHTxWIDTH. Repeat (or comma-separate) for a batch.
    #[arg(long = "image-size", value_delimiter = ',', conflicts_with = "image")]
    image_sizes: Vec<ImageSize>,

    /// Image file to read dimensions from. Repeat for a batch.
    #[arg(long = "image")]
    image: Vec<PathBuf>,

    /// Treat a single image size as a batch shared by every keypoint entry.
    #[arg(long)]
    batched_images: bool,

    /// Output file (defaults to stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// How to print the conversion report (to stderr).
    #[arg(long, value_enum, default_value_t = ReportFormat::Text, env = "PANPOINT_REPORT")]
    report: ReportFormat,
}

/// Arguments for the inspect subcommand.
#[derive(clap::Args)]
struct InspectArgs {
    /// Input keypoint JSON file (nested arrays).
    input: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
    #[value(name = "none")]
    Off,
}

/// Run the panpoint CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), PanpointError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Formats) => run_formats(),
        Some(Commands::Inspect(args)) => run_inspect(args),
        None => {
            println!("panpoint {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Keypoint coordinate-format conversion.");
            println!();
            println!("Run 'panpoint --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the convert subcommand.
fn run_convert(args: ConvertArgs) -> Result<(), PanpointError> {
    let keypoints = io_json::read_keypoints_json(&args.input)?;
    let images = images_from_args(&args)?;
    debug!(input = %args.input.display(), images = ?images, "loaded keypoints");

    let engine = ConversionEngine::default();
    let converted = engine.convert_format(&keypoints, &args.from, &args.to, images.as_ref())?;

    match &args.output {
        Some(path) => io_json::write_keypoints_json(path, &converted)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", io_json::to_json_string(&converted)?)?;
        }
    }

    if args.report != ReportFormat::Off {
        let relative = images.as_ref().and_then(|images| {
            engine
                .convert_format(&converted, &args.to, format::REL_XY, Some(images))
                .ok()
        });
        let report = report::build_conversion_report(
            &converted,
            &args.from,
            &args.to,
            images.as_ref(),
            relative.as_ref(),
        );
        match args.report {
            ReportFormat::Json => {
                let json = serde_json::to_string_pretty(&report)?;
                eprintln!("{}", json);
            }
            _ => eprint!("{}", report),
        }
    }

    Ok(())
}

/// Builds the image reference from `--image-size` / `--image` flags.
fn images_from_args(args: &ConvertArgs) -> Result<Option<Images>, PanpointError> {
    let mut sizes = args.image_sizes.clone();
    for path in &args.image {
        let dims = imagesize::size(path).map_err(|source| PanpointError::ImageSize {
            path: path.clone(),
            source,
        })?;
        sizes.push(ImageSize::new(dims.height, dims.width));
    }

    Ok(match sizes.len() {
        0 => None,
        1 if !args.batched_images => Some(Images::Single(sizes[0])),
        _ => Some(Images::Batch(sizes)),
    })
}

/// Execute the formats subcommand.
fn run_formats() -> Result<(), PanpointError> {
    let engine = ConversionEngine::default();
    println!("Supported keypoint formats:");
    for format in engine.registry().formats() {
        let needs = if format.requires_images() {
            " [needs images]"
        } else {
            ""
        };
        println!("  {:<8} {}{}", format.name(), format.description(), needs);
    }
    Ok(())
}

/// Execute the inspect subcommand.
fn run_inspect(args: InspectArgs) -> Result<(), PanpointError> {
    let keypoints = io_json::read_keypoints_json(&args.input)?;
    let counts = report::ConversionCounts::of(&keypoints);

    println!("container:         {}", counts.container);
    println!("rank:              {}", keypoints.rank());
    println!("shape:             {}", counts.shape);
    match counts.batch {
        Some(n) => println!("batch:             {}", n),
        None => println!("batch:             (unbatched)"),
    }
    println!("keypoints:         {}", counts.keypoints);
    println!("metadata channels: {}", counts.metadata_channels);
    if let Some(ragged) = keypoints.as_ragged() {
        for (level, lengths) in ragged.row_lengths().iter().enumerate() {
            println!("row lengths[{}]:    {:?}", level, lengths);
        }
    }
    Ok(())
}
