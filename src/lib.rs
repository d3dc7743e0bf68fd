//! Fieldpack: job package interchange and coordinate mapping for field
//! window inspections.
//!
//! Desktop dispatch prepares intake packages (a `jobs.json` manifest plus
//! overhead images). Fieldpack imports them into a local entity store, lets
//! inspectors place windows on the overhead image from viewport taps, and
//! exports structured results packages (JSON, CSV, an annotated image and a
//! text report) back to the desktop.
//!
//! # Modules
//!
//! - [`geometry`]: original image space vs displayed viewport space
//! - [`manifest`]: intake and results manifest codecs
//! - [`package`]: manifest discovery and ZIP archives
//! - [`import`]: the job import pipeline
//! - [`export`]: the results export pipeline
//! - [`field`]: field edits (placing windows, recording results)
//! - [`store`]: entity storage with atomic commits
//! - [`error`]: error types for fieldpack operations

pub mod config;
pub mod error;
pub mod export;
pub mod field;
pub mod geometry;
pub mod images;
pub mod import;
pub mod manifest;
pub mod model;
pub mod package;
pub mod store;
pub mod weather;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use config::{CliOverrides, FieldpackConfig};
use export::ExportPipeline;
use field::{FieldSession, Placement};
use geometry::{mapper, Coord, ImageSize};
use images::ImageStore;
use import::{JobImportPipeline, PackageSource};
use model::{JobId, TestResult, WindowId};
use store::{EntityStore, FileStore};

pub use error::FieldpackError;

/// The fieldpack CLI application.
#[derive(Parser)]
#[command(name = "fieldpack")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (default: <data-dir>/fieldpack.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the entity store and overhead images.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory export archives are written to.
    #[arg(long, global = true)]
    export_dir: Option<PathBuf>,

    /// Marker radius in original image pixels.
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=512))]
    marker_radius: Option<u32>,

    /// Root directory photo asset references resolve against.
    #[arg(long, global = true)]
    photo_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Import an intake package (folder or .zip archive).
    Import(ImportArgs),
    /// List stored jobs.
    Jobs,
    /// Show a job and its windows.
    Show(ShowArgs),
    /// Place a window from a tap on the displayed overhead image.
    Place(PlaceArgs),
    /// Record a window's water test result.
    Result(ResultArgs),
    /// Record a window's measured size.
    Measure(MeasureArgs),
    /// Delete a job with its windows and photos.
    Delete(DeleteArgs),
    /// Export a job as a results package archive.
    Export(ExportArgs),
    /// Convert a point between original image and viewport coordinates.
    Map(MapArgs),
    /// Show the resolved configuration and where each value came from.
    Config,
}

#[derive(clap::Args)]
struct ImportArgs {
    /// Package folder or .zip archive.
    source: PathBuf,
}

#[derive(clap::Args)]
struct ShowArgs {
    job_id: String,
}

#[derive(clap::Args)]
struct PlaceArgs {
    job_id: String,

    /// Tap x in viewport coordinates.
    #[arg(long, allow_negative_numbers = true)]
    x: f64,

    /// Tap y in viewport coordinates.
    #[arg(long, allow_negative_numbers = true)]
    y: f64,

    /// Viewport size as WIDTHxHEIGHT.
    #[arg(long)]
    viewport: ImageSize,

    /// Window label (default: next number).
    #[arg(long)]
    number: Option<String>,

    /// Clamp taps in the letterbox/pillarbox bands onto the image.
    #[arg(long)]
    clamp: bool,
}

#[derive(clap::Args)]
struct ResultArgs {
    window_id: String,

    /// Test outcome: pass, fail or unset.
    #[arg(long = "test")]
    test: TestResult,

    /// Number of leak points (values above 10 are clamped).
    #[arg(long)]
    leak_points: Option<u32>,
}

#[derive(clap::Args)]
struct MeasureArgs {
    window_id: String,

    #[arg(long)]
    width: f64,

    #[arg(long)]
    height: f64,
}

#[derive(clap::Args)]
struct DeleteArgs {
    job_id: String,
}

#[derive(clap::Args)]
struct ExportArgs {
    job_id: String,

    /// Output directory (overrides the configured export directory).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MapTarget {
    /// Original image pixels to viewport.
    Display,
    /// Viewport to original image pixels.
    Original,
}

#[derive(clap::Args)]
struct MapArgs {
    /// Original image size as WIDTHxHEIGHT.
    #[arg(long)]
    image: ImageSize,

    /// Viewport size as WIDTHxHEIGHT.
    #[arg(long)]
    viewport: ImageSize,

    /// Which space to convert into.
    #[arg(long, value_enum)]
    to: MapTarget,

    /// Tolerance below which aspect ratios count as equal.
    #[arg(long, default_value_t = geometry::DEFAULT_FIT_TOLERANCE)]
    tolerance: f64,

    #[arg(allow_negative_numbers = true)]
    x: f64,

    #[arg(allow_negative_numbers = true)]
    y: f64,
}

/// Opened storage for commands that need it.
struct Workspace {
    config: FieldpackConfig,
    store: FileStore,
    images: ImageStore,
}

impl Workspace {
    fn open(config: FieldpackConfig) -> Result<Self, FieldpackError> {
        let store = FileStore::open_in(&config.data_dir.value)?;
        let images = ImageStore::open(config.image_root())?;
        Ok(Self {
            config,
            store,
            images,
        })
    }

    fn session(&self) -> FieldSession<'_, FileStore> {
        FieldSession::new(&self.store, &self.images)
    }
}

/// Run the fieldpack CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), FieldpackError> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        data_dir: cli.data_dir,
        export_dir: cli.export_dir,
        marker_radius: cli.marker_radius,
        photo_root: cli.photo_root,
    };

    let Some(command) = cli.command else {
        println!("fieldpack {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Job package interchange for field window inspections.");
        println!();
        println!("Run 'fieldpack --help' for usage information.");
        return Ok(());
    };

    let config = FieldpackConfig::load(cli.config.as_deref(), overrides)?;

    match command {
        Commands::Map(args) => run_map(args),
        Commands::Config => {
            for (key, value, source) in config.entries() {
                println!("{key:<14} {value}  ({source})");
            }
            Ok(())
        }
        Commands::Import(args) => run_import(&Workspace::open(config)?, args),
        Commands::Jobs => run_jobs(&Workspace::open(config)?),
        Commands::Show(args) => run_show(&Workspace::open(config)?, args),
        Commands::Place(args) => run_place(&Workspace::open(config)?, args),
        Commands::Result(args) => {
            let ws = Workspace::open(config)?;
            let window = ws.session().record_test(
                &WindowId::from(args.window_id),
                args.test,
                args.leak_points,
            )?;
            println!(
                "Window {} ({}): {} with {} leak point(s)",
                window.window_number, window.window_id, window.test_result, window.leak_points
            );
            Ok(())
        }
        Commands::Measure(args) => {
            let ws = Workspace::open(config)?;
            let window = ws.session().record_measurement(
                &WindowId::from(args.window_id),
                args.width,
                args.height,
            )?;
            println!(
                "Window {} ({}): {} x {}",
                window.window_number, window.window_id, window.width, window.height
            );
            Ok(())
        }
        Commands::Delete(args) => {
            let ws = Workspace::open(config)?;
            let job_id = JobId::from(args.job_id);
            ws.session().delete_job(&job_id)?;
            println!("Deleted job {job_id}");
            Ok(())
        }
        Commands::Export(args) => run_export(&Workspace::open(config)?, args),
    }
}

fn run_import(ws: &Workspace, args: ImportArgs) -> Result<(), FieldpackError> {
    let source = PackageSource::detect(&args.source)?;
    let report = JobImportPipeline::new(&ws.store, &ws.images).run_with_progress(&source, |u| {
        tracing::debug!(stage = %u.stage, fraction = u.fraction, "import progress");
    })?;
    print!("{report}");
    Ok(())
}

fn run_jobs(ws: &Workspace) -> Result<(), FieldpackError> {
    let jobs = ws.store.jobs()?;
    if jobs.is_empty() {
        println!("No jobs.");
        return Ok(());
    }
    println!("{:<16} {:<11} {:>7}  {}", "JOB", "STATUS", "WINDOWS", "CLIENT");
    for job in jobs {
        let windows = ws.store.windows(&job.job_id)?.len();
        println!(
            "{:<16} {:<11} {:>7}  {}",
            job.job_id, job.status, windows, job.client_name
        );
    }
    Ok(())
}

fn run_show(ws: &Workspace, args: ShowArgs) -> Result<(), FieldpackError> {
    let job = ws.session().job(&JobId::from(args.job_id))?;
    println!("Job:      {}", job.job_id);
    println!("Client:   {}", job.client_name);
    println!("Address:  {}", job.address);
    println!("Status:   {}", job.status);
    if !job.notes.is_empty() {
        println!("Notes:    {}", job.notes);
    }
    match &job.overhead.image_path {
        Some(path) => println!("Overhead: {}", ws.images.resolve(path).display()),
        None => println!("Overhead: (none)"),
    }
    if let Some(scale) = job.overhead.scale_pixels_per_foot {
        println!("Scale:    {scale} px/ft");
    }

    let windows = ws.store.windows(&job.job_id)?;
    println!();
    println!("Windows ({}):", windows.len());
    for window in windows {
        let photos = ws.store.photos(&window.window_id)?.len();
        println!(
            "  {:<4} {}  ({:.1}, {:.1})  {}  photos: {}",
            window.window_number,
            window.window_id,
            window.x_position,
            window.y_position,
            window.test_result,
            photos
        );
    }
    Ok(())
}

fn run_place(ws: &Workspace, args: PlaceArgs) -> Result<(), FieldpackError> {
    let window = ws.session().place_window(
        &JobId::from(args.job_id),
        Coord::new(args.x, args.y),
        args.viewport,
        Placement {
            number: args.number,
            clamp: args.clamp,
        },
    )?;
    println!(
        "Placed window {} ({}) at ({:.2}, {:.2})",
        window.window_number, window.window_id, window.x_position, window.y_position
    );
    Ok(())
}

fn run_export(ws: &Workspace, args: ExportArgs) -> Result<(), FieldpackError> {
    let mut options = ws.config.export_options();
    if let Some(out) = args.out {
        options.output_dir = out;
    }
    let outcome = ExportPipeline::new(&ws.store, &ws.images, options)
        .export(&JobId::from(args.job_id))?;
    print!("{outcome}");
    Ok(())
}

fn run_map(args: MapArgs) -> Result<(), FieldpackError> {
    let original = args.image.validated()?;
    let viewport = args.viewport.validated()?;
    let (x, y) = match args.to {
        MapTarget::Display => {
            let p = mapper::to_display_with_tolerance(
                Coord::new(args.x, args.y),
                original,
                viewport,
                args.tolerance,
            );
            (p.x, p.y)
        }
        MapTarget::Original => {
            let p = mapper::to_original_with_tolerance(
                Coord::new(args.x, args.y),
                original,
                viewport,
                args.tolerance,
            );
            (p.x, p.y)
        }
    };
    println!("{x} {y}");
    Ok(())
}
