//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod convert;
mod list;
mod stitch;

use clap::{ArgAction, Args, Parser, Subcommand};
use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use crate::error::StitchError;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;
pub(crate) const EXIT_EMPTY_INPUT: u8 = 4;
pub(crate) const EXIT_NOT_FOUND: u8 = 10;

/// Stitch - combine directories of tiles into sheets, and pull textures out of archive trees
#[derive(Parser)]
#[command(name = "stitch")]
#[command(about = "Combine tile directories into sheets, or convert archive textures to PNG")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stitch the tiles of one directory into a single sheet
    Stitch(StitchArgs),

    /// Find textures under a directory tree and convert them to PNG
    Convert(ConvertArgs),

    /// List the tiles a stitch run would use, in batch order
    List(ListArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StitchArgs {
    /// Directory holding the tiles
    #[arg(short, long)]
    pub input: PathBuf,

    /// Only use files whose names start with a match of this regex
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Lay all tiles out in one row
    #[arg(short = 'H', long)]
    pub horizontal: bool,

    /// Lay all tiles out in one column
    #[arg(short = 'V', long)]
    pub vertical: bool,

    /// Square-ish grid, tallest tiles first (default)
    #[arg(short = 'A', long)]
    pub auto: bool,

    /// Explicit grid of tile indices: rows split by '/', cells by ','
    /// (e.g. "0,1/2,"; an empty cell stays blank)
    #[arg(short = 'E', long, value_name = "LAYOUT")]
    pub explicit: Option<String>,

    /// Place each tile at the grid offset embedded in its name
    #[arg(long)]
    pub index_auto: bool,

    /// Output file, directory, or "auto".
    /// If omitted: {input}/{input_name}.stitched{ext}
    /// If "auto": {input}/{pattern}.stitched{ext}
    /// If a file ending in {ext}: that file
    /// Otherwise a directory: dir/{input_name}.stitched{ext}
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<String>,

    /// Tile extension, including the dot (default: .png)
    #[arg(long, value_name = "EXT")]
    pub ext: Option<String>,

    /// Uniform cell size for explicit and index-auto layouts (e.g. "128x128")
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub cell: Option<(u32, u32)>,

    /// Keep strip tiles in input order with uniform cells
    #[arg(long)]
    pub no_sort: bool,

    /// Canvas background: #RGB[A], #RRGGBB[AA], transparent, black, white
    #[arg(long, value_name = "COLOR")]
    pub background: Option<String>,

    /// Decode tiles on this many threads
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Also write the layout as JSON next to the sheet ({output}.json)
    #[arg(long)]
    pub metadata: bool,

    /// Log every tile used
    #[arg(short, long)]
    pub list: bool,

    /// Delete the input tiles once the sheet is written
    #[arg(short, long)]
    pub remove: bool,

    /// Config file (default: nearest stitch.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Root of the archive tree
    #[arg(short, long)]
    pub base_path: PathBuf,

    /// Subdirectory of the base path to search (default: the base path itself)
    #[arg(short, long)]
    pub search_path: Option<PathBuf>,

    /// Directory for converted files
    #[arg(short, long, default_value = "data/stage")]
    pub output_path: PathBuf,

    /// File name filter, matched from the start of the name
    #[arg(long, default_value = crate::convert::DDS_FILTER)]
    pub filter: String,

    /// Stop after this many matches
    #[arg(long)]
    pub max: Option<usize>,

    /// Print matches without converting them
    #[arg(long)]
    pub print_only: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Directory holding the tiles
    #[arg(short, long)]
    pub input: PathBuf,

    /// Only use files whose names start with a match of this regex
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Tile extension, including the dot
    #[arg(long, value_name = "EXT", default_value = ".png")]
    pub ext: String,
}

/// Parse a "WxH" size string into (width, height).
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("invalid size '{}', expected WxH (e.g., \"128x128\")", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if w == 0 || h == 0 {
        return Err(format!("size dimensions must be > 0, got {}x{}", w, h));
    }
    Ok((w, h))
}

/// Install the log subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn report_error(err: &StitchError) -> ExitCode {
    let mut source = err.source();
    while let Some(cause) = source {
        error!(kind = ?err.kind(), "caused by: {}", cause);
        source = cause.source();
    }
    eprintln!("Error: {}", err);
    ExitCode::from(err.kind().exit_code())
}

/// Parse arguments, run the command, and map the outcome to an exit code.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let result = match cli.command {
        Commands::Stitch(args) => stitch::run_stitch(&args),
        Commands::Convert(args) => convert::run_convert(&args),
        Commands::List(args) => list::run_list(&args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => report_error(&e),
    }
}
