//! Batch driver - one directory of tiles in, one sheet out.
//!
//! A batch runs the stages in a fixed order: gather, decode, plan, composite,
//! encode, then the optional metadata and input cleanup. Any failure before
//! the encode completes leaves the output path untouched.

use image::Rgba;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::codec::{decode_all, TileCodec};
use crate::composite::{composite, TRANSPARENT};
use crate::error::{Result, StitchError};
use crate::layout::{plan, LayoutOptions, LayoutPlan, Strategy};
use crate::output::{canonical_target, metadata_path, resolve_output_path, write_metadata};
use crate::resolve::resolve;
use crate::tile::{Tile, TileMeta};

/// Everything one batch needs to know.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    /// Name filter matched at the start of each file name
    pub pattern: Option<String>,
    /// Tile extension including the dot; also the output extension
    pub extension: String,
    pub strategy: Strategy,
    pub layout: LayoutOptions,
    pub background: Rgba<u8>,
    /// Raw `--output` value, see [`resolve_output_path`]
    pub output: Option<String>,
    /// Decode workers; 1 decodes sequentially
    pub jobs: usize,
    /// Write `<output>.json` describing the plan
    pub metadata: bool,
    /// Log the resolved tiles at info level
    pub list: bool,
    /// Delete the input tiles after a successful encode
    pub remove_inputs: bool,
}

impl BatchOptions {
    /// Options for an Auto layout of the `.png` tiles in `input_dir`.
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            pattern: None,
            extension: ".png".to_string(),
            strategy: Strategy::Auto,
            layout: LayoutOptions::default(),
            background: TRANSPARENT,
            output: None,
            jobs: 1,
            metadata: false,
            list: false,
            remove_inputs: false,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_remove_inputs(mut self, remove: bool) -> Self {
        self.remove_inputs = remove;
        self
    }

    pub fn with_metadata(mut self, metadata: bool) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }
}

/// What a finished batch produced.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Tile paths in batch order
    pub tiles: Vec<PathBuf>,
    pub plan: LayoutPlan,
    pub output: PathBuf,
    pub metadata: Option<PathBuf>,
    /// Input tiles actually deleted
    pub removed: usize,
}

/// Stitch one directory of tiles into a sheet.
///
/// # Errors
///
/// * [`StitchError::NotFound`] if the input directory is missing
/// * [`StitchError::EmptyInput`] if no tile matches
/// * [`StitchError::OutputIsInput`] if the output path names one of the tiles
/// * planning, decode and encode errors from the later stages
///
/// A metadata failure removes the sheet again, so a failed run leaves
/// nothing at the output path.
///
/// Failing to delete an input tile is not an error; it is logged and the
/// tile is left out of [`BatchReport::removed`].
pub fn run_batch(options: &BatchOptions, codec: &dyn TileCodec) -> Result<BatchReport> {
    info!(dir = %options.input_dir.display(), pattern = ?options.pattern, "gathering tiles");
    let tiles = resolve(&options.input_dir, options.pattern.as_deref(), &options.extension)?;
    if tiles.is_empty() {
        return Err(StitchError::EmptyInput(options.input_dir.display().to_string()));
    }

    for (index, path) in tiles.listing() {
        if options.list {
            info!(index, path = %path.display(), "tile");
        } else {
            debug!(index, path = %path.display(), "tile");
        }
    }

    let output = resolve_output_path(
        &options.input_dir,
        options.output.as_deref(),
        options.pattern.as_deref(),
        &options.extension,
    );
    let target = canonical_target(&output);
    if tiles.paths().iter().any(|path| canonical_target(path) == target) {
        return Err(StitchError::OutputIsInput { path: output });
    }

    let decoded = decode_all(codec, tiles.paths(), options.jobs)?;
    let metas: Vec<TileMeta> = decoded.iter().map(Tile::meta).collect();
    let plan = plan(&metas, &options.strategy, &options.layout)?;

    let (width, height) = plan.canvas_size();
    info!(strategy = %plan.strategy, tiles = decoded.len(), width, height, "stitching");
    for placement in &plan.placements {
        debug!(
            name = %placement.name,
            x = placement.x,
            y = placement.y,
            w = placement.width,
            h = placement.height,
            "place"
        );
    }
    let canvas = composite(&decoded, &plan, options.background)?;
    drop(decoded);

    info!(path = %output.display(), "writing");
    codec.encode(&canvas.into_image(), &output)?;

    let metadata = if options.metadata {
        let path = metadata_path(&output);
        if let Err(e) = write_metadata(&plan, &path) {
            // The run fails as a whole, so the sheet goes too
            if let Err(cleanup) = fs::remove_file(&output) {
                warn!(path = %output.display(), error = %cleanup, "could not remove sheet");
            }
            return Err(e);
        }
        debug!(path = %path.display(), "wrote metadata");
        Some(path)
    } else {
        None
    };

    let removed = if options.remove_inputs { remove_inputs(tiles.paths()) } else { 0 };

    Ok(BatchReport { tiles: tiles.paths().to_vec(), plan, output, metadata, removed })
}

/// Delete every input, returning how many were actually removed.
fn remove_inputs(paths: &[PathBuf]) -> usize {
    info!(count = paths.len(), "removing inputs");
    paths.iter().filter(|p| remove_one(p)).count()
}

fn remove_one(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not remove input");
            false
        }
    }
}
