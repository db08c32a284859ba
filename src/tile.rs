//! Tile and tile set types

use image::RgbaImage;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Suffix inserted before the extension of every composite we write.
pub const STITCHED_MARKER: &str = ".stitched";

/// Name and size of a tile, everything the layout planner needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMeta {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl TileMeta {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self { name: name.into(), width, height }
    }
}

/// A decoded tile image.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Where the tile was read from
    pub path: PathBuf,
    /// File name used in logs, metadata and IndexAuto offset parsing
    pub name: String,
    /// RGBA pixels, never empty
    pub image: RgbaImage,
}

impl Tile {
    /// Wrap a decoded image. The name is the file name of `path`.
    pub fn new(path: impl Into<PathBuf>, image: RgbaImage) -> Self {
        let path = path.into();
        let name = display_name(&path);
        Self { path, name, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn meta(&self) -> TileMeta {
        TileMeta::new(self.name.clone(), self.width(), self.height())
    }
}

/// File name of a path as a lossy string, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Check whether a file name is a composite produced by a previous run.
pub fn is_stitched_output(name: &str, extension: &str) -> bool {
    name.ends_with(&format!("{}{}", STITCHED_MARKER, extension))
}

/// Ordered, de-duplicated set of tile paths for one batch.
///
/// Composites produced by earlier runs (`*.stitched<ext>`) are never admitted,
/// so a sheet is never fed back in as one of its own tiles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileSet {
    paths: Vec<PathBuf>,
}

impl TileSet {
    /// Build a tile set, keeping the first occurrence of every path.
    pub fn from_paths<I>(paths: I, extension: &str) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut seen = HashSet::new();
        let paths = paths
            .into_iter()
            .filter(|p| !is_stitched_output(&display_name(p), extension))
            .filter(|p| seen.insert(p.clone()))
            .collect();
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    /// `(index, path)` pairs in batch order, for `--list` style reports.
    pub fn listing(&self) -> impl Iterator<Item = (usize, &Path)> {
        self.paths.iter().enumerate().map(|(i, p)| (i, p.as_path()))
    }
}
