//! Tile source resolution - turns a directory and a name filter into a tile set.

use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::error::{Result, StitchError};
use crate::tile::{is_stitched_output, TileSet};

/// Compile a name filter so that it only matches at the start of a file name.
///
/// The match is case-sensitive and anchored at the start only; `grass` accepts
/// `grass-0001.png` but not `tallgrass-0001.png`.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})", pattern))
        .map_err(|source| StitchError::InvalidPattern { pattern: pattern.to_string(), source })
}

/// List the tiles of one directory.
///
/// Entries are returned in filesystem order. Only regular files ending with
/// `extension` are considered, composites from previous runs are skipped, and
/// `pattern` (if any) must match the start of the file name.
///
/// # Errors
///
/// * [`StitchError::NotFound`] if `dir` is missing or not a directory
/// * [`StitchError::InvalidPattern`] if `pattern` is not a valid regex
/// * [`StitchError::InputRead`] if a directory entry cannot be read
pub fn resolve(dir: &Path, pattern: Option<&str>, extension: &str) -> Result<TileSet> {
    if !dir.is_dir() {
        return Err(StitchError::NotFound { path: dir.to_path_buf() });
    }
    let filter = pattern.map(compile_pattern).transpose()?;

    let entries =
        fs::read_dir(dir).map_err(|_| StitchError::NotFound { path: dir.to_path_buf() })?;
    let paths = entries.map(|entry| entry.map(|e| e.path()));
    let found = select_tiles(dir, paths, filter.as_ref(), extension)?;

    Ok(TileSet::from_paths(found, extension))
}

/// Filter listed directory entries down to tile paths, keeping their order.
///
/// An entry that could not be read fails the whole listing with
/// [`StitchError::InputRead`]; skipping it would silently change the layout.
fn select_tiles<I>(
    dir: &Path,
    entries: I,
    filter: Option<&Regex>,
    extension: &str,
) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = io::Result<PathBuf>>,
{
    let mut found: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path =
            entry.map_err(|source| StitchError::InputRead { path: dir.to_path_buf(), source })?;
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        if !name.ends_with(extension) {
            trace!(%name, "skip: extension");
            continue;
        }
        if is_stitched_output(&name, extension) {
            debug!(%name, "skip: previous composite");
            continue;
        }
        if let Some(re) = filter {
            if !re.is_match(&name) {
                trace!(%name, "skip: pattern");
                continue;
            }
        }
        if !path.is_file() {
            continue;
        }
        found.push(path);
    }
    Ok(found)
}
