//! Tree conversion - find textures under an archive tree and re-encode them.
//!
//! [`walk`] is a plain depth-first traversal that hands every file whose name
//! matches a filter to a visitor. [`convert_tree`] drives it with one of the
//! [`ConvertAction`]s.

use regex::Regex;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::codec::TileCodec;
use crate::error::{Result, StitchError};

/// Default name filter for `convert`: any `.dds` file, in any case.
pub const DDS_FILTER: &str = r".+\.(?i:dds)$";

/// Upper bound on the number of matches a traversal may visit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalBudget {
    max_matches: Option<usize>,
}

impl TraversalBudget {
    pub fn unlimited() -> Self {
        Self { max_matches: None }
    }

    pub fn at_most(max_matches: usize) -> Self {
        Self { max_matches: Some(max_matches) }
    }

    fn exhausted(self, matched: usize) -> bool {
        self.max_matches.is_some_and(|max| matched >= max)
    }
}

/// Counters for one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Files looked at, matched or not
    pub files: usize,
    /// Files handed to the visitor
    pub matched: usize,
    /// The budget ran out or the visitor asked to stop
    pub stopped_early: bool,
}

/// Visit every file under `root` whose name matches `filter`.
///
/// Directories are entered in name order. The walk ends when the tree is
/// exhausted, when `budget` matches have been visited, or when `visitor`
/// returns [`ControlFlow::Break`]. Unreadable entries are logged and skipped.
///
/// # Errors
///
/// Returns [`StitchError::NotFound`] if `root` is not a directory.
pub fn walk<F>(
    root: &Path,
    filter: &Regex,
    budget: TraversalBudget,
    mut visitor: F,
) -> Result<WalkSummary>
where
    F: FnMut(&Path) -> ControlFlow<()>,
{
    if !root.is_dir() {
        return Err(StitchError::NotFound { path: root.to_path_buf() });
    }

    let mut summary = WalkSummary::default();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            debug!(path = %entry.path().display(), "descending");
            continue;
        }
        summary.files += 1;

        let name = entry.file_name().to_string_lossy();
        if !filter.is_match(&name) {
            trace!(%name, "skip");
            continue;
        }

        if budget.exhausted(summary.matched) {
            summary.stopped_early = true;
            break;
        }
        summary.matched += 1;
        debug!(path = %entry.path().display(), "found");

        if visitor(entry.path()).is_break() {
            summary.stopped_early = true;
            break;
        }
    }

    Ok(summary)
}

/// What to do with each matched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertAction {
    /// Report the match only
    Print,
    /// Decode a `.dds` match and write `<out_dir>/<stem>.png`
    ConvertToPng { out_dir: PathBuf },
}

/// Result of [`convert_tree`].
#[derive(Debug, Clone, Default)]
pub struct ConvertReport {
    pub summary: WalkSummary,
    /// Every matched path, in visiting order
    pub matches: Vec<PathBuf>,
    /// Files written by [`ConvertAction::ConvertToPng`]
    pub written: Vec<PathBuf>,
}

/// Walk `root` and apply `action` to every match.
///
/// Matches without a `.dds` extension are reported but never converted.
/// The first decode or encode failure stops the walk and is returned.
///
/// # Errors
///
/// * [`StitchError::NotFound`] if `root` is not a directory
/// * [`StitchError::Codec`] / [`StitchError::OutputWrite`] from conversion
pub fn convert_tree(
    root: &Path,
    filter: &Regex,
    budget: TraversalBudget,
    action: &ConvertAction,
    codec: &dyn TileCodec,
) -> Result<ConvertReport> {
    info!(root = %root.display(), filter = filter.as_str(), "starting");

    let mut report = ConvertReport::default();
    let mut failure = None;

    let summary = walk(root, filter, budget, |path| {
        report.matches.push(path.to_path_buf());
        match action {
            ConvertAction::Print => {
                info!(path = %path.display(), "match");
                ControlFlow::Continue(())
            }
            ConvertAction::ConvertToPng { out_dir } => {
                match convert_one(path, out_dir, codec) {
                    Ok(Some(written)) => report.written.push(written),
                    Ok(None) => debug!(path = %path.display(), "not a dds file"),
                    Err(e) => {
                        failure = Some(e);
                        return ControlFlow::Break(());
                    }
                }
                ControlFlow::Continue(())
            }
        }
    })?;
    report.summary = summary;

    match failure {
        Some(e) => Err(e),
        None => Ok(report),
    }
}

/// Output path for a converted texture: `<out_dir>/<stem>.png`.
pub fn png_target(path: &Path, out_dir: &Path) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    out_dir.join(format!("{}.png", stem))
}

fn is_dds(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("dds"))
}

fn convert_one(path: &Path, out_dir: &Path, codec: &dyn TileCodec) -> Result<Option<PathBuf>> {
    if !is_dds(path) {
        return Ok(None);
    }
    let tile = codec.decode(path)?;
    let target = png_target(path, out_dir);
    codec.encode(&tile.image, &target)?;
    info!(from = %path.display(), to = %target.display(), "converted");
    Ok(Some(target))
}
