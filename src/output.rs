//! Output path resolution and plan metadata

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{Result, StitchError};
use crate::layout::LayoutPlan;
use crate::tile::STITCHED_MARKER;

/// Value of `--output` that asks for a derived name inside the input directory.
pub const AUTO_OUTPUT: &str = "auto";

/// Generate the path of the finished sheet.
///
/// # Output Naming Rules
///
/// | `--output`            | Output                                            |
/// |-----------------------|---------------------------------------------------|
/// | omitted               | `{input}/{input_name}.stitched{ext}`              |
/// | `auto`                | `{input}/{pattern_name}.stitched{ext}` when a name pattern is given |
/// | `sheet{ext}`          | `sheet{ext}`                                      |
/// | `dir/`                | `dir/{input_name}.stitched{ext}`                  |
///
/// `pattern_name` is the pattern with every character other than ASCII
/// letters, digits, `_` and `-` removed; if nothing is left the input
/// directory name is used instead.
pub fn resolve_output_path(
    input_dir: &Path,
    output_arg: Option<&str>,
    pattern: Option<&str>,
    extension: &str,
) -> PathBuf {
    let dir_name = input_dir_name(input_dir);
    let sheet_name = |base: &str| format!("{}{}{}", base, STITCHED_MARKER, extension);

    match output_arg {
        None => input_dir.join(sheet_name(&dir_name)),
        Some(AUTO_OUTPUT) => {
            let base = pattern.map(sanitize_pattern).filter(|s| !s.is_empty()).unwrap_or(dir_name);
            input_dir.join(sheet_name(&base))
        }
        Some(arg) if arg.ends_with(extension) => PathBuf::from(arg),
        Some(dir) => Path::new(dir).join(sheet_name(&dir_name)),
    }
}

/// Path of the JSON metadata written next to a sheet: `sheet.png` -> `sheet.png.json`.
pub fn metadata_path(sheet: &Path) -> PathBuf {
    let mut name = sheet.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// Write the plan as pretty-printed JSON.
///
/// Like the sheet itself, the file only appears at `path` once complete.
pub fn write_metadata(plan: &LayoutPlan, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(plan)
        .map_err(|e| StitchError::output_write(path, std::io::Error::other(e)))?;
    let mut temp = temp_file_beside(path)?;
    temp.write_all(&json).map_err(|e| StitchError::output_write(path, e))?;
    temp.persist(path).map_err(|e| StitchError::output_write(path, e.error))?;
    Ok(())
}

/// Open a temp file in the directory `path` will live in, creating that
/// directory if needed. Persisting it over `path` is a single rename.
///
/// On Unix the file gets the mode a plain `File::create` would (0666 less
/// the umask) rather than the owner-only mode temp files default to.
pub(crate) fn temp_file_beside(path: &Path) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| StitchError::output_write(dir, e))?;
    }

    #[allow(unused_mut)]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir).map_err(|e| StitchError::output_write(dir, e))
}

/// Absolute form of `path` for comparing file identity. Works for a path
/// that does not exist yet as long as its directory does.
pub fn canonical_target(path: &Path) -> PathBuf {
    if let Ok(absolute) = path.canonicalize() {
        return absolute;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            parent.canonicalize().map(|p| p.join(name)).unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

/// Last component of the input directory, ignoring trailing separators.
fn input_dir_name(input_dir: &Path) -> String {
    input_dir
        .components()
        .next_back()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|s| !s.is_empty() && s != "." && s != "/")
        .or_else(|| {
            let absolute = input_dir.canonicalize().ok()?;
            Some(absolute.file_name()?.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "tiles".to_string())
}

fn sanitize_pattern(pattern: &str) -> String {
    pattern.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-').collect()
}
