//! Error types for tile resolution, planning, compositing and output

use std::path::PathBuf;
use thiserror::Error;

use crate::cli::{EXIT_EMPTY_INPUT, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_NOT_FOUND};
use crate::config::ConfigError;

/// Coarse classification of a [`StitchError`].
///
/// The CLI maps each kind to a process exit code, so callers never need to
/// match on individual error variants to decide how to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InputRead,
    EmptyInput,
    InvalidStrategy,
    MalformedExplicitLayout,
    PlannerInvariant,
    TileIndex,
    InvalidPattern,
    Codec,
    OutputIsInput,
    OutputWrite,
    Config,
}

impl ErrorKind {
    /// Process exit code for this kind of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::NotFound => EXIT_NOT_FOUND,
            ErrorKind::EmptyInput => EXIT_EMPTY_INPUT,
            ErrorKind::InvalidStrategy
            | ErrorKind::MalformedExplicitLayout
            | ErrorKind::InvalidPattern
            | ErrorKind::OutputIsInput
            | ErrorKind::Config => EXIT_INVALID_ARGS,
            ErrorKind::InputRead
            | ErrorKind::PlannerInvariant
            | ErrorKind::TileIndex
            | ErrorKind::Codec
            | ErrorKind::OutputWrite => EXIT_ERROR,
        }
    }
}

/// Errors raised while stitching a batch of tiles.
#[derive(Debug, Error)]
pub enum StitchError {
    /// Input directory (or conversion root) does not exist
    #[error("Invalid input directory: {}", path.display())]
    NotFound { path: PathBuf },

    /// An entry of the input directory could not be read
    #[error("Failed to read {}: {source}", path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Resolver found nothing to stitch
    #[error("No input files found: {0}")]
    EmptyInput(String),

    /// More than one layout strategy was requested
    #[error("Conflicting layout strategies requested: {}", requested.join(", "))]
    InvalidStrategy { requested: Vec<&'static str> },

    /// Explicit layout text could not be turned into a grid
    #[error("Malformed explicit layout '{layout}': {reason}")]
    MalformedExplicitLayout { layout: String, reason: String },

    /// Computed geometry contradicts itself
    #[error("Layout invariant violated: {0}")]
    PlannerInvariant(String),

    /// A tile name does not carry a usable grid offset
    #[error("Cannot index tile '{name}': {reason}")]
    TileIndex { name: String, reason: String },

    /// Name filter is not a valid regular expression
    #[error("Invalid name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Decode or encode failure reported by the image library
    #[error("Image {stage} failed for {}: {source}", path.display())]
    Codec {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Output path names one of the tiles being stitched
    #[error("Output {} is one of the input tiles", path.display())]
    OutputIsInput { path: PathBuf },

    /// Output file (or its directory) could not be written
    #[error("Failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StitchError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StitchError::NotFound { .. } => ErrorKind::NotFound,
            StitchError::InputRead { .. } => ErrorKind::InputRead,
            StitchError::EmptyInput(_) => ErrorKind::EmptyInput,
            StitchError::InvalidStrategy { .. } => ErrorKind::InvalidStrategy,
            StitchError::MalformedExplicitLayout { .. } => ErrorKind::MalformedExplicitLayout,
            StitchError::PlannerInvariant(_) => ErrorKind::PlannerInvariant,
            StitchError::TileIndex { .. } => ErrorKind::TileIndex,
            StitchError::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            StitchError::Codec { .. } => ErrorKind::Codec,
            StitchError::OutputIsInput { .. } => ErrorKind::OutputIsInput,
            StitchError::OutputWrite { .. } => ErrorKind::OutputWrite,
            StitchError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn malformed(layout: &str, reason: impl Into<String>) -> Self {
        StitchError::MalformedExplicitLayout { layout: layout.to_string(), reason: reason.into() }
    }

    pub(crate) fn output_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StitchError::OutputWrite { path: path.into(), source }
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = StitchError> = std::result::Result<T, E>;
