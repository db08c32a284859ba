//! Configuration schema types for `stitch.toml`
//!
//! Defines the structure and validation rules for stitching configuration.

use serde::{Deserialize, Serialize};

use crate::color::parse_color;
use crate::layout::{LayoutOptions, StrategyKind, StrategyRequest, FALLBACK_TILE_SIZE};

/// Input selection section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Tile file extension, including the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { extension: default_extension() }
    }
}

fn default_extension() -> String {
    ".png".to_string()
}

/// Layout section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Strategy used when no strategy flag is given on the command line
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Layout text for the explicit strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit: Option<String>,
    /// Sort strip tiles before placing them
    #[serde(default = "default_true")]
    pub sort: bool,
    /// Uniform cell size [width, height] for explicit and index-auto layouts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_size: Option<[u32; 2]>,
    /// Cell size when no tile dimensions are known
    #[serde(default = "default_fallback_tile")]
    pub fallback_tile: [u32; 2],
    #[serde(default = "default_row_delimiter")]
    pub row_delimiter: String,
    #[serde(default = "default_cell_delimiter")]
    pub cell_delimiter: String,
    /// Character span [start, length] of the offset in index-auto tile names
    #[serde(default = "default_index_span")]
    pub index_span: [usize; 2],
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            explicit: None,
            sort: true,
            cell_size: None,
            fallback_tile: default_fallback_tile(),
            row_delimiter: default_row_delimiter(),
            cell_delimiter: default_cell_delimiter(),
            index_span: default_index_span(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_fallback_tile() -> [u32; 2] {
    [FALLBACK_TILE_SIZE.0, FALLBACK_TILE_SIZE.1]
}

fn default_row_delimiter() -> String {
    "/".to_string()
}

fn default_cell_delimiter() -> String {
    ",".to_string()
}

fn default_index_span() -> [usize; 2] {
    [8, 4]
}

/// Longest index-auto offset, in digits. Six digits already address a
/// million-cell grid.
pub const MAX_INDEX_DIGITS: usize = 6;

/// Output section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Canvas background color
    #[serde(default = "default_background")]
    pub background: String,
    /// Write plan metadata next to the sheet
    #[serde(default)]
    pub metadata: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { background: default_background(), metadata: false }
    }
}

fn default_background() -> String {
    "transparent".to_string()
}

/// Decode section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Number of decode workers (1 decodes lazily, one tile at a time)
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self { jobs: default_jobs() }
    }
}

fn default_jobs() -> usize {
    1
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StitchConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl StitchConfig {
    /// Validate the configuration and return all errors found.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut fail = |field: &str, message: String| {
            errors.push(ValidationError { field: field.to_string(), message });
        };

        let ext = &self.input.extension;
        if ext.len() < 2 || !ext.starts_with('.') {
            fail("input.extension", format!("'{}' must be a dot followed by an extension", ext));
        }

        let layout = &self.layout;
        if layout.strategy == StrategyKind::Explicit && layout.explicit.is_none() {
            fail("layout.explicit", "required when layout.strategy = \"explicit\"".to_string());
        }
        if let Some([w, h]) = layout.cell_size {
            if w == 0 || h == 0 {
                fail("layout.cell_size", format!("{}x{} must be non-zero", w, h));
            }
        }
        let [fw, fh] = layout.fallback_tile;
        if fw == 0 || fh == 0 {
            fail("layout.fallback_tile", format!("{}x{} must be non-zero", fw, fh));
        }
        if layout.row_delimiter.is_empty() {
            fail("layout.row_delimiter", "must not be empty".to_string());
        }
        if layout.cell_delimiter.is_empty() {
            fail("layout.cell_delimiter", "must not be empty".to_string());
        }
        if layout.row_delimiter == layout.cell_delimiter {
            fail("layout.cell_delimiter", "must differ from layout.row_delimiter".to_string());
        }
        match layout.index_span[1] {
            0 => fail("layout.index_span", "length must be at least 1".to_string()),
            len if len > MAX_INDEX_DIGITS => fail(
                "layout.index_span",
                format!("length {} exceeds {} digits", len, MAX_INDEX_DIGITS),
            ),
            _ => {}
        }

        if let Err(e) = parse_color(&self.output.background) {
            fail("output.background", e.to_string());
        }

        if self.decode.jobs == 0 {
            fail("decode.jobs", "must be at least 1".to_string());
        }

        errors
    }

    /// Layout knobs for the planner.
    pub fn layout_options(&self) -> LayoutOptions {
        let layout = &self.layout;
        LayoutOptions {
            sort: layout.sort,
            cell_size: layout.cell_size.map(|[w, h]| (w, h)),
            fallback_tile: (layout.fallback_tile[0], layout.fallback_tile[1]),
            row_delimiter: layout.row_delimiter.clone(),
            cell_delimiter: layout.cell_delimiter.clone(),
            index_span: (layout.index_span[0], layout.index_span[1]),
        }
    }

    /// Strategy flags to plan with: command-line flags when any are set,
    /// otherwise the configured strategy.
    pub fn strategy_for(&self, cli: &StrategyRequest) -> StrategyRequest {
        if cli.is_empty() {
            self.strategy_request()
        } else {
            cli.clone()
        }
    }

    /// The configured strategy expressed as a request.
    pub fn strategy_request(&self) -> StrategyRequest {
        let mut request = StrategyRequest::default();
        match self.layout.strategy {
            StrategyKind::Auto => request.auto = true,
            StrategyKind::Horizontal => request.horizontal = true,
            StrategyKind::Vertical => request.vertical = true,
            StrategyKind::Explicit => request.explicit = self.layout.explicit.clone(),
            StrategyKind::IndexAuto => request.index_auto = true,
        }
        request
    }
}
